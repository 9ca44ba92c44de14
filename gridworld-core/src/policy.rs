//! Policy tables and epsilon-greedy action selection

use ndarray::{Array3, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSet, ActionValueTable, ArrowTag, FeatureIndex, Position};

/// Stochastic policy pi(a | s), one distribution over the four actions per cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTable {
    probs: Array3<f64>,
}

impl PolicyTable {
    /// Equiprobable policy over all four actions at every cell
    #[must_use]
    pub fn equiprobable(height: usize, width: usize) -> Self {
        Self {
            probs: Array3::from_elem((height, width, Action::COUNT), 1.0 / Action::COUNT as f64),
        }
    }

    /// Distribution at a cell
    #[must_use]
    pub fn distribution(&self, position: Position) -> ArrayView1<'_, f64> {
        self.probs.slice(ndarray::s![position.row, position.col, ..])
    }

    /// pi(action | position)
    #[must_use]
    pub fn probability(&self, position: Position, action: Action) -> f64 {
        self.probs[[position.row, position.col, action.index()]]
    }

    /// Replace the distribution at a cell; returns true if any entry changed bitwise
    pub fn set_distribution(&mut self, position: Position, dist: [f64; 4]) -> bool {
        let mut changed = false;
        for action in Action::ALL {
            let slot = &mut self.probs[[position.row, position.col, action.index()]];
            if slot.to_bits() != dist[action.index()].to_bits() {
                changed = true;
            }
            *slot = dist[action.index()];
        }
        changed
    }

    /// Highest-probability actions at a cell
    #[must_use]
    pub fn best_actions(&self, position: Position) -> ActionSet {
        ActionSet::from_probabilities(&self.distribution(position).to_vec())
    }

    /// Arrow tag of a cell
    #[must_use]
    pub fn arrow(&self, position: Position) -> ArrowTag {
        ArrowTag::from(self.best_actions(position))
    }

    /// Underlying H x W x 4 array
    #[must_use]
    pub fn as_array(&self) -> &Array3<f64> {
        &self.probs
    }
}

/// Epsilon-greedy selection over an action-value table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    /// Exploration rate
    pub epsilon: f64,
}

/// How an action was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// The chosen action
    pub action: Action,
    /// True if the action is a greedy (argmax) choice
    pub greedy: bool,
}

impl EpsilonGreedy {
    /// Create a new epsilon-greedy policy
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Pick an action for `feature`.
    ///
    /// Explores uniformly with probability epsilon. A flat Q-row also falls
    /// back to a uniform choice so untrained rows are not biased toward `Up`.
    pub fn select<R: Rng + ?Sized>(
        &self,
        q: &ActionValueTable,
        feature: FeatureIndex,
        rng: &mut R,
    ) -> Selection {
        if rng.gen::<f64>() < self.epsilon {
            let action = Action::ALL[rng.gen_range(0..Action::COUNT)];
            // exploring onto a maximal action still counts as greedy for trace cutting
            let greedy = q.get(feature, action) == q.max(feature);
            return Selection { action, greedy };
        }
        if q.is_flat(feature) {
            let action = Action::ALL[rng.gen_range(0..Action::COUNT)];
            return Selection { action, greedy: true };
        }
        Selection {
            action: q.argmax(feature),
            greedy: true,
        }
    }
}
