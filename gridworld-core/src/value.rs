//! Value tables for grid algorithms

use ndarray::{Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSet, FeatureIndex, FeatureIndexer, Position};

/// State value function V(s) over the grid; the goal is pinned to 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    values: Array2<f64>,
    goal: Position,
}

impl ValueTable {
    /// Constant `initial` everywhere except the goal, which is 0
    #[must_use]
    pub fn new(height: usize, width: usize, initial: f64, goal: Position) -> Self {
        let mut values = Array2::from_elem((height, width), initial);
        values[[goal.row, goal.col]] = 0.0;
        Self { values, goal }
    }

    /// Value of a cell
    #[must_use]
    pub fn get(&self, position: Position) -> f64 {
        self.values[[position.row, position.col]]
    }

    /// Overwrite the value of a non-goal cell; writes to the goal are ignored
    pub fn set(&mut self, position: Position, value: f64) {
        if position != self.goal {
            self.values[[position.row, position.col]] = value;
        }
    }

    /// Force the goal back to exactly 0
    pub fn pin_goal(&mut self) {
        self.values[[self.goal.row, self.goal.col]] = 0.0;
    }

    /// Largest absolute per-cell difference
    #[must_use]
    pub fn max_abs_diff(&self, other: &ValueTable) -> f64 {
        Zip::from(&self.values)
            .and(&other.values)
            .fold(0.0_f64, |acc, a, b| acc.max((a - b).abs()))
    }

    /// Underlying H x W array
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Action-value table Q(feature, action), one row per feature index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionValueTable {
    weights: Array2<f64>,
    indexer: FeatureIndexer,
}

impl ActionValueTable {
    /// Zero-initialised table for every feature of `indexer`
    #[must_use]
    pub fn new(indexer: FeatureIndexer) -> Self {
        Self {
            weights: Array2::zeros((indexer.len(), Action::COUNT)),
            indexer,
        }
    }

    /// The indexer addressing this table
    #[must_use]
    pub fn indexer(&self) -> FeatureIndexer {
        self.indexer
    }

    /// Feature index of a position
    #[must_use]
    pub fn features(&self, position: Position) -> FeatureIndex {
        self.indexer.index(position)
    }

    /// Q(feature, action)
    #[must_use]
    pub fn get(&self, feature: FeatureIndex, action: Action) -> f64 {
        self.weights[[feature, action.index()]]
    }

    /// Add `delta` to Q(feature, action)
    pub fn add(&mut self, feature: FeatureIndex, action: Action, delta: f64) {
        self.weights[[feature, action.index()]] += delta;
    }

    /// `Q += scale * traces` over the whole table
    pub fn add_scaled(&mut self, scale: f64, traces: &EligibilityTraces) {
        self.weights.scaled_add(scale, &traces.traces);
    }

    /// The Q-row of a feature
    #[must_use]
    pub fn row(&self, feature: FeatureIndex) -> ArrayView1<'_, f64> {
        self.weights.row(feature)
    }

    /// max_a Q(feature, a)
    #[must_use]
    pub fn max(&self, feature: FeatureIndex) -> f64 {
        self.row(feature)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First action attaining the row maximum
    #[must_use]
    pub fn argmax(&self, feature: FeatureIndex) -> Action {
        let row = self.row(feature);
        let mut best = Action::Up;
        for action in Action::ALL {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    /// Every action attaining the row maximum exactly
    #[must_use]
    pub fn best_actions(&self, feature: FeatureIndex) -> ActionSet {
        let row = self.row(feature);
        ActionSet::maximal([row[0], row[1], row[2], row[3]])
    }

    /// True when all four entries of the row are equal
    #[must_use]
    pub fn is_flat(&self, feature: FeatureIndex) -> bool {
        let row = self.row(feature);
        row.iter().all(|q| *q == row[0])
    }

    /// Underlying (features x 4) array
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.weights
    }
}

/// Accumulating eligibility traces, same shape as an [`ActionValueTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityTraces {
    traces: Array2<f64>,
}

impl EligibilityTraces {
    /// Zero traces for every feature of `indexer`
    #[must_use]
    pub fn new(indexer: FeatureIndexer) -> Self {
        Self {
            traces: Array2::zeros((indexer.len(), Action::COUNT)),
        }
    }

    /// Accumulate one visit of (feature, action)
    pub fn visit(&mut self, feature: FeatureIndex, action: Action) {
        self.traces[[feature, action.index()]] += 1.0;
    }

    /// Multiply every trace by `factor`
    pub fn decay(&mut self, factor: f64) {
        self.traces.mapv_inplace(|e| e * factor);
    }

    /// Zero every trace
    pub fn clear(&mut self) {
        self.traces.fill(0.0);
    }

    /// Trace of (feature, action)
    #[must_use]
    pub fn get(&self, feature: FeatureIndex, action: Action) -> f64 {
        self.traces[[feature, action.index()]]
    }
}
