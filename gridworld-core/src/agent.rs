//! Agent traits, configurations and cancellation

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Action, ActionSet, GridError, Position};

/// Configuration for the policy iteration solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyIterationConfig {
    /// Initial value of every non-goal cell
    pub initial_value: f64,
    /// Discount factor, in [0, 1)
    pub discount: f64,
    /// Evaluation stops once the largest per-sweep change is below this
    pub convergence_threshold: f64,
    /// Seed for rollout sampling
    pub random_seed: u64,
    /// Safety cap on sweeps per evaluation phase
    pub max_evaluation_sweeps: usize,
    /// Optional cap on evaluation/improvement rounds
    pub max_policy_iterations: Option<usize>,
}

impl Default for PolicyIterationConfig {
    fn default() -> Self {
        Self {
            initial_value: 0.0,
            discount: 0.9,
            convergence_threshold: 0.01,
            random_seed: 42,
            max_evaluation_sweeps: 10_000,
            max_policy_iterations: None,
        }
    }
}

impl PolicyIterationConfig {
    /// Reject out-of-range parameters
    pub fn validate(&self) -> crate::Result<()> {
        validate_discount(self.discount)?;
        if !(self.convergence_threshold > 0.0) {
            return Err(GridError::config(format!(
                "convergence threshold must be > 0, got {}",
                self.convergence_threshold
            )));
        }
        if self.max_evaluation_sweeps == 0 {
            return Err(GridError::config("max_evaluation_sweeps must be > 0"));
        }
        if !self.initial_value.is_finite() {
            return Err(GridError::config("initial value must be finite"));
        }
        Ok(())
    }
}

/// Configuration for the Q-learning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Step size alpha
    pub learning_rate: f64,
    /// Discount factor, in [0, 1)
    pub discount: f64,
    /// Eligibility trace decay lambda; 0 gives one-step Q-learning
    pub trace_decay: f64,
    /// Initial exploration rate
    pub exploration_rate: f64,
    /// Number of episodes to run
    pub num_episodes: usize,
    /// Total environment steps allowed across the whole run
    pub step_budget_per_run: usize,
    /// Exploration rate reached at the end of annealing
    pub final_exploration_rate: f64,
    /// Episodes over which epsilon anneals linearly; 0 disables annealing
    pub anneal_episode_count: usize,
    /// Optional cap on steps within a single episode
    pub max_steps_per_episode: Option<usize>,
    /// Seed for exploration and tie-breaking
    pub random_seed: u64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            discount: 0.95,
            trace_decay: 0.0,
            exploration_rate: 0.1,
            num_episodes: 200,
            step_budget_per_run: 100_000,
            final_exploration_rate: 0.01,
            anneal_episode_count: 10,
            max_steps_per_episode: None,
            random_seed: 42,
        }
    }
}

impl QLearningConfig {
    /// Reject out-of-range parameters
    pub fn validate(&self) -> crate::Result<()> {
        validate_discount(self.discount)?;
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(GridError::config(format!(
                "learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [
            ("trace decay", self.trace_decay),
            ("exploration rate", self.exploration_rate),
            ("final exploration rate", self.final_exploration_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GridError::config(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if self.step_budget_per_run == 0 {
            return Err(GridError::config("step budget must be > 0"));
        }
        if self.max_steps_per_episode == Some(0) {
            return Err(GridError::config("max_steps_per_episode must be > 0"));
        }
        Ok(())
    }
}

fn validate_discount(discount: f64) -> crate::Result<()> {
    if (0.0..1.0).contains(&discount) {
        Ok(())
    } else {
        Err(GridError::config(format!("discount must be in [0, 1), got {discount}")))
    }
}

/// Read-only view of what an algorithm has learned, shared by both solvers
pub trait Agent {
    /// Value estimate of a cell
    fn value(&self, position: Position) -> f64;

    /// Best actions at a cell (empty for walls and the goal)
    fn best_actions(&self, position: Position) -> ActionSet;

    /// A single greedy action, the first best action in the fixed order
    fn greedy_action(&self, position: Position) -> Option<Action> {
        self.best_actions(position).iter().next()
    }

    /// Agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total environment steps or solver iterations
    pub total_steps: usize,
    /// Total episodes (Q-learning) or evaluation sweeps (policy iteration)
    pub total_episodes: usize,
    /// Average return per episode, when episodic
    pub avg_episode_reward: f64,
    /// Whether the wall mutation has fired
    pub environment_swapped: bool,
}

/// Cooperative interrupt flag checked between sweeps and steps
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A fresh, unset flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
