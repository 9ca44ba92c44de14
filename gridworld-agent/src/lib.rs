//! Planning and learning agents for the gridworld RL sandbox
//!
//! This crate provides:
//! - [`PolicyIterationSolver`]: model-based policy iteration
//! - [`QLearningAgent`]: model-free tabular Q(lambda)
//! - Training observers, render snapshots and artifact export

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod export;
pub mod observer;
pub mod policy_iteration;
pub mod q_learning;
pub mod snapshot;
pub mod utils;

// Re-export agents
pub use policy_iteration::{
    evaluate_policy, improve_policy, Evaluation, Improvement, NonConvergence, Phase,
    PolicyIterationReport, PolicyIterationSolver,
};
pub use q_learning::{greedy_path, QLearningAgent, QLearningReport};

// Re-export utilities
pub use export::{load_table, RunArtifacts, RunManifest};
pub use observer::{
    ImprovementEvent, NullObserver, StepEvent, SweepEvent, TracingObserver, TrainingObserver,
};
pub use snapshot::RenderSnapshot;
pub use utils::{ExplorationSchedule, LinearSchedule, Schedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        PolicyIterationSolver, QLearningAgent, RenderSnapshot, TracingObserver, TrainingObserver,
    };
    pub use gridworld_core::prelude::*;
    pub use gridworld_env::prelude::*;
}
