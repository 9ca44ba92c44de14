//! Core grid MDP types for the gridworld RL sandbox
//!
//! This crate provides the shared vocabulary of the workspace: positions,
//! actions and best-action sets, value and policy tables, the action-value
//! table addressed by feature index, configuration structs and the error
//! taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod policy;
pub mod reward;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{Action, ActionSet, ArrowTag};
pub use agent::{Agent, AgentMetrics, CancellationFlag, PolicyIterationConfig, QLearningConfig};
pub use environment::{Environment, GridConfig, GridModel, Step};
pub use error::{GridError, Result};
pub use policy::{EpsilonGreedy, PolicyTable, Selection};
pub use reward::{Reward, RewardConfig};
pub use state::{FeatureIndex, FeatureIndexer, Position, Terminal};
pub use trajectory::{EpisodeRecord, RunHistory, Transition};
pub use value::{ActionValueTable, EligibilityTraces, ValueTable};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSet, Agent, ArrowTag, Environment, GridConfig, GridModel, Position, Result,
        Reward, Step,
    };
}
