//! Grid world environment for the gridworld RL sandbox
//!
//! This crate provides:
//! - The deterministic, immutable [`GridWorld`] and an [`EpisodeCursor`] for
//!   driving episodes on it
//! - The one-shot wall [`MutationSchedule`] and the swappable
//!   [`ActiveEnvironment`] handle
//! - A step-limit wrapper and preset layouts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod grid;
pub mod layouts;
pub mod schedule;
pub mod wrappers;

// Re-export environments
pub use grid::{EpisodeCursor, GridWorld};
pub use schedule::{
    ActiveEnvironment, Mutation, MutationSchedule, MutationScheduleConfig, SwapEvent,
    DEFAULT_ELEVATED_EXPLORATION_RATE,
};
pub use wrappers::StepLimit;

// Re-export core types
pub use gridworld_core::{
    Action, Environment, GridConfig, GridModel, Position, Reward, RewardConfig, Step,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        layouts, ActiveEnvironment, EpisodeCursor, GridWorld, MutationScheduleConfig, StepLimit,
    };
    pub use gridworld_core::prelude::*;
}
