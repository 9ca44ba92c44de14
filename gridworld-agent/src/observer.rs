//! Training observation hooks
//!
//! Both solvers report progress through [`TrainingObserver`] instead of
//! calling into renderers or loggers directly. Every hook has a no-op
//! default so observers only override what they need.
//!
//! # Event sequence
//!
//! Policy iteration calls `on_sweep` after each evaluation sweep and
//! `on_improvement` after each improvement pass. Q-learning calls `on_step`
//! after every environment step and `on_episode_end` once per episode.
//! Either calls `on_environment_swap` when the wall mutation fires.

use gridworld_core::{Action, EpisodeRecord, Position};
use gridworld_env::SwapEvent;

/// One Q-learning environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Global step count including this step (starts at 1)
    pub global_step: usize,
    /// Episode the step belongs to
    pub episode: usize,
    /// Position before the move
    pub position: Position,
    /// Action taken
    pub action: Action,
    /// Position after the move
    pub next_position: Position,
    /// Reward received
    pub reward: f64,
    /// Exploration rate the action was sampled with
    pub epsilon: f64,
    /// Environment generation the step ran against
    pub generation: usize,
}

/// One policy evaluation sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepEvent {
    /// Outer policy iteration index
    pub iteration: usize,
    /// Sweep index within the evaluation phase
    pub sweep: usize,
    /// Largest absolute value change of the sweep
    pub max_delta: f64,
}

/// One policy improvement pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImprovementEvent {
    /// Outer policy iteration index
    pub iteration: usize,
    /// Cells whose distribution changed
    pub changed_cells: usize,
    /// Whether the policy is stable
    pub stable: bool,
}

/// Observer of training progress
pub trait TrainingObserver {
    /// Called after every Q-learning step
    fn on_step(&mut self, _event: &StepEvent) {}

    /// Called when a Q-learning episode finishes
    fn on_episode_end(&mut self, _record: &EpisodeRecord) {}

    /// Called when the wall mutation fires
    fn on_environment_swap(&mut self, _event: &SwapEvent) {}

    /// Called after every policy evaluation sweep
    fn on_sweep(&mut self, _event: &SweepEvent) {}

    /// Called after every policy improvement pass
    fn on_improvement(&mut self, _event: &ImprovementEvent) {}
}

impl<T: TrainingObserver + ?Sized> TrainingObserver for &mut T {
    fn on_step(&mut self, event: &StepEvent) {
        (**self).on_step(event);
    }

    fn on_episode_end(&mut self, record: &EpisodeRecord) {
        (**self).on_episode_end(record);
    }

    fn on_environment_swap(&mut self, event: &SwapEvent) {
        (**self).on_environment_swap(event);
    }

    fn on_sweep(&mut self, event: &SweepEvent) {
        (**self).on_sweep(event);
    }

    fn on_improvement(&mut self, event: &ImprovementEvent) {
        (**self).on_improvement(event);
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TrainingObserver for NullObserver {}

/// Observer that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TrainingObserver for TracingObserver {
    fn on_step(&mut self, event: &StepEvent) {
        tracing::trace!(
            step = event.global_step,
            episode = event.episode,
            from = %event.position,
            to = %event.next_position,
            action = %event.action,
            reward = event.reward,
            "step"
        );
    }

    fn on_episode_end(&mut self, record: &EpisodeRecord) {
        tracing::debug!(
            episode = record.episode,
            steps = record.steps,
            total_reward = record.total_reward,
            epsilon = record.epsilon,
            outcome = ?record.outcome,
            "episode finished"
        );
    }

    fn on_environment_swap(&mut self, event: &SwapEvent) {
        tracing::info!(
            at_step = event.at_step,
            generation = event.generation,
            "environment swapped"
        );
    }

    fn on_sweep(&mut self, event: &SweepEvent) {
        tracing::debug!(
            iteration = event.iteration,
            sweep = event.sweep,
            max_delta = event.max_delta,
            "evaluation sweep"
        );
    }

    fn on_improvement(&mut self, event: &ImprovementEvent) {
        tracing::debug!(
            iteration = event.iteration,
            changed = event.changed_cells,
            stable = event.stable,
            "policy improvement"
        );
    }
}
