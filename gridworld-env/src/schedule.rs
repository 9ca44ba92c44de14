//! One-shot wall mutation schedule and the swappable environment handle

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use gridworld_core::{GridError, Position, Result};

use crate::GridWorld;

/// Exploration rate forced on the driving algorithm when the walls change
pub const DEFAULT_ELEVATED_EXPLORATION_RATE: f64 = 0.5;

/// When and how the wall layout is replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationScheduleConfig {
    /// Replacement wall set
    pub new_walls: BTreeSet<Position>,
    /// Global step count at which the swap fires
    pub step_threshold: usize,
    /// Exploration rate after the swap
    #[serde(default = "default_elevated_rate")]
    pub elevated_exploration_rate: f64,
}

fn default_elevated_rate() -> f64 {
    DEFAULT_ELEVATED_EXPLORATION_RATE
}

impl MutationScheduleConfig {
    /// Schedule with the default elevated exploration rate
    #[must_use]
    pub fn new(new_walls: BTreeSet<Position>, step_threshold: usize) -> Self {
        Self {
            new_walls,
            step_threshold,
            elevated_exploration_rate: DEFAULT_ELEVATED_EXPLORATION_RATE,
        }
    }

    /// Reject a zero threshold or an out-of-range rate
    pub fn validate(&self) -> Result<()> {
        if self.step_threshold == 0 {
            return Err(GridError::config("mutation step threshold must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.elevated_exploration_rate) {
            return Err(GridError::config(format!(
                "elevated exploration rate must be in [0, 1], got {}",
                self.elevated_exploration_rate
            )));
        }
        Ok(())
    }
}

/// A fired mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Global step count observed when the schedule fired
    pub fired_at: usize,
    /// Exploration rate the driving algorithm must adopt
    pub exploration_rate: f64,
}

/// Level-triggered, one-shot threshold on a global step counter
#[derive(Debug, Clone)]
pub struct MutationSchedule {
    config: MutationScheduleConfig,
    fired: bool,
}

impl MutationSchedule {
    /// Create a schedule that has not fired yet
    pub fn new(config: MutationScheduleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fired: false,
        })
    }

    /// Fires exactly once, the first time `global_steps >= threshold`
    pub fn poll(&mut self, global_steps: usize) -> Option<Mutation> {
        if self.fired || global_steps < self.config.step_threshold {
            return None;
        }
        self.fired = true;
        Some(Mutation {
            fired_at: global_steps,
            exploration_rate: self.config.elevated_exploration_rate,
        })
    }

    /// Whether the swap already happened
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// The schedule's configuration
    #[must_use]
    pub fn config(&self) -> &MutationScheduleConfig {
        &self.config
    }
}

/// Emitted when the active environment is replaced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapEvent {
    /// Global step count at the swap
    pub at_step: usize,
    /// Generation of the new environment (the original is 0)
    pub generation: usize,
    /// Exploration rate the driver switched to
    pub exploration_rate: f64,
}

/// Handle to the current world, replaced wholesale when the schedule fires.
///
/// The replacement world is built and validated up front so a swap cannot fail.
/// Readers holding an `Arc` from [`ActiveEnvironment::current`] keep a
/// consistent snapshot across the swap.
#[derive(Debug, Clone)]
pub struct ActiveEnvironment {
    current: Arc<GridWorld>,
    replacement: Option<Arc<GridWorld>>,
    schedule: Option<MutationSchedule>,
    generation: usize,
}

impl ActiveEnvironment {
    /// A world that never changes
    #[must_use]
    pub fn fixed(world: GridWorld) -> Self {
        Self {
            current: Arc::new(world),
            replacement: None,
            schedule: None,
            generation: 0,
        }
    }

    /// A world whose walls are replaced according to `schedule`
    pub fn scheduled(world: GridWorld, schedule: MutationScheduleConfig) -> Result<Self> {
        let replacement = world.with_walls(schedule.new_walls.clone())?;
        Ok(Self {
            current: Arc::new(world),
            replacement: Some(Arc::new(replacement)),
            schedule: Some(MutationSchedule::new(schedule)?),
            generation: 0,
        })
    }

    /// Build from an optional schedule
    pub fn from_parts(world: GridWorld, schedule: Option<MutationScheduleConfig>) -> Result<Self> {
        match schedule {
            Some(schedule) => Self::scheduled(world, schedule),
            None => Ok(Self::fixed(world)),
        }
    }

    /// Shared handle to the current world
    #[must_use]
    pub fn current(&self) -> Arc<GridWorld> {
        Arc::clone(&self.current)
    }

    /// Borrow the current world
    #[must_use]
    pub fn world(&self) -> &GridWorld {
        &self.current
    }

    /// 0 before the swap, 1 after
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Whether a swap is still pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| !s.has_fired())
    }

    /// Threshold of the pending swap, if any
    #[must_use]
    pub fn threshold(&self) -> Option<usize> {
        self.schedule
            .as_ref()
            .filter(|s| !s.has_fired())
            .map(|s| s.config().step_threshold)
    }

    /// Poll the schedule with the global step counter and swap if it fires
    pub fn advance(&mut self, global_steps: usize) -> Option<SwapEvent> {
        let mutation = self.schedule.as_mut()?.poll(global_steps)?;
        let replacement = self.replacement.take()?;
        self.current = replacement;
        self.generation += 1;
        tracing::info!(
            at_step = mutation.fired_at,
            generation = self.generation,
            exploration_rate = mutation.exploration_rate,
            "wall layout replaced"
        );
        Some(SwapEvent {
            at_step: mutation.fired_at,
            generation: self.generation,
            exploration_rate: mutation.exploration_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts;
    use gridworld_core::GridModel;

    #[test]
    fn test_rejects_zero_threshold() {
        let cfg = MutationScheduleConfig::new(BTreeSet::new(), 0);
        assert!(MutationSchedule::new(cfg).is_err());
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut schedule = MutationSchedule::new(MutationScheduleConfig::new(BTreeSet::new(), 5)).unwrap();
        assert!(schedule.poll(4).is_none());
        let fired = schedule.poll(7).unwrap();
        assert_eq!(fired.fired_at, 7);
        assert_eq!(fired.exploration_rate, 0.5);
        assert!(schedule.poll(8).is_none());
        assert!(schedule.has_fired());
    }

    #[test]
    fn test_swap_keeps_old_snapshot_consistent() {
        let (config, schedule) = layouts::classic();
        let mut env = ActiveEnvironment::scheduled(GridWorld::new(config).unwrap(), schedule).unwrap();
        let before = env.current();
        assert!(env.advance(2999).is_none());

        let event = env.advance(3000).unwrap();
        assert_eq!(event.generation, 1);
        assert_eq!(env.generation(), 1);
        assert!(!env.is_pending());

        let gap = Position::new(2, 9);
        assert!(!before.is_wall(gap));
        assert!(env.world().is_wall(gap));
        assert!(env.advance(5000).is_none());
    }

    #[test]
    fn test_rejects_replacement_over_goal() {
        let (config, _) = layouts::classic();
        let goal = config.goal;
        let world = GridWorld::new(config).unwrap();
        let bad = MutationScheduleConfig::new([goal].into_iter().collect(), 10);
        assert!(ActiveEnvironment::scheduled(world, bad).is_err());
    }
}
