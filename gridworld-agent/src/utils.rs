//! Exploration schedules

/// Trait for schedules (e.g., for epsilon decay)
pub trait Schedule: Send + Sync {
    /// Get value at step t
    fn value(&self, t: usize) -> f64;
}

/// Linear schedule that decays from start to end over steps
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSchedule {
    /// Starting value
    pub start: f64,
    /// Ending value
    pub end: f64,
    /// Number of steps for decay
    pub steps: usize,
}

impl LinearSchedule {
    /// Create a new linear schedule
    #[must_use]
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }
}

impl Schedule for LinearSchedule {
    fn value(&self, t: usize) -> f64 {
        if t >= self.steps {
            self.end
        } else {
            let progress = t as f64 / self.steps as f64;
            self.start + (self.end - self.start) * progress
        }
    }
}

/// Per-episode epsilon that can be re-anchored mid-run.
///
/// Anneals linearly from the anchor value to `floor` over `episodes`
/// episodes counted from the anchor episode. With `episodes == 0` the anchor
/// value is held.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationSchedule {
    curve: LinearSchedule,
    floor: f64,
    anchor_episode: usize,
}

impl ExplorationSchedule {
    /// Anchor at `start` from episode 0
    #[must_use]
    pub fn new(start: f64, floor: f64, episodes: usize) -> Self {
        Self {
            curve: Self::curve(start, floor, episodes),
            floor,
            anchor_episode: 0,
        }
    }

    fn curve(start: f64, floor: f64, episodes: usize) -> LinearSchedule {
        let end = if episodes == 0 { start } else { floor.min(start) };
        LinearSchedule::new(start, end, episodes)
    }

    /// Restart annealing from `start` at `episode`
    pub fn reanchor(&mut self, start: f64, episode: usize) {
        self.curve = Self::curve(start, self.floor, self.curve.steps);
        self.anchor_episode = episode;
    }

    /// Epsilon in force during `episode`
    #[must_use]
    pub fn rate(&self, episode: usize) -> f64 {
        self.curve.value(episode.saturating_sub(self.anchor_episode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_linear_schedule() {
        let s = LinearSchedule::new(1.0, 0.0, 4);
        assert_relative_eq!(s.value(0), 1.0);
        assert_relative_eq!(s.value(2), 0.5);
        assert_relative_eq!(s.value(10), 0.0);
    }

    #[test]
    fn test_exploration_anneals_and_reanchors() {
        let mut eps = ExplorationSchedule::new(0.1, 0.01, 10);
        assert_relative_eq!(eps.rate(0), 0.1);
        assert_relative_eq!(eps.rate(5), 0.055, epsilon = 1e-12);
        assert_relative_eq!(eps.rate(50), 0.01);

        eps.reanchor(0.5, 60);
        assert_relative_eq!(eps.rate(60), 0.5);
        assert_relative_eq!(eps.rate(65), 0.255, epsilon = 1e-12);
        assert_relative_eq!(eps.rate(70), 0.01);
    }

    #[test]
    fn test_zero_episodes_holds_anchor() {
        let mut eps = ExplorationSchedule::new(0.1, 0.01, 0);
        assert_relative_eq!(eps.rate(100), 0.1);
        eps.reanchor(0.5, 3);
        assert_relative_eq!(eps.rate(3), 0.5);
        assert_relative_eq!(eps.rate(400), 0.5);
    }

    proptest! {
        #[test]
        fn rate_stays_between_floor_and_anchor(
            start in 0.0f64..=1.0,
            floor in 0.0f64..=1.0,
            episodes in 0usize..50,
            episode in 0usize..200,
        ) {
            let eps = ExplorationSchedule::new(start, floor, episodes);
            let rate = eps.rate(episode);
            prop_assert!(rate <= start + 1e-12);
            prop_assert!(rate >= floor.min(start) - 1e-12);
        }
    }
}
