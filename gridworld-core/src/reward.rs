//! Reward signals and the per-cell reward assignment

use serde::{Deserialize, Serialize};

/// Reward signal from the environment
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);

impl Reward {
    /// Create a new reward
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the reward value
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Reward> for f64 {
    fn from(reward: Reward) -> Self {
        reward.0
    }
}

/// The three scalar rewards broadcast over the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Reward of the goal cell
    pub goal: f64,
    /// Reward of wall cells
    pub wall: f64,
    /// Reward of every other cell
    pub empty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            goal: 10.0,
            wall: -10.0,
            empty: 0.0,
        }
    }
}

impl RewardConfig {
    /// Goal-only signal: 1 on reaching the goal, 0 elsewhere
    #[must_use]
    pub fn sparse() -> Self {
        Self {
            goal: 1.0,
            wall: 0.0,
            empty: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_conversions() {
        let r = Reward::from(2.5);
        assert_eq!(r, Reward::new(2.5));
        assert_eq!(f64::from(r), r.value());
    }

    #[test]
    fn test_sparse_rewards_only_the_goal() {
        let sparse = RewardConfig::sparse();
        assert_eq!((sparse.goal, sparse.wall, sparse.empty), (1.0, 0.0, 0.0));
        assert_eq!(RewardConfig::default().wall, -10.0);
    }
}
