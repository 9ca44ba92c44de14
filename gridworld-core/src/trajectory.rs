//! Per-episode records and run history

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::{Action, Position, Reward, Terminal};

/// Single transition in an episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Cell the action was taken from
    pub position: Position,
    /// Action taken
    pub action: Action,
    /// Reward received
    pub reward: Reward,
    /// Cell reached
    pub next_position: Position,
    /// Whether the move reached the goal
    pub done: bool,
}

/// Summary of one finished episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Zero-based episode index
    pub episode: usize,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
    /// Number of steps taken
    pub steps: usize,
    /// How the episode ended
    pub outcome: Terminal,
    /// Exploration rate in force at the episode's start
    pub epsilon: f64,
}

/// Ordered per-episode returns and step counts of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    /// Episodes in order
    pub episodes: Vec<EpisodeRecord>,
}

impl RunHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an episode
    pub fn push(&mut self, record: EpisodeRecord) {
        self.episodes.push(record);
    }

    /// Number of recorded episodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Check if no episode was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Per-episode returns
    #[must_use]
    pub fn returns(&self) -> Vec<f64> {
        self.episodes.iter().map(|e| e.total_reward).collect()
    }

    /// Per-episode step counts
    #[must_use]
    pub fn steps(&self) -> Vec<usize> {
        self.episodes.iter().map(|e| e.steps).collect()
    }

    /// Total steps across all episodes
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.episodes.iter().map(|e| e.steps).sum()
    }

    /// Mean and standard deviation of the returns; `None` when empty
    #[must_use]
    pub fn return_stats(&self) -> Option<(f64, f64)> {
        if self.episodes.is_empty() {
            return None;
        }
        let returns = self.returns();
        let mean = returns.iter().mean();
        let std = if returns.len() > 1 {
            returns.iter().std_dev()
        } else {
            0.0
        };
        Some((mean, std))
    }

    /// Fraction of episodes that reached the goal
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        let reached = self
            .episodes
            .iter()
            .filter(|e| e.outcome == Terminal::Yes)
            .count();
        reached as f64 / self.episodes.len() as f64
    }
}

/// Compute discounted returns of a reward sequence
#[must_use]
pub fn discounted_returns(rewards: &[f64], gamma: f64) -> Vec<f64> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running_return = 0.0;

    for i in (0..rewards.len()).rev() {
        running_return = rewards[i] + gamma * running_return;
        returns[i] = running_return;
    }

    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(episode: usize, total_reward: f64, steps: usize, outcome: Terminal) -> EpisodeRecord {
        EpisodeRecord {
            episode,
            total_reward,
            steps,
            outcome,
            epsilon: 0.1,
        }
    }

    #[test]
    fn test_history_series() {
        let mut history = RunHistory::new();
        history.push(record(0, 1.0, 12, Terminal::Yes));
        history.push(record(1, 0.0, 30, Terminal::Truncated));
        history.push(record(2, 1.0, 8, Terminal::Yes));

        assert_eq!(history.returns(), vec![1.0, 0.0, 1.0]);
        assert_eq!(history.steps(), vec![12, 30, 8]);
        assert_eq!(history.total_steps(), 50);
        assert_relative_eq!(history.success_rate(), 2.0 / 3.0);

        let (mean, std) = history.return_stats().unwrap();
        assert_relative_eq!(mean, 2.0 / 3.0);
        assert!(std > 0.0);
    }

    #[test]
    fn test_empty_history_stats() {
        assert!(RunHistory::new().return_stats().is_none());
    }

    #[test]
    fn test_discounted_returns() {
        let returns = discounted_returns(&[0.0, 0.0, 0.0, 10.0], 0.9);
        assert_relative_eq!(returns[0], 7.29, epsilon = 1e-12);
        assert_relative_eq!(returns[3], 10.0);
    }
}
