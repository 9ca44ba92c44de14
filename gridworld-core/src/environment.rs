//! Environment traits and types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Action, GridError, Position, Reward, RewardConfig};

/// Result of a single environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Position after the move
    pub position: Position,
    /// Reward of the cell the move landed on
    pub reward: Reward,
    /// Whether the goal was reached
    pub done: bool,
    /// Whether the episode was cut short (e.g. step limit)
    pub truncated: bool,
}

/// Construction-time description of a grid world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of rows
    pub height: usize,
    /// Number of columns
    pub width: usize,
    /// Blocking cells
    pub walls: BTreeSet<Position>,
    /// Start cell of every episode
    pub start: Position,
    /// Terminal cell
    pub goal: Position,
    /// Reward assignment
    pub rewards: RewardConfig,
}

impl GridConfig {
    /// Check dimensions and that start, goal and walls are consistent
    pub fn validate(&self) -> crate::Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(GridError::config(format!(
                "grid dimensions must be positive, got {}x{}",
                self.height, self.width
            )));
        }
        self.validate_walls(&self.walls)?;
        for (name, p) in [("start", self.start), ("goal", self.goal)] {
            if !self.contains(p) {
                return Err(GridError::config(format!("{name} {p} lies outside the grid")));
            }
        }
        Ok(())
    }

    /// Check a wall set against this geometry
    pub fn validate_walls(&self, walls: &BTreeSet<Position>) -> crate::Result<()> {
        if let Some(outside) = walls.iter().find(|p| !self.contains(**p)) {
            return Err(GridError::config(format!("wall {outside} lies outside the grid")));
        }
        if walls.contains(&self.start) {
            return Err(GridError::config(format!("wall overlaps start {}", self.start)));
        }
        if walls.contains(&self.goal) {
            return Err(GridError::config(format!("wall overlaps goal {}", self.goal)));
        }
        Ok(())
    }

    fn contains(&self, p: Position) -> bool {
        p.row < self.height && p.col < self.width
    }
}

/// Read-only view of a deterministic grid MDP
pub trait GridModel {
    /// Number of rows
    fn height(&self) -> usize;

    /// Number of columns
    fn width(&self) -> usize;

    /// Start cell
    fn start(&self) -> Position;

    /// Terminal cell
    fn goal(&self) -> Position;

    /// Whether `position` is a wall
    fn is_wall(&self, position: Position) -> bool;

    /// Deterministic successor of `position` under `action`
    fn transition(&self, position: Position, action: Action) -> Position;

    /// Reward attached to a cell
    fn reward(&self, position: Position) -> f64;

    /// Whether `position` ends an episode
    fn is_terminal(&self, position: Position) -> bool {
        position == self.goal()
    }

    /// Successor and its reward
    fn step(&self, position: Position, action: Action) -> (Position, f64) {
        let next = self.transition(position, action);
        (next, self.reward(next))
    }
}

/// Core episodic environment trait
pub trait Environment {
    /// Return to the start cell
    fn reset(&mut self) -> Position;

    /// Take a step in the environment
    fn step(&mut self, action: Action) -> Step;

    /// Current position
    fn position(&self) -> Position;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GridConfig {
        GridConfig {
            height: 3,
            width: 3,
            walls: BTreeSet::new(),
            start: Position::new(0, 0),
            goal: Position::new(2, 2),
            rewards: RewardConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_grid() {
        let mut cfg = config();
        cfg.width = 0;
        assert!(matches!(cfg.validate(), Err(GridError::Configuration(_))));
    }

    #[test]
    fn test_rejects_wall_on_start_or_goal() {
        let mut cfg = config();
        cfg.walls.insert(cfg.start);
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.walls.insert(cfg.goal);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_goal_outside() {
        let mut cfg = config();
        cfg.goal = Position::new(3, 0);
        assert!(cfg.validate().is_err());
    }
}
