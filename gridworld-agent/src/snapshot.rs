//! Read-only render snapshots
//!
//! A [`RenderSnapshot`] copies everything a renderer needs out of an agent
//! and its world, so drawing never calls back into a running algorithm.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

use gridworld_core::{Action, Agent, ArrowTag, GridModel, Position};
use gridworld_env::GridWorld;

/// Grid state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Number of rows
    pub height: usize,
    /// Number of columns
    pub width: usize,
    /// Cell the algorithm currently occupies
    pub position: Position,
    /// Value estimate per cell
    pub values: Array2<f64>,
    /// Reward per cell
    pub rewards: Array2<f64>,
    /// Best-action arrow per cell, row-major
    pub arrows: Vec<ArrowTag>,
    /// Wall cells
    pub walls: Vec<Position>,
    /// Goal cell
    pub goal: Position,
}

impl RenderSnapshot {
    /// Copy the state of `agent` acting in `world` at `position`
    #[must_use]
    pub fn capture<A: Agent + ?Sized>(agent: &A, world: &GridWorld, position: Position) -> Self {
        let (height, width) = (world.height(), world.width());
        let values = Array2::from_shape_fn((height, width), |(row, col)| {
            agent.value(Position::new(row, col))
        });
        let arrows = world
            .positions()
            .map(|p| ArrowTag::from(agent.best_actions(p)))
            .collect();
        Self {
            height,
            width,
            position,
            values,
            rewards: world.reward_grid().clone(),
            arrows,
            walls: world.walls().iter().copied().collect(),
            goal: world.goal(),
        }
    }

    /// Arrow at a cell
    #[must_use]
    pub fn arrow(&self, position: Position) -> ArrowTag {
        self.arrows[position.row * self.width + position.col]
    }
}

fn glyph(action: Action) -> char {
    match action {
        Action::Up => '^',
        Action::Down => 'v',
        Action::Right => '>',
        Action::Left => '<',
    }
}

impl fmt::Display for RenderSnapshot {
    /// One character per cell: `@` agent, `G` goal, `#` wall, an arrow for
    /// a single best action, `+` for several, `.` for none
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            for col in 0..self.width {
                let p = Position::new(row, col);
                let c = if p == self.position {
                    '@'
                } else if p == self.goal {
                    'G'
                } else if self.walls.contains(&p) {
                    '#'
                } else {
                    match self.arrow(p) {
                        ArrowTag::One(action) => glyph(action),
                        ArrowTag::None => '.',
                        _ => '+',
                    }
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyIterationSolver;
    use gridworld_core::PolicyIterationConfig;
    use gridworld_env::{layouts, ActiveEnvironment};

    #[test]
    fn test_snapshot_of_solved_grid() {
        let world = GridWorld::new(layouts::notched_3x3()).unwrap();
        let mut solver =
            PolicyIterationSolver::new(PolicyIterationConfig::default(), ActiveEnvironment::fixed(world.clone()))
                .unwrap();
        solver.run();

        let snap = RenderSnapshot::capture(&solver, &world, world.start());
        assert_eq!(snap.arrow(Position::new(1, 0)), ArrowTag::One(Action::Down));
        assert_eq!(snap.arrow(Position::new(0, 1)), ArrowTag::None);
        assert_eq!(snap.values[[2, 2]], 0.0);
        assert_eq!(snap.rewards[[2, 2]], 10.0);

        let text = snap.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("@#"));
        assert_eq!(&lines[2][..2], ">>");
        assert!(lines[2].ends_with('G'));
    }
}
