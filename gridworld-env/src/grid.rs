//! The deterministic grid world

use ndarray::Array2;
use std::collections::BTreeSet;
use std::sync::Arc;

use gridworld_core::{
    Action, Environment, GridConfig, GridError, GridModel, Position, Result, Reward, RewardConfig,
    Step,
};

/// Immutable grid geometry, wall set and reward assignment.
///
/// Walls fully block movement: a move into a wall or off the board leaves
/// the position unchanged. Changing the walls produces a new `GridWorld`
/// through [`GridWorld::with_walls`]; existing handles are never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorld {
    config: GridConfig,
    reward_grid: Array2<f64>,
}

impl GridWorld {
    /// Validate `config` and build the reward grid
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        let reward_grid = Self::build_rewards(&config);
        tracing::debug!(
            height = config.height,
            width = config.width,
            walls = config.walls.len(),
            "built grid world"
        );
        Ok(Self {
            config,
            reward_grid,
        })
    }

    fn build_rewards(config: &GridConfig) -> Array2<f64> {
        let RewardConfig { goal, wall, empty } = config.rewards;
        let mut grid = Array2::from_elem((config.height, config.width), empty);
        for w in &config.walls {
            grid[[w.row, w.col]] = wall;
        }
        grid[[config.goal.row, config.goal.col]] = goal;
        grid
    }

    /// Same geometry and rewards with a different wall set
    pub fn with_walls(&self, walls: BTreeSet<Position>) -> Result<Self> {
        Self::new(GridConfig {
            walls,
            ..self.config.clone()
        })
    }

    /// The configuration this world was built from
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Wall cells
    #[must_use]
    pub fn walls(&self) -> &BTreeSet<Position> {
        &self.config.walls
    }

    /// Reward of every cell as an H x W array
    #[must_use]
    pub fn reward_grid(&self) -> &Array2<f64> {
        &self.reward_grid
    }

    /// Whether `position` is inside the grid
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.config.height && position.col < self.config.width
    }

    /// Checked [`GridModel::step`]: errors instead of panicking when
    /// `position` lies outside the grid
    pub fn try_step(&self, position: Position, action: Action) -> Result<(Position, f64)> {
        if !self.contains(position) {
            return Err(GridError::OutOfBounds {
                row: position.row,
                col: position.col,
            });
        }
        Ok(self.step(position, action))
    }

    /// Every cell in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.config.width;
        (0..self.config.height).flat_map(move |row| (0..width).map(move |col| Position::new(row, col)))
    }

    /// Every non-wall cell in row-major order
    pub fn states(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |p| !self.is_wall(*p))
    }

    /// Non-wall, non-goal cells: the cells algorithms sweep over
    pub fn decision_states(&self) -> impl Iterator<Item = Position> + '_ {
        self.states().filter(move |p| !self.is_terminal(*p))
    }
}

impl GridModel for GridWorld {
    fn height(&self) -> usize {
        self.config.height
    }

    fn width(&self) -> usize {
        self.config.width
    }

    fn start(&self) -> Position {
        self.config.start
    }

    fn goal(&self) -> Position {
        self.config.goal
    }

    fn is_wall(&self, position: Position) -> bool {
        self.config.walls.contains(&position)
    }

    fn transition(&self, position: Position, action: Action) -> Position {
        assert!(self.contains(position), "position {position} outside the grid");
        match position.shifted(action, self.config.height, self.config.width) {
            Some(next) if !self.is_wall(next) => next,
            _ => position,
        }
    }

    fn reward(&self, position: Position) -> f64 {
        self.reward_grid[[position.row, position.col]]
    }
}

/// An episode in progress on a shared, immutable world
#[derive(Debug, Clone)]
pub struct EpisodeCursor {
    world: Arc<GridWorld>,
    position: Position,
}

impl EpisodeCursor {
    /// Start a cursor at the world's start cell
    #[must_use]
    pub fn new(world: Arc<GridWorld>) -> Self {
        let position = world.start();
        Self { world, position }
    }

    /// The world this episode runs on
    #[must_use]
    pub fn world(&self) -> &GridWorld {
        &self.world
    }
}

impl Environment for EpisodeCursor {
    fn reset(&mut self) -> Position {
        self.position = self.world.start();
        self.position
    }

    fn step(&mut self, action: Action) -> Step {
        let (next, reward) = GridModel::step(self.world.as_ref(), self.position, action);
        self.position = next;
        Step {
            position: next,
            reward: Reward(reward),
            done: self.world.is_terminal(next),
            truncated: false,
        }
    }

    fn position(&self) -> Position {
        self.position
    }
}
