//! Grid positions, feature indexing and terminal status

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Action, GridError};

/// A cell of the grid, `(row, col)`, 0-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
}

impl Position {
    /// Create a new position
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Neighbour in the direction of `action`, or `None` if it would leave
    /// a `height` x `width` grid
    #[must_use]
    pub fn shifted(self, action: Action, height: usize, width: usize) -> Option<Position> {
        let (dr, dc) = action.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < height && col < width).then_some(Position { row, col })
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Integer row of the action-value table addressed by a position
pub type FeatureIndex = usize;

/// Bijection between positions and feature indices, `row * width + col`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureIndexer {
    height: usize,
    width: usize,
}

impl FeatureIndexer {
    /// Create an indexer for a `height` x `width` grid
    #[must_use]
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of distinct features
    #[must_use]
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    /// True for a degenerate zero-sized grid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feature index of `position`.
    ///
    /// # Panics
    ///
    /// Panics if the position lies outside the grid.
    #[must_use]
    pub fn index(&self, position: Position) -> FeatureIndex {
        assert!(
            position.row < self.height && position.col < self.width,
            "position {position} outside {}x{} grid",
            self.height,
            self.width
        );
        position.row * self.width + position.col
    }

    /// Inverse of [`FeatureIndexer::index`]
    pub fn position(&self, feature: FeatureIndex) -> crate::Result<Position> {
        if feature >= self.len() {
            return Err(GridError::DimensionMismatch {
                expected: self.len(),
                actual: feature,
            });
        }
        Ok(Position::new(feature / self.width, feature % self.width))
    }
}

/// Terminal state indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    /// Not a terminal state
    No,
    /// Goal reached (episode ends)
    Yes,
    /// Truncated (step limit, budget, environment swap or interrupt)
    Truncated,
}

impl Terminal {
    /// Check if the episode is over (either Yes or Truncated)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::No)
    }
}
