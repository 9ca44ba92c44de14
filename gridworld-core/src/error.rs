//! Error types for the gridworld core library

use thiserror::Error;

/// Core error type for grid MDP operations
#[derive(Error, Debug)]
pub enum GridError {
    /// Invalid construction-time configuration (overlapping walls, empty grid, bad thresholds)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Action index outside the fixed four-action set
    #[error("Invalid action: {0}")]
    InvalidAction(usize),

    /// Position outside the grid
    #[error("Position ({row}, {col}) is out of bounds")]
    OutOfBounds {
        /// Row of the offending position
        row: usize,
        /// Column of the offending position
        col: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl GridError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type alias for grid operations
pub type Result<T> = std::result::Result<T, GridError>;
