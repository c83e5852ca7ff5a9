//! Error types for the B-tree index.

use thiserror::Error;

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while building or checking a tree
#[derive(Error, Debug)]
pub enum TreeError {
    /// Minimum degree outside the supported range
    #[error("Invalid order: minimum degree {min_degree} (must be between {min} and {max})")]
    InvalidOrder {
        min_degree: usize,
        min: usize,
        max: usize,
    },

    /// A structural invariant does not hold
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Configuration input could not be understood
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TreeError {
    /// Create an invariant violation error with a message
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}
