//! Common types and limits used throughout the index.

use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};

/// Smallest legal minimum degree (a 2-3-4 tree)
pub const MIN_DEGREE: usize = 2;

/// Largest accepted minimum degree; keeps `2t - 1` far from overflow
pub const MAX_DEGREE: usize = 1 << 16;

/// Default minimum degree (visualization-friendly: at most 3 keys per node)
pub const DEFAULT_MIN_DEGREE: usize = 2;

/// B-tree configuration
///
/// `min_degree` is the order parameter `t`: every node except the root
/// holds between `t - 1` and `2t - 1` keys. It is fixed for the lifetime
/// of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BTreeConfig {
    /// Minimum degree `t`
    pub min_degree: usize,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            min_degree: DEFAULT_MIN_DEGREE,
        }
    }
}

impl BTreeConfig {
    /// Create a new config with the given minimum degree
    pub fn new(min_degree: usize) -> Self {
        Self { min_degree }
    }

    /// Set the minimum degree
    pub fn min_degree(mut self, min_degree: usize) -> Self {
        self.min_degree = min_degree;
        self
    }

    /// Parse a config from JSON, e.g. `{"minDegree": 3}`
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject orders outside `[MIN_DEGREE, MAX_DEGREE]`
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&self.min_degree) {
            return Err(TreeError::InvalidOrder {
                min_degree: self.min_degree,
                min: MIN_DEGREE,
                max: MAX_DEGREE,
            });
        }
        Ok(())
    }

    /// Maximum keys in any node (`2t - 1`)
    pub fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    /// Minimum keys in a non-root node (`t - 1`)
    pub fn min_keys(&self) -> usize {
        self.min_degree - 1
    }
}
