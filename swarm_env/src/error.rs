//! Error types for the swarm environment layer.

use thiserror::Error;

/// Errors that can occur in the environment layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvError {
    /// Confidence level outside the open interval (0, 1)
    #[error("Invalid confidence level: {0} (expected 0 < level < 1)")]
    InvalidConfidenceLevel(f64),

    /// A distribution could not be constructed from its parameters
    #[error("Distribution error: {0}")]
    Distribution(String),
}

impl EnvError {
    /// Creates a distribution error.
    pub fn distribution(msg: impl std::fmt::Display) -> Self {
        Self::Distribution(msg.to_string())
    }
}
