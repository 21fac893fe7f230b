//! Configuration errors.

use thiserror::Error;

/// Rejections raised by [`SwarmConfig::validate`](crate::SwarmConfig::validate)
/// and the config loaders.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("node_count must be positive")]
    ZeroNodes,

    #[error("node_count {0} exceeds the u32 id space")]
    TooManyNodes(usize),

    #[error("cluster_size must be positive")]
    ZeroClusterSize,

    #[error("coordinator_duty_cycle_hours must be positive and finite (got {0})")]
    InvalidDutyCycle(f64),

    #[error("simulation_days must be positive and finite (got {0})")]
    InvalidDuration(f64),

    /// A rate, power or bandwidth field that must be finite and non-negative
    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidQuantity { field: &'static str, value: f64 },

    #[error("Unknown topology: {0}")]
    UnknownTopology(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to read config: {0}")]
    Io(String),
}

impl ConfigError {
    pub(crate) fn quantity(field: &'static str, value: f64) -> Self {
        Self::InvalidQuantity { field, value }
    }
}
