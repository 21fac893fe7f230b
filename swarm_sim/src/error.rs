//! Simulation errors.

use swarm_core::ConfigError;
use swarm_env::EnvError;
use thiserror::Error;

/// Errors surfaced by the simulator and the Monte Carlo orchestrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Configuration rejected before anything was allocated
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Statistics error: {0}")]
    Env(#[from] EnvError),

    /// A cancellation token fired mid-run or mid-sweep
    #[error("Simulation cancelled")]
    Cancelled,

    #[error("No runs to aggregate")]
    NoRuns,

    #[error("Scaling sweep needs at least one node count")]
    EmptySweep,

    #[error("Comparison needs at least one topology")]
    NoTopologies,
}
