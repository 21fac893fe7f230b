//! Swarm Environment Abstraction Layer
//!
//! This crate owns every source of non-determinism the simulator touches, so
//! that a whole Monte Carlo sweep is reproducible from one 64-bit seed.
//!
//! # Core Concept
//!
//! - **Randomness**: the [`SimRng`] contract, backed by a ChaCha8 stream in
//!   [`SeededRng`]. Every draw a run makes goes through it.
//! - **Statistics**: summary statistics and confidence intervals used to fold
//!   many runs into one result ([`stats`]).
//! - **Control**: a [`CancellationToken`] polled by long-running sweeps.
//! - **Identity**: dense [`NodeId`] / [`ClusterId`] indices into run-local arenas.
//!
//! # Example
//!
//! ```ignore
//! use swarm_env::{SeededRng, SimRng};
//!
//! let mut rng = SeededRng::new(42);
//! let time_to_failure = rng.next_exponential(0.02 / 31_536_000.0);
//! let mttr_days = rng.next_range(1.0, 7.0);
//! ```

mod cancel;
mod error;
mod rng;
mod seeded;
pub mod stats;
mod types;

pub use cancel::CancellationToken;
pub use error::EnvError;
pub use rng::SimRng;
pub use seeded::SeededRng;
pub use stats::{ConfidenceInterval, Summary};
pub use types::{ClusterId, NodeId};
