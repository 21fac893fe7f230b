//! Swarm coordination simulator
//!
//! Runs the coordination models in `swarm_core` as a discrete-event
//! simulation and repeats it across seeds to get statistics.
//!
//! # Core Principle: one seed, one run
//!
//! A run is single-threaded and draws every random number from one seeded
//! stream, so a [`RunResult`] is reproducible from its seed alone. Parallelism
//! only ever happens *between* runs, and results are put back in run order
//! before they are aggregated.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       MonteCarlo                          │
//! │   jobs (index, seed) ──► worker pool ──► results by index │
//! │                              │                            │
//! │                   ┌──────────▼──────────┐                 │
//! │                   │      Simulator      │                 │
//! │                   │  EventQueue + heap  │                 │
//! │                   │  NetworkStructure   │                 │
//! │                   │  MessageQueue       │                 │
//! │                   └─────────────────────┘                 │
//! │                              │                            │
//! │                  aggregate ──► AggregateResult            │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use swarm_core::{SwarmConfig, Topology};
//! use swarm_sim::MonteCarlo;
//!
//! let config = SwarmConfig::default()
//!     .with_topology(Topology::Mesh)
//!     .with_seed(42);
//!
//! let output = MonteCarlo::new(100).run(&config)?;
//! let comparison = MonteCarlo::new(50).compare_topologies(&config, &Topology::all())?;
//! ```

mod error;
pub mod monte_carlo;
pub mod pool;
pub mod report;
pub mod simulator;

pub use error::SimError;
pub use monte_carlo::{
    aggregate, AggregateResult, MonteCarlo, MonteCarloOutput, Progress, ScalingAnalysis,
    ScalingPoint, TopologyComparison,
};
pub use report::{ReportBody, ReportExport};
pub use simulator::{RunResult, Simulator};
