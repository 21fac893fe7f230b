//! Swarm Core - coordination models for very large swarms
//!
//! The building blocks of one simulated run:
//! 1. **Topology**: centralized, hierarchical and mesh [`CoordinationStrategy`]s
//!    that build the network and route state updates
//! 2. **Messaging**: a bandwidth-limited [`MessageQueue`] with drop accounting
//! 3. **Coordinators**: power accounting, availability and the handoff protocol
//! 4. **Scheduling**: a time-ordered [`EventQueue`] with FIFO tie-break

pub mod config;
pub mod coordinator;
mod error;
pub mod message;
pub mod node;
pub mod queue;
pub mod scheduler;
pub mod topology;

// Re-export key types for convenience
pub use config::{PowerProfile, SwarmConfig, Topology};
pub use coordinator::HandoffOutcome;
pub use error::ConfigError;
pub use message::{Message, MessageKind};
pub use node::{Cluster, Node, NodeStatus};
pub use queue::{MessageQueue, PropagationStats, QueueStats};
pub use scheduler::{EventKind, EventPayload, EventQueue, SimEvent};
pub use topology::{CoordinationStrategy, MeshAdjacency, NetworkStructure, Route};
