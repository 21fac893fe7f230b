//! Identifier types shared by every crate in the simulator.

use serde::{Deserialize, Serialize};

/// Dense identifier for a swarm node.
///
/// The value is the node's index in its run's node arena, so lookups are a
/// slice index rather than a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Creates an id from an arena index.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Dense identifier for a cluster (index into the run's cluster list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl ClusterId {
    /// Returns the cluster list index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Creates an id from a cluster list index.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}
