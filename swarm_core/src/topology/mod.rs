//! Coordination topologies.
//!
//! Each topology is a [`CoordinationStrategy`]: it builds the initial
//! [`NetworkStructure`], routes state updates, and supplies the analytic
//! cost model (propagation delay, bandwidth, bottleneck, hop count) that the
//! simulator reports alongside its measurements.
//!
//! | Topology     | Builder                          | Routing                                  |
//! |--------------|----------------------------------|------------------------------------------|
//! | Centralized  | one coordinator, one cluster     | worker -> coordinator, coordinator -> all |
//! | Hierarchical | `ceil(N / size)` clusters, 10/region | member -> cluster coord -> regional   |
//! | Mesh         | `min(5, ceil(log2 N))` neighbors | gossip to live neighbors                 |

mod centralized;
mod hierarchical;
mod mesh;

pub use centralized::Centralized;
pub use hierarchical::Hierarchical;
pub use mesh::Mesh;

use crate::config::Topology;
use crate::message::MessageKind;
use crate::node::{Cluster, Node};
use serde::{Deserialize, Serialize};
use swarm_env::{NodeId, SimRng};

/// Latency target behind the bottleneck estimates (ms)
pub const TARGET_LATENCY_MS: f64 = 1000.0;

/// Clusters grouped under one regional coordinator
pub const CLUSTERS_PER_REGION: usize = 10;

/// One hop of an update: `sender` transmits to `receiver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub sender: NodeId,
    pub receiver: NodeId,
}

impl Route {
    pub fn new(sender: NodeId, receiver: NodeId) -> Self {
        Self { sender, receiver }
    }
}

/// Gossip neighbor table with a fixed stride.
///
/// Neighbors of node `i` are `neighbors[i * stride .. (i + 1) * stride]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAdjacency {
    stride: usize,
    neighbors: Vec<NodeId>,
}

impl MeshAdjacency {
    /// Wraps a flattened table. `neighbors.len()` must be a multiple of `stride`.
    pub fn new(stride: usize, neighbors: Vec<NodeId>) -> Self {
        debug_assert!(stride == 0 || neighbors.len() % stride == 0);
        Self { stride, neighbors }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn neighbors_of(&self, node: NodeId) -> &[NodeId] {
        let start = node.index() * self.stride;
        self.neighbors.get(start..start + self.stride).unwrap_or(&[])
    }
}

/// Initial node/cluster graph of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStructure {
    /// Dense arena; `nodes[i].id == NodeId(i)`
    pub nodes: Vec<Node>,

    pub clusters: Vec<Cluster>,

    pub central_coordinator: NodeId,

    /// One per region (hierarchical only)
    pub regional_coordinators: Vec<NodeId>,

    /// Gossip neighbors (mesh only)
    pub mesh: Option<MeshAdjacency>,
}

impl NetworkStructure {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Cluster owning `id`.
    pub fn cluster_of(&self, id: NodeId) -> &Cluster {
        &self.clusters[self.nodes[id.index()].cluster.index()]
    }
}

/// Behavior that differs between topologies.
///
/// Implementations are stateless unit structs; pick one with
/// [`Topology::strategy`](crate::Topology::strategy).
pub trait CoordinationStrategy: Send + Sync {
    fn topology(&self) -> Topology;

    /// Builds the initial network. `node_count` and `cluster_size` are positive.
    fn build(&self, node_count: usize, cluster_size: usize, rng: &mut dyn SimRng) -> NetworkStructure;

    /// Appends the hops a state update from `source` takes to `out`.
    fn routes(&self, network: &NetworkStructure, source: NodeId, out: &mut Vec<Route>);

    /// Expected end-to-end propagation delay of one update (ms).
    fn propagation_delay_ms(&self, node_count: usize, cluster_size: usize) -> f64;

    /// Aggregate bandwidth needed at one update per `interval_s` (kbps).
    fn bandwidth_requirement_kbps(&self, node_count: usize, cluster_size: usize, interval_s: f64) -> f64;

    /// Node count at which latency would exceed [`TARGET_LATENCY_MS`].
    fn bottleneck_threshold(&self, cluster_size: usize, bandwidth_per_node_kbps: f64) -> f64;

    fn hop_count(&self, node_count: usize, cluster_size: usize) -> u32;

    /// Messages sent over `duration_s` at one update per `interval_s`.
    fn message_count_estimate(
        &self,
        node_count: usize,
        cluster_size: usize,
        duration_s: f64,
        interval_s: f64,
    ) -> u64;

    /// Seconds between state-sync rounds.
    fn sync_interval_s(&self) -> f64 {
        10.0
    }

    /// Whether clusters rotate coordinators on a duty cycle.
    fn rotates_coordinators(&self) -> bool {
        false
    }

    /// Whether the run schedules gossip rounds.
    fn gossips(&self) -> bool {
        false
    }

    /// Whether coordinator availability is measured (mesh has no coordinator).
    fn tracks_availability(&self) -> bool {
        true
    }
}

/// Gossip neighbors per node: `min(5, ceil(log2 N))`, never more than `N - 1`.
pub fn gossip_fanout(node_count: usize) -> usize {
    gossip_rounds(node_count).min(5) as usize
}

/// Rounds for gossip to reach every node: `ceil(log2 N)`.
pub fn gossip_rounds(node_count: usize) -> u32 {
    if node_count <= 1 {
        return 0;
    }
    (node_count as f64).log2().ceil() as u32
}

/// `ceil(N / cluster_size)`.
pub fn cluster_count(node_count: usize, cluster_size: usize) -> usize {
    node_count.div_ceil(cluster_size.max(1))
}

/// `ceil(clusters / 10)`.
pub fn region_count(clusters: usize) -> usize {
    clusters.div_ceil(CLUSTERS_PER_REGION)
}

/// Hierarchy depth: `1 + ceil(log10(clusters))`.
pub fn hierarchy_levels(clusters: usize) -> u32 {
    1 + (clusters.max(1) as f64).log10().ceil() as u32
}

/// Ephemeris updates a coordinator can relay per second within the latency target.
pub(crate) fn coordinator_capacity(bandwidth_per_node_kbps: f64) -> f64 {
    let messages_per_s = bandwidth_per_node_kbps * 1000.0 / (MessageKind::Ephemeris.size_bytes() as f64 * 8.0);
    messages_per_s * (TARGET_LATENCY_MS / 1000.0)
}

/// `ceil(duration / interval)`, 0 for a non-positive interval.
pub(crate) fn update_count(duration_s: f64, interval_s: f64) -> u64 {
    if interval_s <= 0.0 {
        return 0;
    }
    (duration_s / interval_s).ceil().max(0.0) as u64
}
