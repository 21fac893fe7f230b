//! Single central coordinator.

use super::{coordinator_capacity, update_count, CoordinationStrategy, NetworkStructure, Route};
use crate::config::Topology;
use crate::message::{light_time_ms, MessageKind, CENTRAL_DISTANCE_KM, PROCESSING_DELAY_MS};
use crate::node::{Cluster, Node};
use swarm_env::{ClusterId, NodeId, SimRng};

/// Node 0 coordinates everyone; every other node is a worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Centralized;

impl CoordinationStrategy for Centralized {
    fn topology(&self) -> Topology {
        Topology::Centralized
    }

    fn build(&self, node_count: usize, _cluster_size: usize, _rng: &mut dyn SimRng) -> NetworkStructure {
        let cluster = ClusterId(0);
        let central = NodeId(0);
        let nodes: Vec<Node> = (0..node_count)
            .map(|i| Node::new(NodeId::from_index(i), cluster, i == 0))
            .collect();
        let members = nodes.iter().map(|n| n.id).collect();

        NetworkStructure {
            nodes,
            clusters: vec![Cluster::new(cluster, members, central)],
            central_coordinator: central,
            regional_coordinators: Vec::new(),
            mesh: None,
        }
    }

    fn routes(&self, network: &NetworkStructure, source: NodeId, out: &mut Vec<Route>) {
        let central = network.central_coordinator;
        if source != central {
            out.push(Route::new(source, central));
            return;
        }
        out.extend(
            network
                .nodes
                .iter()
                .filter(|n| n.id != source && !n.is_failed())
                .map(|n| Route::new(source, n.id)),
        );
    }

    fn propagation_delay_ms(&self, _node_count: usize, _cluster_size: usize) -> f64 {
        2.0 * light_time_ms(CENTRAL_DISTANCE_KM) + PROCESSING_DELAY_MS
    }

    fn bandwidth_requirement_kbps(&self, node_count: usize, _cluster_size: usize, interval_s: f64) -> f64 {
        let messages_per_s = node_count as f64 / interval_s;
        messages_per_s * MessageKind::Ephemeris.size_bytes() as f64 * 8.0 / 1000.0
    }

    /// The coordinator saturates once one second of its relay capacity is queued.
    fn bottleneck_threshold(&self, _cluster_size: usize, bandwidth_per_node_kbps: f64) -> f64 {
        coordinator_capacity(bandwidth_per_node_kbps).floor()
    }

    fn hop_count(&self, _node_count: usize, _cluster_size: usize) -> u32 {
        2
    }

    fn message_count_estimate(
        &self,
        node_count: usize,
        _cluster_size: usize,
        duration_s: f64,
        interval_s: f64,
    ) -> u64 {
        node_count as u64 * update_count(duration_s, interval_s)
    }
}
