//! Peer-to-peer gossip mesh.

use super::{
    gossip_fanout, gossip_rounds, update_count, CoordinationStrategy, MeshAdjacency,
    NetworkStructure, Route, TARGET_LATENCY_MS,
};
use crate::config::Topology;
use crate::message::{light_time_ms, MessageKind, INTER_NODE_DISTANCE_KM, PROCESSING_DELAY_MS};
use crate::node::{Cluster, Node};
use swarm_env::{ClusterId, NodeId, SimRng};

/// Assumed gossip round time for the convergence bottleneck (ms)
const ROUND_TIME_MS: f64 = 10.0 + PROCESSING_DELAY_MS;

/// Every node gossips to `gossip_fanout(N)` random distinct peers.
///
/// There is no real coordinator. One virtual cluster spans the swarm and
/// names node 0 as its nominal coordinator without promoting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mesh;

impl Mesh {
    /// Draws `fanout` distinct neighbors for every node, never the node itself.
    fn wire(node_count: usize, fanout: usize, rng: &mut dyn SimRng) -> MeshAdjacency {
        let mut table = Vec::with_capacity(node_count * fanout);
        for i in 0..node_count {
            let row_start = table.len();
            while table.len() - row_start < fanout {
                // Uniform over the other N - 1 nodes
                let mut j = rng.next_int(0, node_count - 1);
                if j >= i {
                    j += 1;
                }
                let candidate = NodeId::from_index(j);
                if !table[row_start..].contains(&candidate) {
                    table.push(candidate);
                }
            }
        }
        MeshAdjacency::new(fanout, table)
    }
}

impl CoordinationStrategy for Mesh {
    fn topology(&self) -> Topology {
        Topology::Mesh
    }

    fn build(&self, node_count: usize, _cluster_size: usize, rng: &mut dyn SimRng) -> NetworkStructure {
        let cluster = ClusterId(0);
        let nominal = NodeId(0);
        let nodes: Vec<Node> = (0..node_count)
            .map(|i| Node::new(NodeId::from_index(i), cluster, false))
            .collect();
        let members = nodes.iter().map(|n| n.id).collect();
        let adjacency = Self::wire(node_count, gossip_fanout(node_count), rng);

        NetworkStructure {
            nodes,
            clusters: vec![Cluster::new(cluster, members, nominal)],
            central_coordinator: nominal,
            regional_coordinators: Vec::new(),
            mesh: Some(adjacency),
        }
    }

    fn routes(&self, network: &NetworkStructure, source: NodeId, out: &mut Vec<Route>) {
        let Some(mesh) = &network.mesh else {
            return;
        };
        out.extend(
            mesh.neighbors_of(source)
                .iter()
                .copied()
                .filter(|&id| !network.node(id).is_failed())
                .map(|id| Route::new(source, id)),
        );
    }

    fn propagation_delay_ms(&self, node_count: usize, _cluster_size: usize) -> f64 {
        let round = light_time_ms(INTER_NODE_DISTANCE_KM) + PROCESSING_DELAY_MS;
        gossip_rounds(node_count) as f64 * round
    }

    fn bandwidth_requirement_kbps(&self, node_count: usize, _cluster_size: usize, interval_s: f64) -> f64 {
        let rounds = gossip_rounds(node_count);
        if rounds == 0 {
            return 0.0;
        }
        let per_round = (node_count * gossip_fanout(node_count)) as f64;
        let messages_per_s = per_round / interval_s / rounds as f64;
        messages_per_s * MessageKind::Gossip.size_bytes() as f64 * 8.0 / 1000.0
    }

    /// Size at which `log2 N` gossip rounds no longer fit in the latency target.
    fn bottleneck_threshold(&self, _cluster_size: usize, _bandwidth_per_node_kbps: f64) -> f64 {
        2f64.powf(TARGET_LATENCY_MS / ROUND_TIME_MS)
    }

    fn hop_count(&self, node_count: usize, _cluster_size: usize) -> u32 {
        gossip_rounds(node_count)
    }

    fn message_count_estimate(
        &self,
        node_count: usize,
        _cluster_size: usize,
        duration_s: f64,
        interval_s: f64,
    ) -> u64 {
        (node_count * gossip_fanout(node_count)) as u64
            * gossip_rounds(node_count) as u64
            * update_count(duration_s, interval_s)
    }

    fn sync_interval_s(&self) -> f64 {
        60.0
    }

    fn gossips(&self) -> bool {
        true
    }

    fn tracks_availability(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PowerProfile;
    use crate::coordinator::fail_node;
    use approx::assert_relative_eq;
    use std::collections::HashSet;
    use swarm_env::SeededRng;

    #[test]
    fn test_neighbors_distinct_and_not_self() {
        let mut rng = SeededRng::new(9);
        let network = Mesh.build(500, 100, &mut rng);
        let mesh = network.mesh.as_ref().unwrap();

        assert_eq!(mesh.stride(), 5);
        for node in &network.nodes {
            let neighbors = mesh.neighbors_of(node.id);
            assert_eq!(neighbors.len(), 5);
            assert!(!neighbors.contains(&node.id));
            let unique: HashSet<_> = neighbors.iter().collect();
            assert_eq!(unique.len(), neighbors.len());
            assert!(neighbors.iter().all(|n| n.index() < 500));
        }
    }

    #[test]
    fn test_tiny_meshes() {
        let mut rng = SeededRng::new(2);

        let one = Mesh.build(1, 100, &mut rng);
        assert!(one.mesh.as_ref().unwrap().neighbors_of(NodeId(0)).is_empty());

        let two = Mesh.build(2, 100, &mut rng);
        let mesh = two.mesh.as_ref().unwrap();
        assert_eq!(mesh.neighbors_of(NodeId(0)), &[NodeId(1)]);
        assert_eq!(mesh.neighbors_of(NodeId(1)), &[NodeId(0)]);

        let three = Mesh.build(3, 100, &mut rng);
        let mesh = three.mesh.as_ref().unwrap();
        let mut row: Vec<NodeId> = mesh.neighbors_of(NodeId(1)).to_vec();
        row.sort();
        assert_eq!(row, vec![NodeId(0), NodeId(2)]);
    }

    #[test]
    fn test_same_seed_same_wiring() {
        let a = Mesh.build(300, 100, &mut SeededRng::new(77));
        let b = Mesh.build(300, 100, &mut SeededRng::new(77));
        assert_eq!(a.mesh, b.mesh);
    }

    #[test]
    fn test_no_coordinator_promoted() {
        let network = Mesh.build(50, 100, &mut SeededRng::new(1));
        assert_eq!(network.clusters.len(), 1);
        assert!(network.nodes.iter().all(|n| !n.is_coordinator()));
    }

    #[test]
    fn test_routes_skip_failed_neighbors() {
        let mut network = Mesh.build(64, 100, &mut SeededRng::new(4));
        let source = NodeId(10);
        let first = network.mesh.as_ref().unwrap().neighbors_of(source)[0];
        let power = PowerProfile { coordinator_w: 18.0, base_w: 5.0 };
        fail_node(&mut network.nodes[first.index()], 0.0, &power);

        let mut routes = Vec::new();
        Mesh.routes(&network, source, &mut routes);

        assert_eq!(routes.len(), 4);
        assert!(routes.iter().all(|r| r.sender == source && r.receiver != first));
    }

    #[test]
    fn test_cost_model() {
        let round = light_time_ms(1000.0) + 1.0;
        assert_relative_eq!(Mesh.propagation_delay_ms(1024, 100), 10.0 * round);
        assert_eq!(Mesh.propagation_delay_ms(1, 100), 0.0);

        // 1024 * 5 / 10 s / 10 rounds * 1024 bit
        assert_relative_eq!(Mesh.bandwidth_requirement_kbps(1024, 100, 10.0), 52.4288, max_relative = 1e-12);
        assert_eq!(Mesh.bandwidth_requirement_kbps(1, 100, 10.0), 0.0);

        assert_relative_eq!(Mesh.bottleneck_threshold(100, 1.0), 2f64.powf(1000.0 / 11.0));
        assert_eq!(Mesh.hop_count(1_000_000, 100), 20);
        assert_eq!(Mesh.message_count_estimate(1024, 100, 60.0, 10.0), 1024 * 5 * 10 * 6);
    }
}
