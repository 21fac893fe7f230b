//! Cluster / region / central hierarchy.

use super::{
    cluster_count, coordinator_capacity, hierarchy_levels, region_count, update_count,
    CoordinationStrategy, NetworkStructure, Route, CLUSTERS_PER_REGION,
};
use crate::config::Topology;
use crate::message::{
    light_time_ms, MessageKind, INTER_NODE_DISTANCE_KM, PROCESSING_DELAY_MS, REGIONAL_DISTANCE_KM,
};
use crate::node::{Cluster, Node};
use swarm_env::{ClusterId, NodeId, SimRng};

/// Upper bound on regions assumed by the bottleneck estimate
const MAX_REGIONS: f64 = 100.0;

/// Consecutive runs of `cluster_size` nodes form clusters led by their first
/// member; every ten clusters form a region led by the first cluster's
/// coordinator; the first regional coordinator is central.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hierarchical;

impl CoordinationStrategy for Hierarchical {
    fn topology(&self) -> Topology {
        Topology::Hierarchical
    }

    fn build(&self, node_count: usize, cluster_size: usize, _rng: &mut dyn SimRng) -> NetworkStructure {
        let cluster_size = cluster_size.max(1);
        let num_clusters = cluster_count(node_count, cluster_size);

        let mut nodes = Vec::with_capacity(node_count);
        let mut clusters = Vec::with_capacity(num_clusters);
        let mut regional_coordinators = Vec::with_capacity(region_count(num_clusters));

        for c in 0..num_clusters {
            let cluster_id = ClusterId::from_index(c);
            let start = c * cluster_size;
            let end = (start + cluster_size).min(node_count);
            let members: Vec<NodeId> = (start..end).map(NodeId::from_index).collect();

            // First member leads; clusters are never empty since end > start
            let coordinator = members[0];
            nodes.extend(
                members
                    .iter()
                    .map(|&id| Node::new(id, cluster_id, id == coordinator)),
            );

            if c % CLUSTERS_PER_REGION == 0 {
                regional_coordinators.push(coordinator);
            }
            let mut cluster = Cluster::new(cluster_id, members, coordinator);
            cluster.regional_coordinator = regional_coordinators.get(c / CLUSTERS_PER_REGION).copied();
            clusters.push(cluster);
        }

        let central_coordinator = regional_coordinators.first().copied().unwrap_or(NodeId(0));

        NetworkStructure {
            nodes,
            clusters,
            central_coordinator,
            regional_coordinators,
            mesh: None,
        }
    }

    fn routes(&self, network: &NetworkStructure, source: NodeId, out: &mut Vec<Route>) {
        let cluster = network.cluster_of(source);
        if source != cluster.coordinator {
            out.push(Route::new(source, cluster.coordinator));
            return;
        }

        if let Some(regional) = cluster.regional_coordinator {
            if regional != source {
                out.push(Route::new(source, regional));
            }
        }
        out.extend(
            cluster
                .members
                .iter()
                .copied()
                .filter(|&id| id != source && !network.node(id).is_failed())
                .map(|id| Route::new(source, id)),
        );
    }

    fn propagation_delay_ms(&self, node_count: usize, cluster_size: usize) -> f64 {
        let levels = hierarchy_levels(cluster_count(node_count, cluster_size)) as f64;
        light_time_ms(INTER_NODE_DISTANCE_KM)
            + light_time_ms(REGIONAL_DISTANCE_KM) * (levels - 1.0)
            + PROCESSING_DELAY_MS * levels
    }

    fn bandwidth_requirement_kbps(&self, node_count: usize, cluster_size: usize, interval_s: f64) -> f64 {
        let clusters = cluster_count(node_count, cluster_size);
        let regions = region_count(clusters);
        let messages_per_s = (node_count + clusters + regions) as f64 / interval_s;
        messages_per_s * MessageKind::Ephemeris.size_bytes() as f64 * 8.0 / 1000.0
    }

    fn bottleneck_threshold(&self, cluster_size: usize, bandwidth_per_node_kbps: f64) -> f64 {
        coordinator_capacity(bandwidth_per_node_kbps) * cluster_size as f64 * MAX_REGIONS
    }

    fn hop_count(&self, node_count: usize, cluster_size: usize) -> u32 {
        2 * hierarchy_levels(cluster_count(node_count, cluster_size))
    }

    fn message_count_estimate(
        &self,
        node_count: usize,
        cluster_size: usize,
        duration_s: f64,
        interval_s: f64,
    ) -> u64 {
        let clusters = cluster_count(node_count, cluster_size);
        let regions = region_count(clusters);
        (node_count + clusters + regions) as u64 * update_count(duration_s, interval_s)
    }

    fn rotates_coordinators(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swarm_env::SeededRng;

    #[test]
    fn test_ten_thousand_by_hundred() {
        let mut rng = SeededRng::new(1);
        let network = Hierarchical.build(10_000, 100, &mut rng);

        assert_eq!(network.clusters.len(), 100);
        assert_eq!(network.regional_coordinators.len(), 10);
        assert_eq!(network.central_coordinator, network.regional_coordinators[0]);
        assert_eq!(network.nodes.iter().filter(|n| n.is_coordinator()).count(), 100);

        for (c, cluster) in network.clusters.iter().enumerate() {
            assert_eq!(cluster.members.len(), 100);
            assert_eq!(cluster.coordinator, cluster.members[0]);
            assert_eq!(
                cluster.regional_coordinator,
                Some(network.regional_coordinators[c / 10])
            );
        }
    }

    #[test]
    fn test_short_last_cluster() {
        let mut rng = SeededRng::new(1);
        let network = Hierarchical.build(250, 100, &mut rng);

        assert_eq!(network.clusters.len(), 3);
        assert_eq!(network.clusters[2].members.len(), 50);
        assert_eq!(network.clusters[2].coordinator, NodeId(200));
        assert_eq!(network.regional_coordinators, vec![NodeId(0)]);
    }

    #[test]
    fn test_routing() {
        let mut rng = SeededRng::new(1);
        let network = Hierarchical.build(30, 10, &mut rng);
        let mut routes = Vec::new();

        // Member -> its cluster coordinator
        Hierarchical.routes(&network, NodeId(15), &mut routes);
        assert_eq!(routes, vec![Route::new(NodeId(15), NodeId(10))]);

        // Cluster coordinator -> regional coordinator, then its members
        routes.clear();
        Hierarchical.routes(&network, NodeId(10), &mut routes);
        assert_eq!(routes.len(), 1 + 9);
        assert_eq!(routes[0], Route::new(NodeId(10), NodeId(0)));

        // Regional coordinator only broadcasts locally
        routes.clear();
        Hierarchical.routes(&network, NodeId(0), &mut routes);
        assert_eq!(routes.len(), 9);
        assert!(routes.iter().all(|r| r.receiver != NodeId(0)));
    }

    #[test]
    fn test_cost_model() {
        // 100 clusters -> 3 levels
        let expected = light_time_ms(1000.0) + light_time_ms(50_000.0) * 2.0 + 3.0;
        assert_relative_eq!(Hierarchical.propagation_delay_ms(10_000, 100), expected);
        assert_relative_eq!(
            Hierarchical.bandwidth_requirement_kbps(10_000, 100, 10.0),
            (10_000.0 + 100.0 + 10.0) / 10.0 * 2.048,
            max_relative = 1e-12
        );
        assert_relative_eq!(Hierarchical.bottleneck_threshold(100, 1.0), 1000.0 / 2048.0 * 100.0 * 100.0);
        assert_eq!(Hierarchical.hop_count(10_000, 100), 6);
        assert_eq!(
            Hierarchical.message_count_estimate(10_000, 100, 100.0, 10.0),
            10_110 * 10
        );
    }
}
