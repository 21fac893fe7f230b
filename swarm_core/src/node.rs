//! Node and cluster state.
//!
//! Nodes live in one dense arena per run and are addressed by [`NodeId`].
//! Power is accounted lazily: a node carries the time up to which its energy
//! and coordinator time are settled, and [`Node::settle`] integrates the
//! constant draw of its current role since then. Every role change settles
//! first, so lazy accounting equals a per-event sweep over all nodes.

use crate::config::PowerProfile;
use serde::{Deserialize, Serialize};
use swarm_env::{ClusterId, NodeId};

/// Lifecycle state of a node.
///
/// Transitions: `Operational <-> Coordinator`,
/// `Operational | Coordinator -> Failed -> Operational` (repair).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeStatus {
    Operational,
    Coordinator,
    /// Failed at `since` (simulation seconds)
    Failed { since: f64 },
}

/// One swarm element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    pub status: NodeStatus,

    /// Owning cluster (the single virtual cluster for centralized/mesh)
    pub cluster: ClusterId,

    /// Seconds spent as coordinator, settled up to `settled_at`
    pub coordinator_time_s: f64,

    /// Energy drawn in Wh, settled up to `settled_at`
    pub power_consumed_wh: f64,

    pub messages_sent: u64,

    pub messages_received: u64,

    /// Time of the last state update seen by this node
    pub last_update: f64,

    /// Time up to which power and coordinator time are accounted
    pub settled_at: f64,
}

impl Node {
    /// Creates a node at time zero.
    pub fn new(id: NodeId, cluster: ClusterId, coordinator: bool) -> Self {
        Self {
            id,
            status: if coordinator {
                NodeStatus::Coordinator
            } else {
                NodeStatus::Operational
            },
            cluster,
            coordinator_time_s: 0.0,
            power_consumed_wh: 0.0,
            messages_sent: 0,
            messages_received: 0,
            last_update: 0.0,
            settled_at: 0.0,
        }
    }

    #[inline]
    pub fn is_coordinator(&self) -> bool {
        matches!(self.status, NodeStatus::Coordinator)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, NodeStatus::Failed { .. })
    }

    #[inline]
    pub fn is_operational(&self) -> bool {
        matches!(self.status, NodeStatus::Operational)
    }

    /// Failure time while failed.
    pub fn failure_time(&self) -> Option<f64> {
        match self.status {
            NodeStatus::Failed { since } => Some(since),
            _ => None,
        }
    }

    /// Current draw in watts.
    #[inline]
    pub fn draw_w(&self, power: &PowerProfile) -> f64 {
        if self.is_coordinator() {
            power.coordinator_w
        } else {
            power.base_w
        }
    }

    /// Accrues energy and coordinator time for the current role up to `now`.
    ///
    /// A `now` at or before `settled_at` is a no-op.
    pub fn settle(&mut self, now: f64, power: &PowerProfile) {
        let elapsed = now - self.settled_at;
        if elapsed <= 0.0 {
            return;
        }
        self.power_consumed_wh += self.draw_w(power) * elapsed / 3600.0;
        if self.is_coordinator() {
            self.coordinator_time_s += elapsed;
        }
        self.settled_at = now;
    }

    /// Settles up to `now`, then switches to `status`.
    pub fn transition(&mut self, now: f64, power: &PowerProfile, status: NodeStatus) {
        self.settle(now, power);
        self.status = status;
    }
}

/// A coordination cluster.
///
/// Centralized and mesh runs hold one cluster spanning every node; mesh keeps
/// it only so bandwidth accounting is symmetric across topologies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,

    /// Members in creation order
    pub members: Vec<NodeId>,

    /// Current coordinator (may be failed until a handoff replaces it)
    pub coordinator: NodeId,

    /// Regional coordinator (hierarchical only)
    pub regional_coordinator: Option<NodeId>,

    /// Messages delivered to members
    pub messages_processed: u64,

    pub last_handoff: f64,

    pub failed_handoffs: u32,
}

impl Cluster {
    pub fn new(id: ClusterId, members: Vec<NodeId>, coordinator: NodeId) -> Self {
        Self {
            id,
            members,
            coordinator,
            regional_coordinator: None,
            messages_processed: 0,
            last_handoff: 0.0,
            failed_handoffs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const POWER: PowerProfile = PowerProfile {
        coordinator_w: 18.0,
        base_w: 5.0,
    };

    #[test]
    fn test_new_node_roles() {
        let coord = Node::new(NodeId(0), ClusterId(0), true);
        let worker = Node::new(NodeId(1), ClusterId(0), false);

        assert!(coord.is_coordinator());
        assert!(!worker.is_coordinator());
        assert!(worker.is_operational());
        assert_eq!(worker.failure_time(), None);
    }

    #[test]
    fn test_settle_accrues_by_role() {
        let mut coord = Node::new(NodeId(0), ClusterId(0), true);
        let mut worker = Node::new(NodeId(1), ClusterId(0), false);

        coord.settle(7200.0, &POWER);
        worker.settle(7200.0, &POWER);

        assert_relative_eq!(coord.power_consumed_wh, 36.0);
        assert_relative_eq!(coord.coordinator_time_s, 7200.0);
        assert_relative_eq!(worker.power_consumed_wh, 10.0);
        assert_eq!(worker.coordinator_time_s, 0.0);

        // Going backwards is a no-op
        worker.settle(3600.0, &POWER);
        assert_relative_eq!(worker.power_consumed_wh, 10.0);
    }

    #[test]
    fn test_transition_settles_previous_role() {
        let mut node = Node::new(NodeId(0), ClusterId(0), false);

        node.transition(3600.0, &POWER, NodeStatus::Coordinator);
        node.settle(7200.0, &POWER);

        assert_relative_eq!(node.power_consumed_wh, 5.0 + 18.0);
        assert_relative_eq!(node.coordinator_time_s, 3600.0);
    }

    #[test]
    fn test_failed_node_draws_base_power() {
        let mut node = Node::new(NodeId(0), ClusterId(0), true);
        node.transition(0.0, &POWER, NodeStatus::Failed { since: 0.0 });
        node.settle(3600.0, &POWER);

        assert!(node.is_failed());
        assert_eq!(node.failure_time(), Some(0.0));
        assert_relative_eq!(node.power_consumed_wh, 5.0);
        assert_eq!(node.coordinator_time_s, 0.0);
    }
}
