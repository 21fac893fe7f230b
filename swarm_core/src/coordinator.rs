//! Coordinator duty cycle, power and handoff protocol.

use crate::config::PowerProfile;
use crate::node::{Cluster, Node, NodeStatus};
use serde::{Deserialize, Serialize};
use swarm_env::{NodeId, SimRng};

/// Size of the cluster state shipped to a new coordinator (bytes)
pub const HANDOFF_STATE_SIZE_BYTES: f64 = 8192.0;

/// Verification rounds after the state transfer (100 ms each)
pub const HANDOFF_VERIFICATION_ROUNDS: f64 = 3.0;

/// Coverage gap charged per failed handoff (s)
pub const HANDOFF_TIMEOUT_S: f64 = 30.0;

/// Probability that handoff verification fails
pub const HANDOFF_FAILURE_PROBABILITY: f64 = 0.01;

/// Energy in Wh drawn by a node in `status` over `duration_s`.
pub fn power_consumption(status: NodeStatus, duration_s: f64, power: &PowerProfile) -> f64 {
    let watts = match status {
        NodeStatus::Coordinator => power.coordinator_w,
        _ => power.base_w,
    };
    watts * duration_s / 3600.0
}

/// Percentage of `expected_s` during which the cluster had a coordinator.
///
/// Each failed handoff costs [`HANDOFF_TIMEOUT_S`]. Clamped to `[0, 100]`.
pub fn availability(cluster: &Cluster, nodes: &[Node], expected_s: f64) -> f64 {
    if expected_s <= 0.0 {
        return 100.0;
    }
    let coordinated: f64 = cluster
        .members
        .iter()
        .map(|id| nodes[id.index()].coordinator_time_s)
        .sum();
    let gap = cluster.failed_handoffs as f64 * HANDOFF_TIMEOUT_S;
    let effective = (coordinated - gap).min(expected_s);
    (effective / expected_s * 100.0).clamp(0.0, 100.0)
}

/// Result of one handoff attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HandoffOutcome {
    /// Role moved to `new`. `previous_alive` is false when the old
    /// coordinator had already failed.
    Success {
        previous: NodeId,
        new: NodeId,
        previous_alive: bool,
    },

    /// No operational non-coordinator member
    NoCandidates,

    /// A candidate was chosen but verification failed
    VerificationFailed { candidate: NodeId },
}

impl HandoffOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HandoffOutcome::Success { .. })
    }
}

/// Runs the handoff protocol for `cluster` at `now`.
///
/// The candidate is the operational member with the least coordinator time,
/// first in member order on ties. On failure the cluster keeps its
/// coordinator and counts a failed handoff. The old coordinator is demoted
/// only if it still holds the role, so a failed coordinator stays failed.
pub fn perform_handoff(
    cluster: &mut Cluster,
    nodes: &mut [Node],
    now: f64,
    rng: &mut dyn SimRng,
    power: &PowerProfile,
) -> HandoffOutcome {
    let current = cluster.coordinator;
    let candidate = cluster
        .members
        .iter()
        .copied()
        .filter(|&id| id != current && nodes[id.index()].is_operational())
        .min_by(|a, b| {
            nodes[a.index()]
                .coordinator_time_s
                .total_cmp(&nodes[b.index()].coordinator_time_s)
        });

    let Some(candidate) = candidate else {
        cluster.failed_handoffs += 1;
        cluster.last_handoff = now;
        return HandoffOutcome::NoCandidates;
    };

    if rng.next_f64() < HANDOFF_FAILURE_PROBABILITY {
        cluster.failed_handoffs += 1;
        cluster.last_handoff = now;
        return HandoffOutcome::VerificationFailed { candidate };
    }

    let previous = &mut nodes[current.index()];
    let previous_alive = !previous.is_failed();
    if previous.is_coordinator() {
        previous.transition(now, power, NodeStatus::Operational);
    }
    nodes[candidate.index()].transition(now, power, NodeStatus::Coordinator);

    cluster.coordinator = candidate;
    cluster.last_handoff = now;

    HandoffOutcome::Success {
        previous: current,
        new: candidate,
        previous_alive,
    }
}

/// True once a full duty cycle has passed since the last handoff.
pub fn needs_handoff(cluster: &Cluster, now: f64, duty_cycle_s: f64) -> bool {
    now - cluster.last_handoff >= duty_cycle_s
}

/// Coefficient of variation of consumed energy across nodes, in percent.
///
/// Population statistics; 0 for no nodes or zero mean.
pub fn power_variance(nodes: &[Node]) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let n = nodes.len() as f64;
    let mean = nodes.iter().map(|node| node.power_consumed_wh).sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = nodes
        .iter()
        .map(|node| (node.power_consumed_wh - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean * 100.0
}

/// Fails `node` at `now`. The node keeps its slot; its coordinator role ends.
pub fn fail_node(node: &mut Node, now: f64, power: &PowerProfile) {
    node.transition(now, power, NodeStatus::Failed { since: now });
}

/// Seconds to transfer cluster state and verify it at `bandwidth_kbps`.
///
/// Infinite at zero bandwidth.
pub fn handoff_time(bandwidth_kbps: f64) -> f64 {
    if bandwidth_kbps <= 0.0 {
        return f64::INFINITY;
    }
    HANDOFF_STATE_SIZE_BYTES * 8.0 / (bandwidth_kbps * 1000.0) + HANDOFF_VERIFICATION_ROUNDS * 0.1
}

/// Total energy across nodes in kWh.
pub fn total_energy_kwh(nodes: &[Node]) -> f64 {
    nodes.iter().map(|n| n.power_consumed_wh).sum::<f64>() / 1000.0
}

/// Members currently operational or coordinating.
pub fn operational_members<'a>(cluster: &'a Cluster, nodes: &'a [Node]) -> impl Iterator<Item = NodeId> + 'a {
    cluster.members.iter().copied().filter(move |id| {
        matches!(
            nodes[id.index()].status,
            NodeStatus::Operational | NodeStatus::Coordinator
        )
    })
}
