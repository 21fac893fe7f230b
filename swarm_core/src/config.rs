//! Run configuration.

use crate::topology::{Centralized, CoordinationStrategy, Hierarchical, Mesh};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

/// Coordination topology under study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Every node reports to one central coordinator
    Centralized,

    /// Nodes -> cluster coordinators -> regional coordinators -> central
    Hierarchical,

    /// Peer-to-peer gossip with no formal coordinator
    Mesh,
}

impl Topology {
    /// Returns all topologies in comparison order.
    pub fn all() -> Vec<Topology> {
        vec![Topology::Centralized, Topology::Hierarchical, Topology::Mesh]
    }

    /// Returns the topology name.
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Centralized => "centralized",
            Topology::Hierarchical => "hierarchical",
            Topology::Mesh => "mesh",
        }
    }

    /// Returns a description of the topology.
    pub fn description(&self) -> &'static str {
        match self {
            Topology::Centralized => "All nodes communicate with a single central coordinator",
            Topology::Hierarchical => "Cluster coordinators report to regional coordinators and a central node",
            Topology::Mesh => "Peer-to-peer gossip between random neighbors",
        }
    }

    /// Returns the routing/cost strategy for this topology.
    pub fn strategy(&self) -> &'static dyn CoordinationStrategy {
        match self {
            Topology::Centralized => &Centralized,
            Topology::Hierarchical => &Hierarchical,
            Topology::Mesh => &Mesh,
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Topology {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "centralized" | "centralised" | "central" | "star" => Ok(Topology::Centralized),
            "hierarchical" | "hierarchy" | "hier" | "tree" => Ok(Topology::Hierarchical),
            "mesh" | "gossip" | "p2p" => Ok(Topology::Mesh),
            _ => Err(ConfigError::UnknownTopology(s.to_string())),
        }
    }
}

/// Power draw of a node by role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerProfile {
    /// Draw while acting as coordinator (W)
    pub coordinator_w: f64,

    /// Draw in every other state, failed included (W)
    pub base_w: f64,
}

/// Configuration for one simulated swarm.
///
/// Missing fields fall back to [`Default`] when deserialized, so a JSON
/// config only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Number of nodes in the swarm
    pub node_count: usize,

    /// Network topology for coordination
    pub topology: Topology,

    /// Nodes per cluster (hierarchical only)
    pub cluster_size: usize,

    /// Hours a coordinator serves before handing off
    pub coordinator_duty_cycle_hours: f64,

    /// Link bandwidth per node (kbps)
    pub bandwidth_per_node_kbps: f64,

    /// Expected failures per node per year
    pub node_failure_rate_per_year: f64,

    /// Power while coordinating (W)
    pub coordinator_power_w: f64,

    /// Power otherwise (W)
    pub base_power_w: f64,

    /// Simulated horizon in days
    pub simulation_days: f64,

    /// Base seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            node_count: 10_000,
            topology: Topology::Hierarchical,
            cluster_size: 100,
            coordinator_duty_cycle_hours: 24.0,
            bandwidth_per_node_kbps: 1.0,
            node_failure_rate_per_year: 0.02,
            coordinator_power_w: 18.0,
            base_power_w: 5.0,
            simulation_days: 90.0,
            seed: None,
        }
    }
}

impl SwarmConfig {
    /// Sets the node count.
    pub fn with_node_count(mut self, node_count: usize) -> Self {
        self.node_count = node_count;
        self
    }

    /// Sets the topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Sets the cluster size.
    pub fn with_cluster_size(mut self, cluster_size: usize) -> Self {
        self.cluster_size = cluster_size;
        self
    }

    /// Sets the simulated horizon in days.
    pub fn with_days(mut self, days: f64) -> Self {
        self.simulation_days = days;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the annual failure rate.
    pub fn with_failure_rate(mut self, per_year: f64) -> Self {
        self.node_failure_rate_per_year = per_year;
        self
    }

    /// Sets the per-node bandwidth.
    pub fn with_bandwidth_kbps(mut self, kbps: f64) -> Self {
        self.bandwidth_per_node_kbps = kbps;
        self
    }

    /// Sets the coordinator duty cycle.
    pub fn with_duty_cycle_hours(mut self, hours: f64) -> Self {
        self.coordinator_duty_cycle_hours = hours;
        self
    }

    /// Checks every field. Called before any allocation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count == 0 {
            return Err(ConfigError::ZeroNodes);
        }
        if self.node_count > u32::MAX as usize {
            return Err(ConfigError::TooManyNodes(self.node_count));
        }
        if self.cluster_size == 0 {
            return Err(ConfigError::ZeroClusterSize);
        }
        let duty = self.coordinator_duty_cycle_hours;
        if !(duty.is_finite() && duty > 0.0) {
            return Err(ConfigError::InvalidDutyCycle(duty));
        }
        let days = self.simulation_days;
        if !(days.is_finite() && days > 0.0) {
            return Err(ConfigError::InvalidDuration(days));
        }

        let quantities = [
            ("bandwidth_per_node_kbps", self.bandwidth_per_node_kbps),
            ("node_failure_rate_per_year", self.node_failure_rate_per_year),
            ("coordinator_power_w", self.coordinator_power_w),
            ("base_power_w", self.base_power_w),
        ];
        for (field, value) in quantities {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::quantity(field, value));
            }
        }
        Ok(())
    }

    /// Simulated horizon in seconds.
    pub fn horizon_seconds(&self) -> f64 {
        self.simulation_days * SECONDS_PER_DAY
    }

    /// Coordinator duty cycle in seconds.
    pub fn duty_cycle_seconds(&self) -> f64 {
        self.coordinator_duty_cycle_hours * 3600.0
    }

    /// Per-node failure rate per second.
    pub fn failure_rate_per_second(&self) -> f64 {
        self.node_failure_rate_per_year / SECONDS_PER_YEAR
    }

    /// Upper bound on dispatched events: `node_count * days * 10`.
    pub fn event_cap(&self) -> u64 {
        (self.node_count as f64 * self.simulation_days * 10.0).floor() as u64
    }

    pub fn power_profile(&self) -> PowerProfile {
        PowerProfile {
            coordinator_w: self.coordinator_power_w,
            base_w: self.base_power_w,
        }
    }

    /// Reduced copy for quick previews: at most 1 000 nodes and 30 days.
    pub fn quick_preview(&self) -> Self {
        Self {
            node_count: self.node_count.min(1000),
            simulation_days: self.simulation_days.min(30.0),
            ..self.clone()
        }
    }

    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }
}
