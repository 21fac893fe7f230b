//! Messages and link physics.

use serde::{Deserialize, Serialize};
use swarm_env::NodeId;

/// Speed of light (km/s)
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.0;

/// Typical distance between neighboring nodes (km)
pub const INTER_NODE_DISTANCE_KM: f64 = 1_000.0;

/// Distance to a regional coordinator (km)
pub const REGIONAL_DISTANCE_KM: f64 = 50_000.0;

/// Average distance to a central coordinator, about 1 AU (km)
pub const CENTRAL_DISTANCE_KM: f64 = 150_000_000.0;

/// Per-hop processing delay (ms)
pub const PROCESSING_DELAY_MS: f64 = 1.0;

/// Update interval used for the reported bandwidth requirement (s)
pub const UPDATE_INTERVAL_S: f64 = 10.0;

/// One-way light time over `distance_km`, in milliseconds.
#[inline]
pub fn light_time_ms(distance_km: f64) -> f64 {
    distance_km / SPEED_OF_LIGHT_KM_S * 1000.0
}

/// Required bandwidth as a percentage of aggregate capacity.
///
/// Zero capacity reports 100% when anything is required, else 0.
pub fn communication_overhead(required_kbps: f64, bandwidth_per_node_kbps: f64, node_count: usize) -> f64 {
    let capacity = bandwidth_per_node_kbps * node_count as f64;
    if capacity <= 0.0 {
        return if required_kbps > 0.0 { 100.0 } else { 0.0 };
    }
    required_kbps / capacity * 100.0
}

/// Message type, which fixes its size on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Position, velocity, acceleration
    Ephemeris,
    Heartbeat,
    /// Full cluster state transfer
    Handoff,
    Gossip,
    Collision,
}

impl MessageKind {
    pub const fn size_bytes(self) -> u32 {
        match self {
            MessageKind::Ephemeris => 256,
            MessageKind::Heartbeat => 32,
            MessageKind::Handoff => 8192,
            MessageKind::Gossip => 128,
            MessageKind::Collision => 64,
        }
    }
}

/// A message in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Run-local sequence number
    pub id: u64,
    pub sender: NodeId,
    pub receiver: NodeId,
    pub kind: MessageKind,
    pub size_bytes: u32,
    /// Send time (s)
    pub send_time: f64,
    /// Receive time (s), set on delivery
    pub receive_time: Option<f64>,
    pub delivered: bool,
}

impl Message {
    pub fn new(id: u64, sender: NodeId, receiver: NodeId, kind: MessageKind, send_time: f64) -> Self {
        Self {
            id,
            sender,
            receiver,
            kind,
            size_bytes: kind.size_bytes(),
            send_time,
            receive_time: None,
            delivered: false,
        }
    }

    /// Marks the message delivered at `now`; returns the propagation time in ms.
    pub fn deliver(&mut self, now: f64) -> f64 {
        self.receive_time = Some(now);
        self.delivered = true;
        (now - self.send_time) * 1000.0
    }
}
