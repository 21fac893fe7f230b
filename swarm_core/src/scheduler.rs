//! Event scheduler.
//!
//! A binary min-heap keyed by event time. Events at the same instant leave in
//! the order they were pushed, so a run is reproducible down to the order of
//! simultaneous events.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use swarm_env::{ClusterId, NodeId};

/// Event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// One node publishes its state along its routes
    StateSync,
    /// Samples nodes for the next sync round and re-arms itself
    SyncRound,
    /// Explicit send; carries no state effect
    MessageSend,
    /// Receiver drains the shared queue
    MessageReceive,
    CoordinatorHandoff,
    NodeFailure,
    NodeRecovery,
    /// Mesh gossip round; re-arms itself
    GossipRound,
    CollisionWarning,
}

/// Extra data carried by some events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Sequence number of a periodic round
    Round(u64),
    /// Message that triggered a receive
    Message(u64),
}

/// A scheduled simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Seconds from simulation start
    pub time: f64,
    pub kind: EventKind,
    /// Node the event concerns (nominal node 0 for swarm-wide rounds)
    pub node: NodeId,
    pub cluster: Option<ClusterId>,
    pub payload: Option<EventPayload>,
}

impl SimEvent {
    pub fn new(time: f64, kind: EventKind, node: NodeId) -> Self {
        Self {
            time,
            kind,
            node,
            cluster: None,
            payload: None,
        }
    }

    pub fn with_cluster(mut self, cluster: ClusterId) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Heap entry ordered so the earliest time, then lowest sequence, pops first.
#[derive(Debug)]
struct Scheduled {
    seq: u64,
    event: SimEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .event
            .time
            .total_cmp(&self.event.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event. O(log n).
    pub fn push(&mut self, event: SimEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { seq, event });
    }

    /// Removes the earliest event. O(log n).
    pub fn pop(&mut self) -> Option<SimEvent> {
        self.heap.pop().map(|s| s.event)
    }

    pub fn peek(&self) -> Option<&SimEvent> {
        self.heap.peek().map(|s| &s.event)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
