//! Bandwidth-limited message queue.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub processed: u64,
    pub dropped: u64,
    /// `dropped / (processed + dropped)`, 0 when nothing was offered
    pub drop_rate: f64,
}

/// Propagation times of delivered messages (ms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationStats {
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub count: usize,
}

/// Bounded FIFO delivery channel shared by a whole run.
///
/// Messages leave in send-time order. A full queue rejects new messages and
/// counts them as dropped; the queue never holds more than `capacity`.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    queue: VecDeque<Message>,
    capacity: usize,
    processed: u64,
    dropped: u64,
    propagation_ms: Vec<f64>,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
            processed: 0,
            dropped: 0,
            propagation_ms: Vec::new(),
        }
    }

    /// Queue sized for a swarm: `10 * node_count`.
    pub fn for_nodes(node_count: usize) -> Self {
        Self::new(node_count.saturating_mul(10))
    }

    /// Queues a message. Returns `false` and counts a drop when full.
    pub fn enqueue(&mut self, message: Message) -> bool {
        if self.queue.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        match self.queue.back() {
            Some(last) if message.send_time < last.send_time => {
                // Stable insert after every message sent no later
                let at = self
                    .queue
                    .partition_point(|m| m.send_time <= message.send_time);
                self.queue.insert(at, message);
            }
            _ => self.queue.push_back(message),
        }
        true
    }

    /// Delivers messages at `now` while their cumulative size fits in
    /// `bandwidth_bps * window_s / 8` bytes.
    ///
    /// Stops at the first message that does not fit, so a message larger than
    /// the whole budget blocks the queue for this window.
    pub fn process_messages(&mut self, now: f64, bandwidth_bps: f64, window_s: f64) -> Vec<Message> {
        let budget = bandwidth_bps * window_s / 8.0;
        let mut used = 0.0;
        let mut delivered = Vec::new();

        while let Some(front) = self.queue.front() {
            let size = front.size_bytes as f64;
            if used + size > budget {
                break;
            }
            let Some(mut message) = self.queue.pop_front() else {
                break;
            };
            used += size;
            self.propagation_ms.push(message.deliver(now));
            self.processed += 1;
            delivered.push(message);
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops everything still queued without counting drops.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn stats(&self) -> QueueStats {
        let offered = self.processed + self.dropped;
        QueueStats {
            processed: self.processed,
            dropped: self.dropped,
            drop_rate: if offered > 0 {
                self.dropped as f64 / offered as f64
            } else {
                0.0
            },
        }
    }

    /// Percentiles use index `floor(n * q)` into the sorted samples.
    pub fn propagation_stats(&self) -> PropagationStats {
        if self.propagation_ms.is_empty() {
            return PropagationStats::default();
        }
        let mut sorted = self.propagation_ms.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let at = |q: f64| sorted[((n as f64 * q).floor() as usize).min(n - 1)];

        PropagationStats {
            mean_ms: sorted.iter().sum::<f64>() / n as f64,
            p50_ms: at(0.5),
            p95_ms: at(0.95),
            max_ms: sorted[n - 1],
            count: n,
        }
    }
}
