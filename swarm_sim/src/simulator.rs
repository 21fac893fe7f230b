//! Discrete-event simulator for one run.
//!
//! A run builds the network for its topology, arms the recurring events, and
//! drains the event queue in time order until the horizon, the event cap, or
//! an empty queue. Recurring events (sync rounds, duty-cycle handoffs, gossip
//! rounds) each schedule their successor, so the heap only ever holds the
//! events that are actually pending.
//!
//! # Event flow
//!
//! ```text
//! SyncRound ──► StateSync ──► enqueue ──► MessageReceive ──► drain queue
//!     │ re-arm
//!     ▼
//! SyncRound   NodeFailure ──► NodeRecovery
//!                  │
//!                  └─(coordinator)─► CoordinatorHandoff (runs only if due)
//! ```

use crate::SimError;
use serde::{Deserialize, Serialize};
use swarm_core::config::SECONDS_PER_DAY;
use swarm_core::coordinator;
use swarm_core::message::{communication_overhead, UPDATE_INTERVAL_S};
use swarm_core::{
    CoordinationStrategy, EventKind, EventPayload, EventQueue, Message, MessageKind, MessageQueue,
    NetworkStructure, NodeStatus, PowerProfile, Route, SimEvent, SwarmConfig, Topology,
};
use swarm_env::{CancellationToken, ClusterId, NodeId, SeededRng, SimRng};
use tracing::{debug, warn};

/// Bandwidth window drained by one receive event (s)
const RECEIVE_WINDOW_S: f64 = 0.1;

/// Seconds between gossip rounds
const GOSSIP_INTERVAL_S: f64 = 60.0;

/// Delay before an emergency handoff after a coordinator fails (s)
const EMERGENCY_HANDOFF_DELAY_S: f64 = 1.0;

/// Node sampling target per round
const SAMPLE_TARGET: f64 = 1000.0;

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Index within its Monte Carlo batch
    pub run_id: usize,

    pub seed: u64,

    pub topology: Topology,

    /// Required bandwidth as a share of aggregate capacity (%)
    pub communication_overhead_percent: f64,

    /// Node count at which latency would exceed one second
    pub bottleneck_threshold_nodes: f64,

    /// Mean coordinator availability over clusters (%)
    pub coordinator_availability_percent: f64,

    /// Coefficient of variation of per-node energy (%)
    pub power_variance_percent: f64,

    pub avg_update_propagation_ms: f64,

    pub max_update_propagation_ms: f64,

    pub p95_update_propagation_ms: f64,

    /// Delivered messages behind the propagation figures; 0 means they are estimates
    pub propagation_samples: usize,

    pub failed_handoffs: u32,

    pub successful_handoffs: u32,

    /// Dropped share of offered messages (0-1)
    pub message_drop_rate: f64,

    pub total_messages_sent: u64,

    pub total_messages_delivered: u64,

    pub avg_messages_per_node_per_day: f64,

    pub total_energy_kwh: f64,

    pub events_processed: u64,

    /// True when the event cap stopped the run before its horizon
    pub truncated: bool,

    /// Analytic hops per update for this topology
    pub hop_count: u32,

    /// Analytic message count over the horizon at the reporting interval
    pub estimated_message_count: u64,
}

/// One deterministic run of the swarm.
pub struct Simulator {
    config: SwarmConfig,
    seed: u64,
    strategy: &'static dyn CoordinationStrategy,
    rng: SeededRng,
    events: EventQueue,
    network: NetworkStructure,
    queue: MessageQueue,
    power: PowerProfile,

    /// Current simulation time (s)
    now: f64,
    horizon: f64,
    duty_cycle: f64,
    /// Expected one-way delay of a state update (s)
    propagation_delay_s: f64,

    sent: u64,
    delivered: u64,
    next_message_id: u64,
    failed_nodes: usize,
    successful_handoffs: u32,

    events_processed: u64,
    event_cap: u64,
    truncated: bool,
    finished: bool,

    /// Scratch buffer for routing
    routes: Vec<Route>,
}

impl Simulator {
    /// Validates `config`, builds the network and arms the initial events.
    ///
    /// An unseeded config draws its seed from OS entropy; [`seed`](Self::seed)
    /// reports it so the run can be replayed.
    pub fn new(config: SwarmConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => SeededRng::new(seed),
            None => SeededRng::from_entropy(),
        };
        let seed = rng.seed();
        let strategy = config.topology.strategy();
        let network = strategy.build(config.node_count, config.cluster_size, &mut rng);

        let mut sim = Self {
            seed,
            strategy,
            rng,
            events: EventQueue::new(),
            queue: MessageQueue::for_nodes(config.node_count),
            power: config.power_profile(),
            now: 0.0,
            horizon: config.horizon_seconds(),
            duty_cycle: config.duty_cycle_seconds(),
            propagation_delay_s: strategy.propagation_delay_ms(config.node_count, config.cluster_size) / 1000.0,
            sent: 0,
            delivered: 0,
            next_message_id: 0,
            failed_nodes: 0,
            successful_handoffs: 0,
            events_processed: 0,
            event_cap: config.event_cap(),
            truncated: false,
            finished: false,
            routes: Vec::new(),
            network,
            config,
        };
        sim.arm_initial_events();
        Ok(sim)
    }

    fn arm_initial_events(&mut self) {
        let nominal = self.network.central_coordinator;

        self.events.push(
            SimEvent::new(0.0, EventKind::SyncRound, nominal).with_payload(EventPayload::Round(0)),
        );

        if self.strategy.rotates_coordinators() && self.duty_cycle < self.horizon {
            for cluster in &self.network.clusters {
                self.events.push(
                    SimEvent::new(self.duty_cycle, EventKind::CoordinatorHandoff, cluster.coordinator)
                        .with_cluster(cluster.id)
                        .with_payload(EventPayload::Round(1)),
                );
            }
        }

        // Initial coordinators are assumed to have backup and never fail
        let rate = self.config.failure_rate_per_second();
        for node in &self.network.nodes {
            if node.is_coordinator() {
                continue;
            }
            let at = self.rng.next_exponential(rate);
            if at < self.horizon {
                self.events.push(
                    SimEvent::new(at, EventKind::NodeFailure, node.id).with_cluster(node.cluster),
                );
            }
        }

        if self.strategy.gossips() {
            self.events.push(
                SimEvent::new(0.0, EventKind::GossipRound, nominal).with_payload(EventPayload::Round(0)),
            );
        }
    }

    /// Replaces the `node_count * days * 10` event cap.
    pub fn with_event_cap(mut self, cap: u64) -> Self {
        self.event_cap = cap;
        self
    }

    /// Seed this run was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Current simulation time (s).
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn network(&self) -> &NetworkStructure {
        &self.network
    }

    pub fn message_queue(&self) -> &MessageQueue {
        &self.queue
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Time of the next pending event.
    pub fn next_event_time(&self) -> Option<f64> {
        self.events.peek().map(|e| e.time)
    }

    /// Injects an event. Times in the past are moved to the current time.
    pub fn schedule(&mut self, mut event: SimEvent) {
        event.time = event.time.max(self.now);
        self.events.push(event);
    }

    /// Dispatches the next event and returns its kind.
    ///
    /// Returns `None` once the run is over: queue exhausted, next event past
    /// the horizon, or the event cap reached.
    pub fn step(&mut self) -> Option<EventKind> {
        if self.finished {
            return None;
        }
        if self.events_processed >= self.event_cap {
            // Events left only past the horizon would never have run
            self.truncated = self.events.peek().is_some_and(|e| e.time <= self.horizon);
            self.finished = true;
            return None;
        }
        let Some(event) = self.events.pop() else {
            self.finished = true;
            return None;
        };
        if event.time > self.horizon {
            self.finished = true;
            return None;
        }

        self.now = event.time.max(self.now);
        let kind = event.kind;
        self.dispatch(event);
        self.events_processed += 1;
        Some(kind)
    }

    /// Runs to completion.
    pub fn run(mut self) -> RunResult {
        debug!(
            "Run start: {} nodes, {} (seed={})",
            self.config.node_count, self.config.topology, self.seed
        );
        while self.step().is_some() {}
        self.finish()
    }

    /// Runs to completion, polling `cancel` before every event.
    pub fn run_with(mut self, cancel: &CancellationToken) -> Result<RunResult, SimError> {
        loop {
            if cancel.is_cancelled() {
                return Err(SimError::Cancelled);
            }
            if self.step().is_none() {
                break;
            }
        }
        Ok(self.finish())
    }

    fn dispatch(&mut self, event: SimEvent) {
        match event.kind {
            EventKind::SyncRound => self.handle_sync_round(&event),
            EventKind::StateSync => self.handle_state_sync(event.node),
            EventKind::MessageSend => {}
            EventKind::MessageReceive => self.handle_message_receive(event.node),
            EventKind::CoordinatorHandoff => self.handle_coordinator_handoff(&event),
            EventKind::NodeFailure => self.handle_node_failure(event.node),
            EventKind::NodeRecovery => self.handle_node_recovery(event.node),
            EventKind::GossipRound => self.handle_gossip_round(&event),
            EventKind::CollisionWarning => self.sent += 1,
        }
    }

    /// Samples about 1 000 live nodes to publish state now, then re-arms.
    fn handle_sync_round(&mut self, event: &SimEvent) {
        let n = self.network.nodes.len();
        let rate = (SAMPLE_TARGET / n as f64).min(1.0);
        for index in self.rng.bernoulli_indices(n, rate) {
            let node = &self.network.nodes[index];
            if !node.is_failed() {
                self.events.push(
                    SimEvent::new(self.now, EventKind::StateSync, node.id).with_cluster(node.cluster),
                );
            }
        }

        let round = match event.payload {
            Some(EventPayload::Round(k)) => k,
            _ => 0,
        };
        let next = event.time + self.strategy.sync_interval_s();
        if next < self.horizon {
            self.events.push(
                SimEvent::new(next, EventKind::SyncRound, event.node)
                    .with_payload(EventPayload::Round(round + 1)),
            );
        }
    }

    fn handle_state_sync(&mut self, source: NodeId) {
        match self.network.nodes.get(source.index()) {
            Some(node) if !node.is_failed() => {}
            _ => return,
        }

        let mut routes = std::mem::take(&mut self.routes);
        routes.clear();
        self.strategy.routes(&self.network, source, &mut routes);
        for route in &routes {
            self.send(route.sender, route.receiver, MessageKind::Ephemeris, Some(self.propagation_delay_s));
        }
        self.routes = routes;

        self.network.nodes[source.index()].last_update = self.now;
    }

    fn handle_message_receive(&mut self, receiver: NodeId) {
        match self.network.nodes.get(receiver.index()) {
            Some(node) if !node.is_failed() => {}
            _ => return,
        }

        let bandwidth_bps = self.config.bandwidth_per_node_kbps * 1000.0;
        for message in self.queue.process_messages(self.now, bandwidth_bps, RECEIVE_WINDOW_S) {
            self.delivered += 1;
            let node = &mut self.network.nodes[message.receiver.index()];
            node.messages_received += 1;
            node.last_update = self.now;
            let cluster = node.cluster;
            self.network.clusters[cluster.index()].messages_processed += 1;
        }
    }

    fn handle_coordinator_handoff(&mut self, event: &SimEvent) {
        let Some(cluster_id) = event.cluster else {
            return;
        };
        let Some(cluster) = self.network.clusters.get(cluster_id.index()) else {
            return;
        };

        // Emergency handoffs go through the same duty-cycle check
        if coordinator::needs_handoff(cluster, self.now, self.duty_cycle) {
            self.run_handoff(cluster_id);
        }

        // Only duty-cycle handoffs carry a round and re-arm
        if let Some(EventPayload::Round(k)) = event.payload {
            let next = event.time + self.duty_cycle;
            if next < self.horizon {
                let coordinator = self.network.clusters[cluster_id.index()].coordinator;
                self.events.push(
                    SimEvent::new(next, EventKind::CoordinatorHandoff, coordinator)
                        .with_cluster(cluster_id)
                        .with_payload(EventPayload::Round(k + 1)),
                );
            }
        }
    }

    fn run_handoff(&mut self, cluster_id: ClusterId) {
        let outcome = coordinator::perform_handoff(
            &mut self.network.clusters[cluster_id.index()],
            &mut self.network.nodes,
            self.now,
            &mut self.rng,
            &self.power,
        );
        debug!("Handoff in {} at t={:.1}s: {:?}", cluster_id, self.now, outcome);

        if outcome.is_success() {
            self.successful_handoffs += 1;
        }
    }

    fn handle_node_failure(&mut self, id: NodeId) {
        let Some(node) = self.network.nodes.get_mut(id.index()) else {
            return;
        };
        if node.is_failed() {
            return;
        }
        let was_coordinator = node.is_coordinator();
        let cluster = node.cluster;
        coordinator::fail_node(node, self.now, &self.power);
        self.failed_nodes += 1;

        if was_coordinator && self.network.clusters[cluster.index()].coordinator == id {
            self.events.push(
                SimEvent::new(self.now + EMERGENCY_HANDOFF_DELAY_S, EventKind::CoordinatorHandoff, id)
                    .with_cluster(cluster),
            );
        }

        let mttr = self.rng.next_range(1.0, 7.0) * SECONDS_PER_DAY;
        if self.now + mttr < self.horizon {
            self.events.push(
                SimEvent::new(self.now + mttr, EventKind::NodeRecovery, id).with_cluster(cluster),
            );
        }
    }

    fn handle_node_recovery(&mut self, id: NodeId) {
        let Some(node) = self.network.nodes.get_mut(id.index()) else {
            return;
        };
        if !node.is_failed() {
            return;
        }
        node.transition(self.now, &self.power, NodeStatus::Operational);
        self.failed_nodes -= 1;
    }

    /// Sampled live nodes gossip to their live neighbors, then the round re-arms.
    fn handle_gossip_round(&mut self, event: &SimEvent) {
        if !self.strategy.gossips() {
            return;
        }

        let n = self.network.nodes.len();
        let live = n - self.failed_nodes;
        if live > 0 {
            let rate = (SAMPLE_TARGET / live as f64).min(1.0);
            let mut routes = std::mem::take(&mut self.routes);
            for index in self.rng.bernoulli_indices(n, rate) {
                let source = NodeId::from_index(index);
                if self.network.nodes[index].is_failed() {
                    continue;
                }
                routes.clear();
                self.strategy.routes(&self.network, source, &mut routes);
                for route in &routes {
                    self.send(route.sender, route.receiver, MessageKind::Gossip, None);
                }
            }
            self.routes = routes;
        }

        let round = match event.payload {
            Some(EventPayload::Round(k)) => k,
            _ => 0,
        };
        let next = event.time + GOSSIP_INTERVAL_S;
        if next < self.horizon {
            self.events.push(
                SimEvent::new(next, EventKind::GossipRound, event.node)
                    .with_payload(EventPayload::Round(round + 1)),
            );
        }
    }

    /// Queues a message; on success counts it and, with a delay, schedules its receive.
    fn send(&mut self, sender: NodeId, receiver: NodeId, kind: MessageKind, delay_s: Option<f64>) -> bool {
        let id = self.next_message_id;
        self.next_message_id += 1;

        if !self.queue.enqueue(Message::new(id, sender, receiver, kind, self.now)) {
            return false;
        }
        self.sent += 1;
        self.network.nodes[sender.index()].messages_sent += 1;

        if let Some(delay) = delay_s {
            self.events.push(
                SimEvent::new(self.now + delay, EventKind::MessageReceive, receiver)
                    .with_payload(EventPayload::Message(id)),
            );
        }
        true
    }

    /// Settles power to the horizon and computes the run's metrics.
    fn finish(mut self) -> RunResult {
        if self.truncated {
            warn!(
                "Run truncated at event cap {} (t={:.1}s of {:.1}s, seed={})",
                self.event_cap, self.now, self.horizon, self.seed
            );
        }

        for node in &mut self.network.nodes {
            node.settle(self.horizon, &self.power);
        }

        let config = &self.config;
        let n = config.node_count;
        let cs = config.cluster_size;
        let strategy = self.strategy;

        let required_kbps = strategy.bandwidth_requirement_kbps(n, cs, UPDATE_INTERVAL_S);
        let availability = if strategy.tracks_availability() && !self.network.clusters.is_empty() {
            let total: f64 = self
                .network
                .clusters
                .iter()
                .map(|c| coordinator::availability(c, &self.network.nodes, self.horizon))
                .sum();
            total / self.network.clusters.len() as f64
        } else {
            100.0
        };

        let propagation = self.queue.propagation_stats();
        let (avg_ms, max_ms, p95_ms) = if propagation.count == 0 {
            let estimate = strategy.propagation_delay_ms(n, cs);
            (estimate, estimate * 2.0, estimate)
        } else {
            (propagation.mean_ms, propagation.max_ms, propagation.p95_ms)
        };

        let queue_stats = self.queue.stats();
        let result = RunResult {
            run_id: 0,
            seed: self.seed,
            topology: config.topology,
            communication_overhead_percent: communication_overhead(required_kbps, config.bandwidth_per_node_kbps, n),
            bottleneck_threshold_nodes: strategy.bottleneck_threshold(cs, config.bandwidth_per_node_kbps),
            coordinator_availability_percent: availability,
            power_variance_percent: coordinator::power_variance(&self.network.nodes),
            avg_update_propagation_ms: avg_ms,
            max_update_propagation_ms: max_ms,
            p95_update_propagation_ms: p95_ms,
            propagation_samples: propagation.count,
            failed_handoffs: self.network.clusters.iter().map(|c| c.failed_handoffs).sum(),
            successful_handoffs: self.successful_handoffs,
            message_drop_rate: queue_stats.drop_rate,
            total_messages_sent: self.sent,
            total_messages_delivered: self.delivered,
            avg_messages_per_node_per_day: self.sent as f64 / n as f64 / config.simulation_days,
            total_energy_kwh: coordinator::total_energy_kwh(&self.network.nodes),
            events_processed: self.events_processed,
            truncated: self.truncated,
            hop_count: strategy.hop_count(n, cs),
            estimated_message_count: strategy.message_count_estimate(n, cs, self.horizon, UPDATE_INTERVAL_S),
        };

        debug!(
            "Run end (seed={}): {} events, {} sent, {} delivered, drop rate {:.3}",
            result.seed,
            result.events_processed,
            result.total_messages_sent,
            result.total_messages_delivered,
            result.message_drop_rate
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small(topology: Topology) -> SwarmConfig {
        SwarmConfig::default()
            .with_topology(topology)
            .with_node_count(20)
            .with_cluster_size(10)
            .with_days(1.0)
            .with_failure_rate(0.0)
            .with_seed(7)
    }

    fn run_until(sim: &mut Simulator, t: f64) {
        while sim.next_event_time().is_some_and(|next| next <= t) {
            if sim.step().is_none() {
                break;
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = small(Topology::Mesh).with_node_count(0);
        assert!(matches!(Simulator::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_unseeded_run_reports_its_seed() {
        let mut config = small(Topology::Centralized);
        config.seed = None;
        let sim = Simulator::new(config.clone()).unwrap();
        let seed = sim.seed();

        let replay = Simulator::new(config.with_seed(seed)).unwrap().run();
        assert_eq!(replay.seed, seed);
        assert_eq!(sim.run(), replay);
    }

    #[test]
    fn test_events_pop_in_time_order() {
        for topology in Topology::all() {
            let config = small(topology).with_days(0.01).with_failure_rate(200.0);
            let mut sim = Simulator::new(config).unwrap().with_event_cap(u64::MAX);
            let mut last = f64::NEG_INFINITY;
            while let Some(next) = sim.next_event_time() {
                assert!(next >= last, "{}: event at {} after {}", topology, next, last);
                if sim.step().is_none() {
                    break;
                }
                last = next;
            }
            assert!(sim.now() <= sim.config().horizon_seconds());
        }
    }

    #[test]
    fn test_event_cap_truncates() {
        // 20 nodes * 1 day * 10 = 200 events, far fewer than a day of sync rounds
        let sim = Simulator::new(small(Topology::Hierarchical)).unwrap();
        let result = sim.run();

        assert_eq!(result.events_processed, 200);
        assert!(result.truncated);
    }

    #[test]
    fn test_events_past_horizon_do_not_truncate() {
        let config = small(Topology::Centralized).with_days(0.001);
        let late = SimEvent::new(config.horizon_seconds() + 100.0, EventKind::CollisionWarning, NodeId(1));
        let run_with_cap = |cap: u64| {
            let mut sim = Simulator::new(config.clone()).unwrap().with_event_cap(cap);
            sim.schedule(late.clone());
            sim.run()
        };

        let full = run_with_cap(u64::MAX);
        assert!(!full.truncated);
        assert!(full.events_processed > 1);

        // Cap reached with only the late event left
        let exact = run_with_cap(full.events_processed);
        assert_eq!(exact.events_processed, full.events_processed);
        assert!(!exact.truncated);

        let short = run_with_cap(full.events_processed - 1);
        assert!(short.truncated);
    }

    #[test]
    fn test_metric_ranges() {
        for topology in Topology::all() {
            let config = small(topology).with_failure_rate(50.0);
            let result = Simulator::new(config).unwrap().run();

            assert!((0.0..=100.0).contains(&result.coordinator_availability_percent));
            assert!((0.0..=1.0).contains(&result.message_drop_rate));
            assert!(result.power_variance_percent >= 0.0);
            assert!(result.total_messages_delivered <= result.total_messages_sent);
            assert_eq!(result.topology, topology);
        }
    }

    #[test]
    fn test_energy_settled_to_horizon() {
        // No failures, no handoffs within the horizon: 2 coordinators, 18 workers
        let config = small(Topology::Hierarchical).with_duty_cycle_hours(48.0);
        let result = Simulator::new(config).unwrap().run();

        let expected_wh = (2.0 * 18.0 + 18.0 * 5.0) * 24.0;
        assert_relative_eq!(result.total_energy_kwh, expected_wh / 1000.0, max_relative = 1e-9);
        assert_relative_eq!(result.coordinator_availability_percent, 100.0, max_relative = 1e-9);
    }

    #[test]
    fn test_mesh_reports_full_availability() {
        let result = Simulator::new(small(Topology::Mesh)).unwrap().run();
        assert_eq!(result.coordinator_availability_percent, 100.0);
        assert_eq!(result.hop_count, 5);
    }

    #[test]
    fn test_propagation_falls_back_to_estimate() {
        // 1 kbps drains 12.5 bytes per receive window: no ephemeris is ever delivered
        let config = small(Topology::Centralized);
        let estimate = Topology::Centralized.strategy().propagation_delay_ms(20, 10);
        let result = Simulator::new(config).unwrap().run();

        assert_eq!(result.total_messages_delivered, 0);
        assert_eq!(result.propagation_samples, 0);
        assert_relative_eq!(result.avg_update_propagation_ms, estimate);
        assert_relative_eq!(result.max_update_propagation_ms, 2.0 * estimate);
    }

    #[test]
    fn test_measured_propagation_with_ample_bandwidth() {
        let config = small(Topology::Hierarchical).with_bandwidth_kbps(10_000.0);
        let result = Simulator::new(config).unwrap().run();

        assert!(result.total_messages_delivered > 0);
        assert!(result.propagation_samples > 0);
        assert!(result.max_update_propagation_ms >= result.avg_update_propagation_ms);
    }

    #[test]
    fn test_injected_collision_warning_counts_as_sent() {
        let mut sim = Simulator::new(small(Topology::Mesh)).unwrap();
        sim.schedule(SimEvent::new(0.0, EventKind::CollisionWarning, NodeId(3)));

        // Round at t=0 first, then the injected warning
        assert_eq!(sim.step(), Some(EventKind::SyncRound));
        assert_eq!(sim.step(), Some(EventKind::GossipRound));
        let before = sim.sent;
        assert_eq!(sim.step(), Some(EventKind::CollisionWarning));
        assert_eq!(sim.sent, before + 1);
    }

    #[test]
    fn test_emergency_handoff_waits_for_duty_cycle() {
        // 24 h duty cycle: the emergency check at t=1.5s is not due
        let mut sim = Simulator::new(small(Topology::Hierarchical)).unwrap();
        let failed = NodeId(10);
        assert!(sim.network().node(failed).is_coordinator());

        sim.schedule(SimEvent::new(0.5, EventKind::NodeFailure, failed));
        run_until(&mut sim, 0.5);
        assert!(sim.network().node(failed).is_failed());

        run_until(&mut sim, 1.5);
        let cluster = &sim.network().clusters[1];
        assert_eq!(cluster.coordinator, failed);
        assert_eq!(cluster.failed_handoffs, 0);
        assert_eq!(sim.successful_handoffs, 0);
    }

    #[test]
    fn test_failed_coordinator_replaced_at_next_due_handoff() {
        // 18 s duty cycle
        let config = small(Topology::Hierarchical).with_duty_cycle_hours(0.005);
        let mut sim = Simulator::new(config).unwrap().with_event_cap(u64::MAX);
        let failed = NodeId(10);

        sim.schedule(SimEvent::new(0.5, EventKind::NodeFailure, failed));
        run_until(&mut sim, 17.0);
        assert_eq!(sim.network().clusters[1].coordinator, failed);

        run_until(&mut sim, 18.5);
        let cluster = &sim.network().clusters[1];
        assert!(cluster.coordinator != failed || cluster.failed_handoffs == 1);
        if cluster.coordinator != failed {
            assert!(sim.network().node(cluster.coordinator).is_coordinator());
            assert!(sim.network().node(failed).is_failed());
        }
    }

    #[test]
    fn test_handoffs_send_no_messages() {
        let config = small(Topology::Hierarchical)
            .with_duty_cycle_hours(0.005)
            .with_days(0.01);
        let mut sim = Simulator::new(config).unwrap().with_event_cap(u64::MAX);

        let mut attempts = 0;
        loop {
            let before = sim.sent;
            match sim.step() {
                Some(EventKind::CoordinatorHandoff) => {
                    attempts += 1;
                    assert_eq!(sim.sent, before);
                }
                Some(kind) => assert_ne!(kind, EventKind::MessageSend),
                None => break,
            }
        }
        assert!(attempts >= 2);
        assert!(sim.successful_handoffs >= 1);
    }

    #[test]
    fn test_recovery_restores_operational() {
        let mut sim = Simulator::new(small(Topology::Hierarchical)).unwrap();
        let node = NodeId(5);

        // Recovery of a live node is a no-op
        sim.schedule(SimEvent::new(0.2, EventKind::NodeRecovery, node));
        run_until(&mut sim, 0.2);
        assert!(sim.network().node(node).is_operational());

        sim.schedule(SimEvent::new(0.5, EventKind::NodeFailure, node));
        sim.schedule(SimEvent::new(2.0, EventKind::NodeRecovery, node));
        run_until(&mut sim, 0.5);
        assert_eq!(sim.network().node(node).failure_time(), Some(0.5));
        assert_eq!(sim.failed_nodes, 1);

        run_until(&mut sim, 1.9);
        assert_eq!(sim.step(), Some(EventKind::NodeRecovery));
        assert!(sim.network().node(node).is_operational());
        assert_eq!(sim.network().node(node).failure_time(), None);
        assert_eq!(sim.failed_nodes, 0);
    }

    #[test]
    fn test_duty_cycle_handoffs_rotate_coordinators() {
        // 18 s duty cycle: both clusters attempt a handoff well before the event cap
        let config = small(Topology::Hierarchical).with_duty_cycle_hours(0.005);
        let result = Simulator::new(config).unwrap().run();

        assert!(result.successful_handoffs + result.failed_handoffs >= 2);
    }

    #[test]
    fn test_past_events_are_clamped_to_now() {
        let mut sim = Simulator::new(small(Topology::Centralized)).unwrap();
        run_until(&mut sim, 0.0);
        sim.step();
        let now = sim.now();

        sim.schedule(SimEvent::new(-5.0, EventKind::CollisionWarning, NodeId(1)));
        assert_eq!(sim.next_event_time(), Some(now));
        while sim.step().is_some() {
            assert!(sim.now() >= now);
        }
    }
}
