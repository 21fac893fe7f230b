//! Monte Carlo orchestration.
//!
//! Repeats the simulator with seeds `base, base + 1, ...` on a worker pool and
//! folds the runs into per-metric statistics. Comparison and scaling sweeps
//! are batches of batches that share one base seed, so every topology or node
//! count sees the same failure draws for the same run index.

use crate::pool;
use crate::simulator::{RunResult, Simulator};
use crate::SimError;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use swarm_core::topology::TARGET_LATENCY_MS;
use swarm_core::{SwarmConfig, Topology};
use swarm_env::stats::{self, ConfidenceInterval, Summary};
use swarm_env::{CancellationToken, SeededRng};
use tracing::info;

/// Runs per topology when comparing
pub const DEFAULT_COMPARISON_RUNS: usize = 50;

/// Runs per node count when sweeping
pub const DEFAULT_SCALING_RUNS: usize = 30;

/// Runs in a quick preview
pub const QUICK_RUNS: usize = 20;

/// Node counts of the default scaling sweep
pub const DEFAULT_SCALING_NODE_COUNTS: [usize; 7] =
    [1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000];

/// Progress after each completed run, counted over the whole sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    /// Topology of the batch the run belonged to
    pub topology: Topology,
}

/// Statistics over the runs of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub runs: usize,
    pub communication_overhead_percent: Summary,
    pub bottleneck_threshold_nodes: Summary,
    pub coordinator_availability_percent: Summary,
    pub power_variance_percent: Summary,
    /// Per-run mean propagation; its `mean` is the batch latency
    pub avg_update_propagation_ms: Summary,
    /// Worst propagation seen in any run
    pub max_update_propagation_ms: f64,
    pub failed_handoffs: Summary,
    pub message_drop_rate: Summary,
    pub messages_per_node_per_day: Summary,
    pub total_energy_kwh: Summary,
    /// Runs stopped by the event cap
    pub truncated_runs: usize,
    pub overhead_ci95: ConfidenceInterval,
    pub hop_count: u32,
    pub estimated_message_count: u64,
}

impl AggregateResult {
    /// Mean latency across runs (ms).
    pub fn latency_ms(&self) -> f64 {
        self.avg_update_propagation_ms.mean
    }
}

/// Folds runs into an [`AggregateResult`].
pub fn aggregate(runs: &[RunResult]) -> Result<AggregateResult, SimError> {
    let Some(first) = runs.first() else {
        return Err(SimError::NoRuns);
    };
    let metric = |f: fn(&RunResult) -> f64| -> Vec<f64> { runs.iter().map(f).collect() };

    let overheads = metric(|r| r.communication_overhead_percent);
    let overhead_ci95 = stats::confidence_interval(&overheads, 0.95)?;

    Ok(AggregateResult {
        runs: runs.len(),
        communication_overhead_percent: Summary::of(&overheads),
        bottleneck_threshold_nodes: Summary::of(&metric(|r| r.bottleneck_threshold_nodes)),
        coordinator_availability_percent: Summary::of(&metric(|r| r.coordinator_availability_percent)),
        power_variance_percent: Summary::of(&metric(|r| r.power_variance_percent)),
        avg_update_propagation_ms: Summary::of(&metric(|r| r.avg_update_propagation_ms)),
        max_update_propagation_ms: stats::max(&metric(|r| r.max_update_propagation_ms)),
        failed_handoffs: Summary::of(&metric(|r| r.failed_handoffs as f64)),
        message_drop_rate: Summary::of(&metric(|r| r.message_drop_rate)),
        messages_per_node_per_day: Summary::of(&metric(|r| r.avg_messages_per_node_per_day)),
        total_energy_kwh: Summary::of(&metric(|r| r.total_energy_kwh)),
        truncated_runs: runs.iter().filter(|r| r.truncated).count(),
        overhead_ci95,
        hop_count: first.hop_count,
        estimated_message_count: first.estimated_message_count,
    })
}

/// One batch with its inputs and raw runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub config: SwarmConfig,
    pub result: AggregateResult,
    pub runs: usize,
    /// Seed of run 0; run `i` used `base_seed + i`
    pub base_seed: u64,
    pub execution_time_ms: u64,
    pub run_results: Vec<RunResult>,
}

/// Weighted score used to rank topologies. Higher is better.
pub fn topology_score(result: &AggregateResult) -> f64 {
    let latency = 1000.0 / (result.latency_ms() + 1.0);
    let bandwidth = 100.0 / (result.communication_overhead_percent.mean + 1.0);
    let availability = result.coordinator_availability_percent.mean / 100.0;
    let reliability = 1.0 - result.message_drop_rate.mean;
    latency * 0.30 + bandwidth * 0.25 + availability * 0.25 + reliability * 0.20
}

/// Per-criterion winners of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAnalysis {
    pub best_latency: Topology,
    pub best_bandwidth: Topology,
    pub best_power: Topology,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyComparison {
    pub configs: Vec<SwarmConfig>,
    pub results: Vec<AggregateResult>,
    pub scores: Vec<f64>,
    /// Index of the highest score (first on ties)
    pub optimal_index: usize,
    pub analysis: ComparisonAnalysis,
}

impl TopologyComparison {
    pub fn optimal(&self) -> Topology {
        self.configs[self.optimal_index].topology
    }
}

/// One point of a scaling sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingPoint {
    pub node_count: usize,
    pub cluster_size: usize,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingAnalysis {
    pub configs: Vec<SwarmConfig>,
    pub results: Vec<AggregateResult>,
    pub target_latency_ms: f64,
    /// Largest node count whose mean latency is within the target
    pub max_viable: Option<ScalingPoint>,
}

/// Configs for a node-count sweep with cluster size `clamp(floor(sqrt N), 50, 200)`.
pub fn scaling_configs(base: &SwarmConfig, node_counts: &[usize]) -> Vec<SwarmConfig> {
    node_counts
        .iter()
        .map(|&n| {
            let cluster_size = ((n as f64).sqrt().floor() as usize).clamp(50, 200);
            base.clone().with_node_count(n).with_cluster_size(cluster_size)
        })
        .collect()
}

fn recommendation(topology: Topology) -> &'static str {
    match topology {
        Topology::Hierarchical => {
            "Hierarchical topology recommended for large-scale swarms. It balances latency, \
             bandwidth efficiency and fault tolerance, and cluster-based coordination scales \
             well with coordinator duty cycling."
        }
        Topology::Mesh => {
            "Mesh topology recommended for this configuration. Gossip propagation has no \
             single point of failure at the cost of higher latency."
        }
        Topology::Centralized => {
            "Centralized topology is acceptable for smaller swarms but has a single point of \
             failure. Consider hierarchical beyond the bottleneck threshold."
        }
    }
}

/// Index of the smallest key, first on ties.
fn argmin(results: &[AggregateResult], key: impl Fn(&AggregateResult) -> f64) -> usize {
    let mut best = 0;
    for (i, r) in results.iter().enumerate().skip(1) {
        if key(r) < key(&results[best]) {
            best = i;
        }
    }
    best
}

/// Monte Carlo driver.
///
/// # Example
///
/// ```ignore
/// let output = MonteCarlo::new(100)
///     .with_workers(8)
///     .run(&SwarmConfig::default().with_seed(42))?;
/// println!("overhead: {:.2}%", output.result.communication_overhead_percent.mean);
/// ```
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    runs: usize,
    workers: usize,
    cancel: CancellationToken,
    progress: Option<Sender<Progress>>,
}

impl MonteCarlo {
    pub fn new(runs: usize) -> Self {
        Self {
            runs,
            workers: pool::default_workers(),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Sets the worker count (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Streams a [`Progress`] after every completed run.
    pub fn with_progress(mut self, progress: Sender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Runs one batch of `runs` simulations.
    pub fn run(&self, config: &SwarmConfig) -> Result<MonteCarloOutput, SimError> {
        config.validate()?;
        let base_seed = base_seed(config);
        self.batch(config, base_seed, self.runs, 0, self.runs)
    }

    /// Reduced preview: at most 1 000 nodes, 30 days and 20 runs.
    pub fn quick(&self, config: &SwarmConfig) -> Result<MonteCarloOutput, SimError> {
        let preview = config.quick_preview();
        preview.validate()?;
        self.batch(&preview, base_seed(&preview), QUICK_RUNS, 0, QUICK_RUNS)
    }

    /// Runs one batch per topology, in the order given, and ranks them.
    ///
    /// Pass [`Topology::all`] for the full comparison.
    pub fn compare_topologies(
        &self,
        base: &SwarmConfig,
        topologies: &[Topology],
    ) -> Result<TopologyComparison, SimError> {
        if topologies.is_empty() {
            return Err(SimError::NoTopologies);
        }
        base.validate()?;
        let seed = base_seed(base);
        let configs: Vec<SwarmConfig> = topologies
            .iter()
            .map(|&t| base.clone().with_topology(t).with_seed(seed))
            .collect();

        let total = configs.len() * self.runs;
        let mut results = Vec::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            let output = self.batch(config, seed, self.runs, i * self.runs, total)?;
            results.push(output.result);
        }

        let scores: Vec<f64> = results.iter().map(topology_score).collect();
        let mut optimal_index = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[optimal_index] {
                optimal_index = i;
            }
        }

        let analysis = ComparisonAnalysis {
            best_latency: configs[argmin(&results, AggregateResult::latency_ms)].topology,
            best_bandwidth: configs[argmin(&results, |r| r.communication_overhead_percent.mean)].topology,
            best_power: configs[argmin(&results, |r| r.power_variance_percent.mean)].topology,
            recommendation: recommendation(configs[optimal_index].topology).to_string(),
        };
        info!(
            "Comparison: {} optimal (score {:.3})",
            configs[optimal_index].topology, scores[optimal_index]
        );

        Ok(TopologyComparison {
            configs,
            results,
            scores,
            optimal_index,
            analysis,
        })
    }

    /// Sweeps `node_counts` and finds the largest count within `target_latency_ms`.
    pub fn scaling_analysis(
        &self,
        base: &SwarmConfig,
        node_counts: &[usize],
        target_latency_ms: f64,
    ) -> Result<ScalingAnalysis, SimError> {
        if node_counts.is_empty() {
            return Err(SimError::EmptySweep);
        }
        let seed = base_seed(base);
        let configs: Vec<SwarmConfig> = scaling_configs(base, node_counts)
            .into_iter()
            .map(|c| c.with_seed(seed))
            .collect();
        for config in &configs {
            config.validate()?;
        }

        let total = configs.len() * self.runs;
        let mut results = Vec::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            let output = self.batch(config, seed, self.runs, i * self.runs, total)?;
            results.push(output.result);
        }

        let max_viable = configs
            .iter()
            .zip(&results)
            .filter(|(_, r)| r.latency_ms() <= target_latency_ms)
            .max_by_key(|(c, _)| c.node_count)
            .map(|(c, r)| ScalingPoint {
                node_count: c.node_count,
                cluster_size: c.cluster_size,
                latency_ms: r.latency_ms(),
            });

        Ok(ScalingAnalysis {
            configs,
            results,
            target_latency_ms,
            max_viable,
        })
    }

    /// Default sweep against the one-second latency target.
    pub fn default_scaling_analysis(&self, base: &SwarmConfig) -> Result<ScalingAnalysis, SimError> {
        self.scaling_analysis(base, &DEFAULT_SCALING_NODE_COUNTS, TARGET_LATENCY_MS)
    }

    /// Runs `runs` seeds from `base_seed`; progress is offset by `done` out of `total`.
    fn batch(
        &self,
        config: &SwarmConfig,
        base_seed: u64,
        runs: usize,
        done: usize,
        total: usize,
    ) -> Result<MonteCarloOutput, SimError> {
        if runs == 0 {
            return Err(SimError::NoRuns);
        }
        let started = Instant::now();
        info!(
            "Starting {} runs: {} nodes, {}, {} days (base seed {})",
            runs, config.node_count, config.topology, config.simulation_days, base_seed
        );

        let jobs: Vec<(usize, u64)> = (0..runs)
            .map(|i| (i, base_seed.wrapping_add(i as u64)))
            .collect();
        let topology = config.topology;

        let run_results = pool::execute(
            jobs,
            self.workers,
            &self.cancel,
            |(run_id, seed), cancel| {
                let sim = Simulator::new(config.clone().with_seed(seed))?;
                let mut result = sim.run_with(cancel)?;
                result.run_id = run_id;
                Ok(result)
            },
            |completed| {
                if let Some(progress) = &self.progress {
                    let completed = done + completed;
                    // Nobody listening is not an error
                    let _ = progress.send(Progress {
                        completed,
                        total,
                        percent: completed as f64 / total as f64 * 100.0,
                        topology,
                    });
                }
            },
        )?;

        let result = aggregate(&run_results)?;
        if result.truncated_runs > 0 {
            info!("{} of {} runs hit the event cap", result.truncated_runs, runs);
        }

        Ok(MonteCarloOutput {
            config: config.clone(),
            result,
            runs,
            base_seed,
            execution_time_ms: started.elapsed().as_millis() as u64,
            run_results,
        })
    }
}

/// Configured seed, or one drawn from OS entropy.
fn base_seed(config: &SwarmConfig) -> u64 {
    config.seed.unwrap_or_else(|| SeededRng::from_entropy().seed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crossbeam::channel::unbounded;

    fn small(topology: Topology) -> SwarmConfig {
        SwarmConfig::default()
            .with_topology(topology)
            .with_node_count(30)
            .with_cluster_size(10)
            .with_days(0.5)
            .with_failure_rate(20.0)
            .with_seed(11)
    }

    #[test]
    fn test_aggregate_rejects_empty() {
        assert_eq!(aggregate(&[]), Err(SimError::NoRuns));
    }

    #[test]
    fn test_single_run_aggregate_equals_run() {
        let run = Simulator::new(small(Topology::Hierarchical)).unwrap().run();
        let agg = aggregate(std::slice::from_ref(&run)).unwrap();

        assert_eq!(agg.runs, 1);
        assert_eq!(agg.communication_overhead_percent.mean, run.communication_overhead_percent);
        assert_eq!(agg.communication_overhead_percent.std_dev, 0.0);
        assert_eq!(agg.coordinator_availability_percent.mean, run.coordinator_availability_percent);
        assert_eq!(agg.latency_ms(), run.avg_update_propagation_ms);
        assert_eq!(agg.max_update_propagation_ms, run.max_update_propagation_ms);
        assert_eq!(agg.message_drop_rate.mean, run.message_drop_rate);
        assert_eq!(agg.overhead_ci95.lower, agg.overhead_ci95.upper);
    }

    #[test]
    fn test_seeds_are_consecutive() {
        let output = MonteCarlo::new(4).with_workers(2).run(&small(Topology::Mesh)).unwrap();

        assert_eq!(output.base_seed, 11);
        let seeds: Vec<u64> = output.run_results.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![11, 12, 13, 14]);
        let ids: Vec<usize> = output.run_results.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_zero_runs_rejected() {
        let result = MonteCarlo::new(0).run(&small(Topology::Centralized));
        assert_eq!(result.map(|o| o.runs), Err(SimError::NoRuns));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = small(Topology::Centralized).with_cluster_size(0);
        assert!(matches!(MonteCarlo::new(2).run(&config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_progress_stream() {
        let (tx, rx) = unbounded();
        MonteCarlo::new(5)
            .with_workers(3)
            .with_progress(tx)
            .run(&small(Topology::Centralized))
            .unwrap();

        let updates: Vec<Progress> = rx.try_iter().collect();
        assert_eq!(updates.len(), 5);
        assert_eq!(updates.last().map(|p| p.completed), Some(5));
        assert_relative_eq!(updates[4].percent, 100.0);
        assert!(updates.iter().all(|p| p.total == 5 && p.topology == Topology::Centralized));
    }

    #[test]
    fn test_comparison() {
        let (tx, rx) = unbounded();
        let comparison = MonteCarlo::new(3)
            .with_workers(2)
            .with_progress(tx)
            .compare_topologies(&small(Topology::Centralized), &Topology::all())
            .unwrap();

        assert_eq!(comparison.results.len(), 3);
        assert_eq!(comparison.scores.len(), 3);
        let best = comparison.scores[comparison.optimal_index];
        assert!(comparison.scores.iter().all(|s| *s <= best));
        assert!(!comparison.analysis.recommendation.is_empty());
        assert_eq!(comparison.configs[1].topology, Topology::Hierarchical);
        assert!(comparison.configs.iter().all(|c| c.seed == Some(11)));

        let last = rx.try_iter().last().unwrap();
        assert_eq!((last.completed, last.total), (9, 9));
        assert_eq!(last.topology, Topology::Mesh);
    }

    #[test]
    fn test_comparison_of_a_subset() {
        let base = small(Topology::Centralized);
        let monte_carlo = MonteCarlo::new(2).with_workers(2);
        let comparison = monte_carlo.compare_topologies(&base, &[Topology::Mesh]).unwrap();

        assert_eq!(comparison.configs.len(), 1);
        assert_eq!(comparison.results.len(), 1);
        assert_eq!(comparison.optimal(), Topology::Mesh);
        assert_eq!(comparison.analysis.best_latency, Topology::Mesh);
        assert_eq!(comparison.analysis.best_power, Topology::Mesh);

        // Same batch as running mesh on its own
        let alone = monte_carlo.run(&base.clone().with_topology(Topology::Mesh)).unwrap();
        assert_eq!(comparison.results[0], alone.result);

        assert_eq!(
            monte_carlo.compare_topologies(&base, &[]).map(|c| c.optimal_index),
            Err(SimError::NoTopologies)
        );
    }

    #[test]
    fn test_score_prefers_low_latency() {
        let run = Simulator::new(small(Topology::Mesh)).unwrap().run();
        let fast = aggregate(std::slice::from_ref(&run)).unwrap();
        let mut slow = fast.clone();
        slow.avg_update_propagation_ms.mean += 500.0;
        assert!(topology_score(&fast) > topology_score(&slow));
    }

    #[test]
    fn test_scaling_configs_cluster_size() {
        let configs = scaling_configs(&SwarmConfig::default(), &DEFAULT_SCALING_NODE_COUNTS);
        let sizes: Vec<usize> = configs.iter().map(|c| c.cluster_size).collect();
        assert_eq!(sizes, vec![50, 70, 100, 200, 200, 200, 200]);
    }

    #[test]
    fn test_scaling_analysis() {
        let base = small(Topology::Hierarchical);
        let analysis = MonteCarlo::new(2)
            .with_workers(2)
            .scaling_analysis(&base, &[20, 60], 1000.0)
            .unwrap();

        assert_eq!(analysis.results.len(), 2);
        let best = analysis.max_viable.unwrap();
        assert_eq!(best.node_count, 60);
        assert!(best.latency_ms <= 1000.0);

        // Nothing fits a zero target
        let none = MonteCarlo::new(1).scaling_analysis(&base, &[20], 0.0).unwrap();
        assert!(none.max_viable.is_none());

        assert_eq!(
            MonteCarlo::new(1).scaling_analysis(&base, &[], 1000.0).map(|a| a.results.len()),
            Err(SimError::EmptySweep)
        );
    }

    #[test]
    fn test_quick_preview_limits() {
        let config = small(Topology::Mesh).with_node_count(5_000).with_days(0.01);
        let output = MonteCarlo::new(100).with_workers(4).quick(&config).unwrap();

        assert_eq!(output.runs, QUICK_RUNS);
        assert_eq!(output.config.node_count, 1000);
    }

    #[test]
    fn test_cancelled_sweep() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = MonteCarlo::new(3)
            .with_cancellation(cancel)
            .run(&small(Topology::Hierarchical));
        assert_eq!(result.map(|o| o.runs), Err(SimError::Cancelled));
    }
}
