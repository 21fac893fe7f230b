//! Swarm Coordination Simulator CLI
//!
//! Run Monte Carlo batches, topology comparisons and scaling sweeps.

use clap::{Parser, ValueEnum};
use crossbeam::channel::{unbounded, Receiver};
use std::thread;
use std::time::Instant;
use swarm_core::{SwarmConfig, Topology};
use swarm_env::SeededRng;
use swarm_sim::monte_carlo::{
    DEFAULT_COMPARISON_RUNS, DEFAULT_SCALING_NODE_COUNTS, DEFAULT_SCALING_RUNS,
};
use swarm_sim::{
    AggregateResult, MonteCarlo, Progress, ReportBody, ReportExport, ScalingAnalysis, SimError,
    TopologyComparison,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// What to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One Monte Carlo batch
    Single,
    /// One batch per topology, ranked
    Compare,
    /// Node-count sweep against a latency target
    Scaling,
    /// 20 runs on at most 1 000 nodes and 30 days
    Quick,
}

/// Swarm coordination discrete-event simulator
#[derive(Parser, Debug)]
#[command(name = "swarm-sim")]
#[command(about = "Monte Carlo simulation of swarm coordination topologies", long_about = None)]
struct Args {
    /// JSON config file; flags below override its fields
    #[arg(short, long)]
    config: Option<String>,

    /// Number of swarm nodes
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Topology (centralized, hierarchical, mesh)
    #[arg(short, long)]
    topology: Option<Topology>,

    /// Nodes per cluster
    #[arg(long)]
    cluster_size: Option<usize>,

    /// Coordinator duty cycle in hours
    #[arg(long)]
    duty_cycle_hours: Option<f64>,

    /// Bandwidth per node in kbps
    #[arg(long)]
    bandwidth_kbps: Option<f64>,

    /// Node failures per node per year
    #[arg(long)]
    failure_rate: Option<f64>,

    /// Simulated days
    #[arg(short, long)]
    days: Option<f64>,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Runs per batch (default depends on mode)
    #[arg(short, long)]
    runs: Option<usize>,

    /// Worker threads (default: available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    #[arg(short, long, value_enum, default_value = "single")]
    mode: Mode,

    /// Comma-separated topologies for compare mode (default: all)
    #[arg(long, value_delimiter = ',')]
    topologies: Vec<Topology>,

    /// Comma-separated node counts for scaling mode
    #[arg(long, value_delimiter = ',')]
    node_counts: Vec<usize>,

    /// Latency target for scaling mode (ms)
    #[arg(long, default_value = "1000")]
    target_latency_ms: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON report on stdout
    #[arg(long)]
    json: bool,

    /// Write the JSON report to a file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn build_config(&self) -> Result<SwarmConfig, SimError> {
        let mut config = match &self.config {
            Some(path) => SwarmConfig::load(path)?,
            None => SwarmConfig::default(),
        };
        if let Some(n) = self.nodes {
            config.node_count = n;
        }
        if let Some(t) = self.topology {
            config.topology = t;
        }
        if let Some(cs) = self.cluster_size {
            config.cluster_size = cs;
        }
        if let Some(h) = self.duty_cycle_hours {
            config.coordinator_duty_cycle_hours = h;
        }
        if let Some(bw) = self.bandwidth_kbps {
            config.bandwidth_per_node_kbps = bw;
        }
        if let Some(rate) = self.failure_rate {
            config.node_failure_rate_per_year = rate;
        }
        if let Some(days) = self.days {
            config.simulation_days = days;
        }

        // Resolve the seed once so every batch of a sweep shares it
        let seed = match self.seed.or(config.seed) {
            Some(0) => std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
            Some(seed) => seed,
            None => SeededRng::from_entropy().seed(),
        };
        config.seed = Some(seed);
        config.validate()?;
        Ok(config)
    }

    fn runs(&self) -> usize {
        self.runs.unwrap_or(match self.mode {
            Mode::Single | Mode::Quick => 100,
            Mode::Compare => DEFAULT_COMPARISON_RUNS,
            Mode::Scaling => DEFAULT_SCALING_RUNS,
        })
    }
}

/// Logs sweep progress in 10% steps until every sender is gone.
fn log_progress(rx: Receiver<Progress>) {
    let mut next_step = 10.0;
    for progress in rx.iter() {
        if progress.percent >= next_step {
            info!(
                "  {:>5.1}% ({}/{} runs, {})",
                progress.percent, progress.completed, progress.total, progress.topology
            );
            while next_step <= progress.percent {
                next_step += 10.0;
            }
        }
    }
}

fn log_aggregate(label: &str, result: &AggregateResult) {
    info!("{} ({} runs)", label, result.runs);
    info!(
        "  Communication overhead:  {:.4}% ± {:.4} (95% CI {:.4}..{:.4})",
        result.communication_overhead_percent.mean,
        result.communication_overhead_percent.std_dev,
        result.overhead_ci95.lower,
        result.overhead_ci95.upper
    );
    info!("  Bottleneck threshold:    {:.0} nodes", result.bottleneck_threshold_nodes.mean);
    info!(
        "  Coordinator availability: {:.3}% ± {:.3}",
        result.coordinator_availability_percent.mean, result.coordinator_availability_percent.std_dev
    );
    info!("  Power variance:          {:.3}%", result.power_variance_percent.mean);
    info!(
        "  Update propagation:      {:.1} ms mean, {:.1} ms max",
        result.latency_ms(),
        result.max_update_propagation_ms
    );
    info!("  Failed handoffs:         {:.2}", result.failed_handoffs.mean);
    info!("  Message drop rate:       {:.4}", result.message_drop_rate.mean);
    info!("  Energy:                  {:.1} kWh", result.total_energy_kwh.mean);
    info!("  Hops per update:         {}", result.hop_count);
    if result.truncated_runs > 0 {
        warn!("  {} runs stopped at the event cap", result.truncated_runs);
    }
}

fn log_comparison(comparison: &TopologyComparison) {
    for ((config, result), score) in comparison
        .configs
        .iter()
        .zip(&comparison.results)
        .zip(&comparison.scores)
    {
        log_aggregate(&format!("{} (score {:.3})", config.topology, score), result);
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✓ Optimal: {}", comparison.optimal());
    info!("  Best latency:   {}", comparison.analysis.best_latency);
    info!("  Best bandwidth: {}", comparison.analysis.best_bandwidth);
    info!("  Best power:     {}", comparison.analysis.best_power);
    info!("  {}", comparison.analysis.recommendation);
}

fn log_scaling(analysis: &ScalingAnalysis) {
    for (config, result) in analysis.configs.iter().zip(&analysis.results) {
        let mark = if result.latency_ms() <= analysis.target_latency_ms { "✓" } else { "✗" };
        info!(
            "{} {:>9} nodes (cluster {:>3}): {:.1} ms, overhead {:.4}%",
            mark,
            config.node_count,
            config.cluster_size,
            result.latency_ms(),
            result.communication_overhead_percent.mean
        );
    }
    match analysis.max_viable {
        Some(point) => info!(
            "Max viable swarm: {} nodes at {:.1} ms (target {:.0} ms)",
            point.node_count, point.latency_ms, analysis.target_latency_ms
        ),
        None => warn!("No node count meets the {:.0} ms target", analysis.target_latency_ms),
    }
}

fn run(args: &Args) -> Result<ReportExport, SimError> {
    let config = args.build_config()?;
    let seed = config.seed.unwrap_or_default();
    let runs = args.runs();

    let mut monte_carlo = MonteCarlo::new(runs);
    if let Some(workers) = args.workers {
        monte_carlo = monte_carlo.with_workers(workers);
    }

    if !args.json {
        info!("Swarm Coordination Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "{:?} mode: {} nodes, {}, cluster {}, {} days, seed {}",
            args.mode,
            config.node_count,
            config.topology,
            config.cluster_size,
            config.simulation_days,
            seed
        );
    }

    let (tx, rx) = unbounded();
    let body = thread::scope(|s| {
        if !args.json {
            s.spawn(move || log_progress(rx));
        }
        let monte_carlo = monte_carlo.with_progress(tx);

        let body = match args.mode {
            Mode::Single => monte_carlo.run(&config).map(|o| ReportBody::Batch(Box::new(o))),
            Mode::Quick => monte_carlo.quick(&config).map(|o| ReportBody::Batch(Box::new(o))),
            Mode::Compare => {
                let topologies = if args.topologies.is_empty() {
                    Topology::all()
                } else {
                    args.topologies.clone()
                };
                monte_carlo
                    .compare_topologies(&config, &topologies)
                    .map(ReportBody::Comparison)
            }
            Mode::Scaling => {
                let counts = if args.node_counts.is_empty() {
                    DEFAULT_SCALING_NODE_COUNTS.to_vec()
                } else {
                    args.node_counts.clone()
                };
                monte_carlo
                    .scaling_analysis(&config, &counts, args.target_latency_ms)
                    .map(ReportBody::Scaling)
            }
        };
        // Closes the progress channel so the logger exits
        drop(monte_carlo);
        body
    })?;

    let report_runs = match &body {
        ReportBody::Batch(output) => output.runs,
        _ => runs,
    };
    Ok(ReportExport::new(seed, report_runs, body))
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let started = Instant::now();
    let mut report = match run(&args) {
        Ok(report) => report,
        Err(e) => {
            error!("✗ {}", e);
            std::process::exit(1);
        }
    };
    report.finalize(started.elapsed().as_millis() as u64);

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("✗ Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        match &report.body {
            ReportBody::Batch(output) => {
                log_aggregate(&output.config.topology.to_string(), &output.result)
            }
            ReportBody::Comparison(comparison) => log_comparison(comparison),
            ReportBody::Scaling(analysis) => log_scaling(analysis),
        }
        info!("Completed in {} ms", report.wall_time_ms);
    }

    if let Some(path) = &args.export {
        if let Err(e) = report.write_to_file(path) {
            error!("✗ Failed to write export: {:?}", e);
            std::process::exit(1);
        }
        info!("Exported report to {}", path);
    }
}
