use proptest::prelude::*;
use swarm_core::{SwarmConfig, Topology};
use swarm_env::CancellationToken;
use swarm_sim::{aggregate, MonteCarlo, SimError, Simulator};

fn config(topology: Topology, seed: u64) -> SwarmConfig {
    SwarmConfig::default()
        .with_topology(topology)
        .with_node_count(200)
        .with_cluster_size(20)
        .with_days(2.0)
        .with_failure_rate(10.0)
        .with_bandwidth_kbps(50.0)
        .with_seed(seed)
}

#[test]
fn test_same_seed_same_run() {
    for topology in Topology::all() {
        let a = Simulator::new(config(topology, 1234)).unwrap().run();
        let b = Simulator::new(config(topology, 1234)).unwrap().run();
        assert_eq!(a, b, "{} run not reproducible", topology);
    }
}

#[test]
fn test_different_seeds_differ() {
    let a = Simulator::new(config(Topology::Mesh, 1)).unwrap().run();
    let b = Simulator::new(config(Topology::Mesh, 2)).unwrap().run();
    assert_ne!(a, b);
}

#[test]
fn test_worker_count_does_not_change_results() {
    let config = config(Topology::Hierarchical, 99);
    let serial = MonteCarlo::new(6).with_workers(1).run(&config).unwrap();
    let parallel = MonteCarlo::new(6).with_workers(4).run(&config).unwrap();

    assert_eq!(serial.run_results, parallel.run_results);
    assert_eq!(serial.result, parallel.result);
}

#[test]
fn test_batch_run_matches_standalone_run() {
    let config = config(Topology::Centralized, 500);
    let output = MonteCarlo::new(3).with_workers(2).run(&config).unwrap();

    // Run 2 used seed base + 2
    let mut standalone = Simulator::new(config.with_seed(502)).unwrap().run();
    standalone.run_id = 2;
    assert_eq!(output.run_results[2], standalone);
}

#[test]
fn test_one_run_batch_matches_standalone_run() {
    for topology in Topology::all() {
        let config = config(topology, 31);
        let output = MonteCarlo::new(1).with_workers(3).run(&config).unwrap();
        let standalone = Simulator::new(config).unwrap().run();

        assert_eq!(output.runs, 1);
        assert_eq!(output.run_results, vec![standalone.clone()]);
        assert_eq!(output.result.latency_ms(), standalone.avg_update_propagation_ms);
        assert_eq!(output.result.failed_handoffs.mean, standalone.failed_handoffs as f64);
        assert_eq!(output.result.total_energy_kwh.std_dev, 0.0);
    }
}

#[test]
fn test_single_run_aggregate() {
    let run = Simulator::new(config(Topology::Mesh, 8)).unwrap().run();
    let agg = aggregate(std::slice::from_ref(&run)).unwrap();

    assert_eq!(agg.power_variance_percent.mean, run.power_variance_percent);
    assert_eq!(agg.power_variance_percent.std_dev, 0.0);
    assert_eq!(agg.total_energy_kwh.mean, run.total_energy_kwh);
    assert_eq!(agg.truncated_runs, usize::from(run.truncated));
}

#[test]
fn test_metric_bounds_hold_across_seeds() {
    for topology in Topology::all() {
        let output = MonteCarlo::new(5).with_workers(2).run(&config(topology, 77)).unwrap();
        for run in &output.run_results {
            assert!((0.0..=100.0).contains(&run.coordinator_availability_percent));
            assert!((0.0..=1.0).contains(&run.message_drop_rate));
            assert!(run.power_variance_percent >= 0.0);
            assert!(run.total_messages_delivered <= run.total_messages_sent);
            assert!(run.events_processed <= 200 * 2 * 10);
        }
    }
}

#[test]
fn test_cancellation_mid_run() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sim = Simulator::new(config(Topology::Hierarchical, 3)).unwrap();
    assert_eq!(sim.run_with(&cancel).map(|r| r.seed), Err(SimError::Cancelled));
}

fn any_topology() -> impl Strategy<Value = Topology> {
    prop_oneof![
        Just(Topology::Centralized),
        Just(Topology::Hierarchical),
        Just(Topology::Mesh),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_metric_ranges_hold_for_any_config(
        topology in any_topology(),
        node_count in 1usize..120,
        cluster_size in 1usize..40,
        days in 0.01f64..1.5,
        failure_rate in 0.0f64..400.0,
        bandwidth in 0.0f64..5_000.0,
        duty_hours in 0.001f64..48.0,
        seed in any::<u64>(),
    ) {
        let config = SwarmConfig::default()
            .with_topology(topology)
            .with_node_count(node_count)
            .with_cluster_size(cluster_size)
            .with_days(days)
            .with_failure_rate(failure_rate)
            .with_bandwidth_kbps(bandwidth)
            .with_duty_cycle_hours(duty_hours)
            .with_seed(seed);
        let cap = config.event_cap();
        let run = Simulator::new(config).unwrap().run();

        prop_assert!((0.0..=100.0).contains(&run.coordinator_availability_percent));
        prop_assert!((0.0..=1.0).contains(&run.message_drop_rate));
        prop_assert!(run.power_variance_percent >= 0.0);
        prop_assert!(run.total_energy_kwh >= 0.0);
        prop_assert!(run.total_messages_delivered <= run.total_messages_sent);
        prop_assert!(run.events_processed <= cap);
        prop_assert!(run.max_update_propagation_ms >= run.avg_update_propagation_ms);
        if run.truncated {
            prop_assert_eq!(run.events_processed, cap);
        }
    }
}
