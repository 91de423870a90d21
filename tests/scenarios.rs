//! End-to-end sessions over the in-process and TCP worker groups

use splitscan::config::{Config, InputConfig, PipelineKind};
use splitscan::controller::console::Console;
use splitscan::controller::{run_worker, Controller, DecisionPolicy};
use splitscan::distributed::{DistributedCoordinator, NodeService};
use splitscan::group::local::run_local;
use splitscan::input::LiteralInput;
use splitscan::partition::PartitionPolicy;
use splitscan::pipeline::{Report, SortednessReport, StatisticsReport};
use std::io::{self, Cursor};

fn literal(values: &[&str]) -> Box<LiteralInput> {
    Box::new(LiteralInput::new(values.iter().map(|v| v.to_string()).collect()))
}

fn config(kind: PipelineKind, policy: PartitionPolicy) -> Config {
    let mut config = Config::default();
    config.pipeline.kind = kind;
    config.pipeline.policy = policy;
    config.pipeline.verify = true;
    config.output.per_worker_output = true;
    config
}

fn run_once(config: Config, workers: usize, values: &[&str]) -> Report {
    let session = config.session();
    let input = literal(values);
    let mut reports = run_local(
        workers,
        |group| {
            Controller::with_input(
                config,
                Console::new(Cursor::new(""), io::sink()),
                input,
                DecisionPolicy::Iterations(1),
            )
            .run(group)
        },
        |group| run_worker(group, &session),
    )
    .unwrap();
    assert_eq!(reports.len(), 1);
    reports.remove(0)
}

fn sortedness(config: Config, workers: usize, values: &[&str]) -> SortednessReport {
    match run_once(config, workers, values) {
        Report::Sortedness(report) => report,
        other => panic!("expected sortedness report, got {:?}", other),
    }
}

fn statistics(config: Config, workers: usize, values: &[&str]) -> StatisticsReport {
    match run_once(config, workers, values) {
        Report::Statistics(report) => report,
        other => panic!("expected statistics report, got {:?}", other),
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_violation_inside_partition() {
    for policy in [PartitionPolicy::FrontLoaded, PartitionPolicy::BackLoaded] {
        let report = sortedness(config(PipelineKind::Sortedness, policy), 2, &["1", "3", "2", "4", "5"]);
        assert!(!report.verdict.sorted);
        assert_eq!(report.verdict.first_violation, Some(1));
    }
}

#[test]
fn test_sorted_with_uneven_partitions() {
    for policy in [PartitionPolicy::FrontLoaded, PartitionPolicy::BackLoaded] {
        let report = sortedness(config(PipelineKind::Sortedness, policy), 3, &["1", "2", "3", "4", "5"]);
        assert!(report.verdict.sorted);
        assert_eq!(report.verdict.first_violation, None);
        assert_eq!(report.per_rank.len(), 3);
    }
}

#[test]
fn test_violation_at_partition_seam() {
    // [1 2 | 0 3] with two ranks: the drop sits between partitions
    let report = sortedness(config(PipelineKind::Sortedness, PartitionPolicy::FrontLoaded), 2, &["1", "2", "0", "3"]);
    assert_eq!(report.verdict.first_violation, Some(1));
}

#[test]
fn test_lowest_violation_wins_across_ranks() {
    let report = sortedness(
        config(PipelineKind::Sortedness, PartitionPolicy::FrontLoaded),
        4,
        &["5", "4", "3", "2", "1", "0", "-1", "-2"],
    );
    assert_eq!(report.verdict.first_violation, Some(0));
}

#[test]
fn test_statistics_four_values() {
    let report = statistics(config(PipelineKind::Statistics, PartitionPolicy::FrontLoaded), 2, &["1", "2", "3", "4"]);

    assert_eq!(report.mean, Some(2.5));
    assert_eq!(report.min, Some(1.0));
    assert_eq!(report.max, Some(4.0));
    assert_close(report.variance.unwrap(), 1.25);
    assert_eq!(report.below_mean, 2);
    assert_eq!(report.above_mean, 2);

    let expected = [0.0, 100.0 / 3.0, 200.0 / 3.0, 100.0];
    assert_eq!(report.percentages.len(), expected.len());
    for (actual, expected) in report.percentages.iter().zip(expected) {
        assert_close(*actual, expected);
    }

    let max = report.max_percentage.unwrap();
    assert_eq!(max.index, 3);
    assert_close(max.value, 100.0);

    assert_eq!(report.prefix_sums, vec![1.0, 3.0, 6.0, 10.0]);
}

#[test]
fn test_statistics_degenerate_range() {
    let report = statistics(config(PipelineKind::Statistics, PartitionPolicy::FrontLoaded), 1, &["5", "5", "5"]);

    assert_eq!(report.mean, Some(5.0));
    assert_eq!(report.variance, Some(0.0));
    assert_eq!(report.percentages, vec![0.0, 0.0, 0.0]);
    assert!(report.percentages.iter().all(|p| !p.is_nan()));
    assert_eq!(report.max_percentage.unwrap().index, 0);
    assert_eq!(report.below_mean + report.above_mean, 0);
}

#[test]
fn test_empty_array() {
    let report = sortedness(config(PipelineKind::Sortedness, PartitionPolicy::FrontLoaded), 3, &[]);
    assert!(report.verdict.sorted);
    assert_eq!(report.elements, 0);

    let report = statistics(config(PipelineKind::Statistics, PartitionPolicy::BackLoaded), 3, &[]);
    assert_eq!(report.mean, None);
    assert_eq!(report.variance, None);
    assert_eq!(report.max_percentage, None);
    assert!(report.percentages.is_empty());
    assert!(report.prefix_sums.is_empty());
}

#[test]
fn test_more_workers_than_elements() {
    let report = statistics(config(PipelineKind::Statistics, PartitionPolicy::FrontLoaded), 6, &["2", "-1", "7"]);
    assert_eq!(report.prefix_sums, vec![2.0, 1.0, 8.0]);
    assert_eq!(report.max_percentage.unwrap().index, 2);
    assert_eq!(report.per_rank.len(), 6);
    assert_eq!(report.per_rank.iter().filter(|r| r.partition.is_empty()).count(), 3);
}

#[test]
fn test_results_independent_of_worker_count() {
    let values = ["4.5", "-2", "9", "0.25", "3", "3", "11", "-7", "6"];
    let baseline = statistics(config(PipelineKind::Statistics, PartitionPolicy::FrontLoaded), 1, &values);

    for workers in 2..=5 {
        for policy in [PartitionPolicy::FrontLoaded, PartitionPolicy::BackLoaded] {
            let report = statistics(config(PipelineKind::Statistics, policy), workers, &values);
            assert_close(report.mean.unwrap(), baseline.mean.unwrap());
            assert_close(report.variance.unwrap(), baseline.variance.unwrap());
            assert_eq!(report.min, baseline.min);
            assert_eq!(report.max, baseline.max);
            assert_eq!(report.max_percentage.unwrap().index, baseline.max_percentage.unwrap().index);
            for (a, b) in report.prefix_sums.iter().zip(&baseline.prefix_sums) {
                assert_close(*a, *b);
            }
        }
    }
}

#[test]
fn test_non_finite_input_fails_session() {
    let config = config(PipelineKind::Statistics, PartitionPolicy::FrontLoaded);
    let session = config.session();
    let input = literal(&["1", "NaN", "3"]);

    let err = run_local(
        3,
        |group| {
            Controller::with_input(
                config,
                Console::new(Cursor::new(""), io::sink()),
                input,
                DecisionPolicy::Iterations(1),
            )
            .run(group)
        },
        |group| run_worker(group, &session),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).to_lowercase().contains("finite"), "{:#}", err);
}

#[test]
fn test_interactive_session_output() {
    let mut config = Config::default();
    config.input = InputConfig::Prompt;
    let session = config.session();

    // One array, then decline
    let console = Console::new(Cursor::new("5\n1 3 2 4 5\n0\n"), io::sink());
    let reports = run_local(
        2,
        |group| Controller::new(config, console)?.run(group),
        |group| run_worker(group, &session),
    )
    .unwrap();
    assert_eq!(reports.len(), 1);
}

#[test]
fn test_tcp_session() {
    let service = NodeService::bind("127.0.0.1:0").unwrap();
    let addr = service.local_addr().unwrap().to_string();
    let node = std::thread::spawn(move || service.serve_once());

    let config = config(PipelineKind::Statistics, PartitionPolicy::BackLoaded);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let coordinator = DistributedCoordinator::new(config.session(), vec![addr]).unwrap();
    assert_eq!(coordinator.group_size(), 2);
    let mut group = coordinator.connect(&runtime).unwrap();

    let reports = Controller::with_input(
        config,
        Console::new(Cursor::new(""), io::sink()),
        literal(&["1", "2", "3", "4", "5"]),
        DecisionPolicy::Iterations(2),
    )
    .run(&mut group)
    .unwrap();

    node.join().unwrap().unwrap();

    assert_eq!(reports.len(), 2);
    match &reports[1] {
        Report::Statistics(report) => {
            assert_eq!(report.iteration, 2);
            assert_eq!(report.workers, 2);
            assert_eq!(report.mean, Some(3.0));
            assert_eq!(report.prefix_sums, vec![1.0, 3.0, 6.0, 10.0, 15.0]);
            // Back-loaded: rank 0 takes 2, rank 1 takes 3
            assert_eq!(report.per_rank[1].partition.length, 3);
        }
        other => panic!("unexpected report: {:?}", other),
    }
}
