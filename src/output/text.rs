//! Human-readable text output

use crate::analysis::SortednessVerdict;
use crate::config::OutputConfig;
use crate::pipeline::sortedness::RankVerdict;
use crate::pipeline::statistics::RankStatistics;
use crate::pipeline::{Report, SortednessReport, StatisticsReport};
use std::fmt::Write;

/// Render one iteration's report
pub fn format_report(report: &Report, options: &OutputConfig) -> String {
    match report {
        Report::Sortedness(r) => format_sortedness(r, options.per_worker_output),
        Report::Statistics(r) => format_statistics(r, options.precision, options.per_worker_output),
    }
}

/// Sortedness verdict line, plus per-rank detail if requested
pub fn format_sortedness(report: &SortednessReport, per_worker: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", verdict_line(&report.verdict));

    if per_worker {
        let _ = writeln!(out);
        let _ = writeln!(out, "Per-rank detail ({} ranks, {}):", report.workers, report.policy);
        for rank in &report.per_rank {
            let _ = writeln!(out, "  {}", rank_verdict_line(rank));
        }
    }
    out
}

pub fn verdict_line(verdict: &SortednessVerdict) -> String {
    match verdict.first_violation {
        Some(index) if !verdict.sorted => {
            format!("Array is not sorted: position of first unsorted element is: {}", index)
        }
        _ => "Array is sorted.".to_string(),
    }
}

fn rank_verdict_line(rank: &RankVerdict) -> String {
    let span = format_span(rank.partition.offset, rank.partition.length);
    match rank.verdict.first_violation {
        _ if rank.partition.is_empty() => format!("rank {}: {} empty", rank.partition.rank, span),
        Some(index) => format!("rank {}: {} unsorted at {}", rank.partition.rank, span, index),
        None => format!("rank {}: {} sorted", rank.partition.rank, span),
    }
}

/// Full statistics block
pub fn format_statistics(report: &StatisticsReport, precision: usize, per_worker: bool) -> String {
    let p = precision;
    let mut out = String::new();

    let _ = writeln!(out, "Values:          {}", format_vector(&report.values, p));
    let _ = writeln!(out, "Mean:            {}", format_optional(report.mean, p));
    let _ = writeln!(out, "Min:             {}", format_optional(report.min, p));
    let _ = writeln!(out, "Max:             {}", format_optional(report.max, p));
    let _ = writeln!(out, "Below mean:      {}", report.below_mean);
    let _ = writeln!(out, "Above mean:      {}", report.above_mean);
    let _ = writeln!(out, "Variance:        {}", format_optional(report.variance, p));
    let _ = writeln!(out, "Percentages:     {}", format_vector(&report.percentages, p));
    match report.max_percentage {
        Some(best) => {
            let _ = writeln!(out, "Max percentage:  {:.*}", p, best.value);
            let _ = writeln!(out, "Max index:       {}", best.index);
        }
        None => {
            let _ = writeln!(out, "Max percentage:  n/a");
            let _ = writeln!(out, "Max index:       n/a");
        }
    }
    let _ = writeln!(out, "Prefix sums:     {}", format_vector(&report.prefix_sums, p));

    if per_worker {
        let _ = writeln!(out);
        let _ = writeln!(out, "Per-rank detail ({} ranks, {}):", report.workers, report.policy);
        for rank in &report.per_rank {
            let _ = writeln!(out, "  {}", rank_statistics_line(rank, p));
        }
    }
    out
}

fn rank_statistics_line(rank: &RankStatistics, p: usize) -> String {
    let span = format_span(rank.partition.offset, rank.partition.length);
    if rank.partition.is_empty() {
        return format!("rank {}: {} empty", rank.partition.rank, span);
    }
    format!(
        "rank {}: {} sum {:.*} min {:.*} max {:.*} variance term {:.*}",
        rank.partition.rank,
        span,
        p,
        rank.summary.sum,
        p,
        rank.summary.min,
        p,
        rank.summary.max,
        p,
        rank.variance_term
    )
}

fn format_span(offset: usize, length: usize) -> String {
    format!("[{}, {})", offset, offset + length)
}

/// `[a, b, c]` with a fixed number of decimals
pub fn format_vector(values: &[f64], precision: usize) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{:.*}", precision, v)).collect();
    format!("[{}]", items.join(", "))
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}
