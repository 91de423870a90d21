//! Sequential reference check
//!
//! Recomputes a report on the coordinator with a single pass over the whole
//! array and lists every field where the distributed result disagrees.
//! Float fields are compared with a relative tolerance, since summation
//! order differs between the two.

use crate::analysis::sortedness::scan;
use crate::analysis::statistics::{
    count_relative_to_mean, inclusive_prefix, local_arg_max, percentage_transform, variance_term,
};
use crate::analysis::{GlobalMoments, LocalSummary};
use crate::pipeline::{SortednessReport, StatisticsReport};
use crate::Result;

/// Relative tolerance for float comparisons
pub const TOLERANCE: f64 = 1e-9;

/// One disagreement between the distributed and the sequential result
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub field: String,
    pub distributed: String,
    pub sequential: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: distributed {} vs sequential {}",
            self.field, self.distributed, self.sequential
        )
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE * 1f64.max(a.abs()).max(b.abs())
}

fn close_opt(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => close(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Default)]
struct Checker {
    mismatches: Vec<Mismatch>,
}

impl Checker {
    fn check<T: std::fmt::Debug>(&mut self, field: &str, ok: bool, distributed: T, sequential: T) {
        if !ok {
            self.mismatches.push(Mismatch {
                field: field.to_string(),
                distributed: format!("{:?}", distributed),
                sequential: format!("{:?}", sequential),
            });
        }
    }

    fn check_vector(&mut self, field: &str, distributed: &[f64], sequential: &[f64]) {
        if distributed.len() != sequential.len() {
            self.check(field, false, distributed.len(), sequential.len());
            return;
        }
        if let Some(i) = (0..distributed.len()).find(|&i| !close(distributed[i], sequential[i])) {
            self.check(&format!("{}[{}]", field, i), false, distributed[i], sequential[i]);
        }
    }
}

/// Compare a sortedness report against a sequential scan
pub fn check_sortedness(values: &[i64], report: &SortednessReport) -> Vec<Mismatch> {
    let expected = scan(values, None, 0);
    let mut checker = Checker::default();
    checker.check("verdict", expected == report.verdict, report.verdict, expected);
    checker.mismatches
}

/// Compare a statistics report against a sequential computation
pub fn check_statistics(values: &[f64], report: &StatisticsReport) -> Result<Vec<Mismatch>> {
    let moments = GlobalMoments::from_summary(LocalSummary::of(values));
    let variance = moments
        .mean
        .and_then(|mean| moments.variance(variance_term(values, mean)));
    let percentages = percentage_transform(values, &moments)?;
    let arg_max = local_arg_max(&percentages, 0);
    let prefix_sums = inclusive_prefix(values)?;
    let counts = moments
        .mean
        .map(|mean| count_relative_to_mean(values, mean))
        .unwrap_or((0, 0));

    let mut checker = Checker::default();
    checker.check("mean", close_opt(report.mean, moments.mean), report.mean, moments.mean);
    checker.check("min", report.min == moments.min, report.min, moments.min);
    checker.check("max", report.max == moments.max, report.max, moments.max);
    checker.check("variance", close_opt(report.variance, variance), report.variance, variance);
    checker.check(
        "below/above mean",
        (report.below_mean, report.above_mean) == counts,
        (report.below_mean, report.above_mean),
        counts,
    );
    checker.check_vector("percentages", &report.percentages, &percentages);
    checker.check(
        "max percentage index",
        report.max_percentage.map(|m| m.index) == arg_max.map(|m| m.index),
        report.max_percentage.map(|m| m.index),
        arg_max.map(|m| m.index),
    );
    checker.check_vector("prefix sums", &report.prefix_sums, &prefix_sums);

    Ok(checker.mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{IndexedValue, SortednessVerdict};
    use crate::partition::PartitionPolicy;

    fn stats_report(values: &[f64]) -> StatisticsReport {
        StatisticsReport {
            iteration: 1,
            elements: values.len(),
            workers: 1,
            policy: PartitionPolicy::FrontLoaded,
            values: values.to_vec(),
            mean: Some(2.0),
            min: Some(1.0),
            max: Some(3.0),
            below_mean: 1,
            above_mean: 1,
            variance: Some(2.0 / 3.0),
            percentages: vec![0.0, 50.0, 100.0],
            max_percentage: Some(IndexedValue { value: 100.0, index: 2 }),
            prefix_sums: vec![1.0, 3.0, 6.0],
            per_rank: Vec::new(),
        }
    }

    #[test]
    fn test_matching_statistics() {
        let values = [1.0, 2.0, 3.0];
        assert!(check_statistics(&values, &stats_report(&values)).unwrap().is_empty());
    }

    #[test]
    fn test_tolerates_rounding() {
        let values = [1.0, 2.0, 3.0];
        let mut report = stats_report(&values);
        report.mean = Some(2.0 + 1e-12);
        assert!(check_statistics(&values, &report).unwrap().is_empty());
    }

    #[test]
    fn test_reports_prefix_mismatch() {
        let values = [1.0, 2.0, 3.0];
        let mut report = stats_report(&values);
        report.prefix_sums[2] = 7.0;
        let mismatches = check_statistics(&values, &report).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "prefix sums[2]");
    }

    #[test]
    fn test_sortedness_mismatch() {
        let report = SortednessReport {
            iteration: 1,
            elements: 3,
            workers: 2,
            policy: PartitionPolicy::FrontLoaded,
            verdict: SortednessVerdict::sorted(),
            per_rank: Vec::new(),
        };
        assert!(check_sortedness(&[1, 2, 3], &report).is_empty());

        let mismatches = check_sortedness(&[2, 1, 3], &report);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "verdict");
    }
}
