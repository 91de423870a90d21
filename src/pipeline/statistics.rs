//! Distributed statistics
//!
//! Stage order, every rank in lockstep:
//!
//! 1. scatter slices
//! 2. reduce `LocalSummary` to the coordinator
//! 3. broadcast `GlobalMoments` (mean, min, max) to every rank
//! 4. reduce the variance terms
//! 5. percentage transform locally, reduce the arg-max
//! 6. exclusive scan of the partition totals, shift local prefix sums
//! 7. gather each rank's vectors; the coordinator counts below/above mean
//!
//! Stages 4 and 5 depend on the broadcast in stage 3.

use crate::analysis::statistics::{
    apply_prefix_offset, count_relative_to_mean, inclusive_prefix, local_arg_max, percentage_transform,
    variance_term,
};
use crate::analysis::{GlobalMoments, IndexedValue, LocalSummary};
use crate::error::{try_buffer, PipelineError};
use crate::group::{collective, Transport};
use crate::partition::{Partition, PartitionPolicy};
use crate::pipeline::{Assignment, PipelineRun};
use crate::reduce::{ArgMax, Sum};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything one rank computed, gathered for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankStatistics {
    pub partition: Partition,
    pub summary: LocalSummary,
    pub variance_term: f64,
    pub arg_max: Option<IndexedValue>,
    pub percentages: Vec<f64>,
    pub prefix_sums: Vec<f64>,
}

/// Coordinator-side result of one statistics run
///
/// Scalar results are `None` for an empty array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub iteration: u64,
    pub elements: usize,
    pub workers: usize,
    pub policy: PartitionPolicy,
    pub values: Vec<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub below_mean: usize,
    pub above_mean: usize,
    pub variance: Option<f64>,
    pub percentages: Vec<f64>,
    pub max_percentage: Option<IndexedValue>,
    pub prefix_sums: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub per_rank: Vec<RankStatistics>,
}

/// Reject values no policy can give a defined result for
pub fn validate_input(values: &[f64]) -> std::result::Result<(), PipelineError> {
    match values.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(PipelineError::DegenerateInput(format!(
            "element {} is {}, statistics need finite values",
            index, values[index]
        ))),
        None => Ok(()),
    }
}

/// Finite input can still overflow the sum or the squared deviations
fn check_representable(
    mean: Option<f64>,
    variance: Option<f64>,
    prefix_sums: &[f64],
) -> std::result::Result<(), PipelineError> {
    if mean.is_some_and(|m| !m.is_finite()) {
        return Err(PipelineError::DegenerateInput("sum of the values overflows f64".to_string()));
    }
    if variance.is_some_and(|v| !v.is_finite()) {
        return Err(PipelineError::DegenerateInput("variance overflows f64".to_string()));
    }
    if let Some(index) = prefix_sums.iter().position(|p| !p.is_finite()) {
        return Err(PipelineError::DegenerateInput(format!(
            "prefix sum at element {} overflows f64",
            index
        )));
    }
    Ok(())
}

/// Run the statistics pipeline on every rank
pub fn run<G: Transport + ?Sized>(group: &mut G, input: Option<&PipelineRun<f64>>) -> Result<Option<StatisticsReport>> {
    let assignments = match input {
        Some(run) => {
            validate_input(run.values())?;
            Some(run.assignments(false)?)
        }
        None => None,
    };
    let Assignment {
        partition,
        values,
        ..
    }: Assignment<f64> = collective::scatter(group, assignments)?;

    let summary = LocalSummary::of(&values);
    let reduced = collective::reduce(group, summary)?;
    let moments: GlobalMoments = collective::broadcast(group, reduced.map(GlobalMoments::from_summary))?;

    let term = moments.mean.map(|mean| variance_term(&values, mean)).unwrap_or(0.0);
    let variance_total = collective::reduce(group, Sum(term))?;

    let percentages = percentage_transform(&values, &moments)?;
    let arg_max = local_arg_max(&percentages, partition.offset);
    let best = collective::reduce(group, ArgMax(arg_max))?;

    let mut prefix_sums = inclusive_prefix(&values)?;
    let Sum(offset) = collective::exclusive_scan(group, Sum(summary.sum))?;
    apply_prefix_offset(&mut prefix_sums, offset);

    debug!(
        rank = group.rank(),
        offset = partition.offset,
        length = partition.length,
        prefix_offset = offset,
        "local statistics done"
    );

    let gathered = collective::gather(
        group,
        RankStatistics {
            partition,
            summary,
            variance_term: term,
            arg_max,
            percentages,
            prefix_sums,
        },
    )?;

    let (Some(run), Some(per_rank), Some(Sum(variance_total)), Some(ArgMax(best))) =
        (input, gathered, variance_total, best)
    else {
        return Ok(None);
    };

    let elements = run.values().len();
    let mut percentages = try_buffer("percentage vector", elements)?;
    let mut prefix_sums = try_buffer("prefix vector", elements)?;
    for rank in &per_rank {
        percentages.extend_from_slice(&rank.percentages);
        prefix_sums.extend_from_slice(&rank.prefix_sums);
    }
    if percentages.len() != elements || prefix_sums.len() != elements {
        return Err(PipelineError::Protocol {
            rank: group.rank(),
            detail: format!(
                "gathered {} percentages and {} prefix sums for {} elements",
                percentages.len(),
                prefix_sums.len(),
                elements
            ),
        }
        .into());
    }

    let variance = moments.variance(variance_total);
    check_representable(moments.mean, variance, &prefix_sums)?;

    let (below_mean, above_mean) = moments
        .mean
        .map(|mean| count_relative_to_mean(run.values(), mean))
        .unwrap_or((0, 0));

    let mut values = try_buffer("input copy", elements)?;
    values.extend_from_slice(run.values());

    Ok(Some(StatisticsReport {
        iteration: run.iteration(),
        elements,
        workers: run.plan().workers(),
        policy: run.plan().policy(),
        values,
        mean: moments.mean,
        min: moments.min,
        max: moments.max,
        below_mean,
        above_mean,
        variance,
        percentages,
        max_percentage: best,
        prefix_sums,
        per_rank,
    }))
}
