//! Distributed sortedness check
//!
//! 1. scatter: every rank gets its slice plus the element before it
//! 2. each rank scans locally
//! 3. gather: the coordinator folds the verdicts in rank order
//!
//! Since partitions are laid out in rank order, the first unsorted verdict
//! by rank is also the first violation by global index.

use crate::analysis::sortedness::scan;
use crate::analysis::SortednessVerdict;
use crate::group::{collective, Transport};
use crate::partition::{Partition, PartitionPolicy};
use crate::pipeline::{Assignment, PipelineRun};
use crate::reduce::fold_ranked;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One rank's local verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankVerdict {
    pub partition: Partition,
    pub verdict: SortednessVerdict,
}

/// Coordinator-side result of one sortedness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortednessReport {
    pub iteration: u64,
    pub elements: usize,
    pub workers: usize,
    pub policy: PartitionPolicy,
    pub verdict: SortednessVerdict,
    pub per_rank: Vec<RankVerdict>,
}

/// Run the sortedness pipeline on every rank
pub fn run<G: Transport + ?Sized>(group: &mut G, input: Option<&PipelineRun<i64>>) -> Result<Option<SortednessReport>> {
    let assignments = input.map(|run| run.assignments(true)).transpose()?;
    let assignment: Assignment<i64> = collective::scatter(group, assignments)?;

    let verdict = scan(
        &assignment.values,
        assignment.boundary.as_ref(),
        assignment.partition.offset,
    );
    debug!(
        rank = group.rank(),
        offset = assignment.partition.offset,
        length = assignment.partition.length,
        sorted = verdict.sorted,
        "local scan done"
    );

    let gathered = collective::gather(
        group,
        RankVerdict {
            partition: assignment.partition,
            verdict,
        },
    )?;

    let (Some(run), Some(per_rank)) = (input, gathered) else {
        return Ok(None);
    };

    let verdict = fold_ranked(per_rank.iter().map(|r| r.verdict));
    Ok(Some(SortednessReport {
        iteration: run.iteration(),
        elements: run.values().len(),
        workers: run.plan().workers(),
        policy: run.plan().policy(),
        verdict,
        per_rank,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::local::run_local;

    fn check(values: Vec<i64>, workers: usize, policy: PartitionPolicy) -> SortednessReport {
        let run = PipelineRun::new(1, values, workers, policy).unwrap();
        run_local(
            workers,
            |group| run_pipeline(group, &run),
            |group| {
                assert!(super::run(group, None)?.is_none());
                Ok(())
            },
        )
        .unwrap()
    }

    fn run_pipeline<G: Transport + ?Sized>(group: &mut G, run: &PipelineRun<i64>) -> Result<SortednessReport> {
        super::run(group, Some(run))?.ok_or_else(|| anyhow::anyhow!("coordinator produced no report"))
    }

    #[test]
    fn test_sorted_array() {
        let report = check(vec![1, 2, 2, 5, 9, 12], 3, PartitionPolicy::FrontLoaded);
        assert_eq!(report.verdict, SortednessVerdict::sorted());
        assert_eq!(report.per_rank.len(), 3);
    }

    #[test]
    fn test_violation_inside_partition() {
        let report = check(vec![3, 1, 2, 4, 5, 6], 2, PartitionPolicy::FrontLoaded);
        assert_eq!(report.verdict, SortednessVerdict::violation_at(0));
    }

    #[test]
    fn test_violation_on_seam() {
        // Ranks own [1, 2, 8] and [4, 9, 10]; the 8 > 4 drop sits on the seam
        let report = check(vec![1, 2, 8, 4, 9, 10], 2, PartitionPolicy::FrontLoaded);
        assert_eq!(report.verdict, SortednessVerdict::violation_at(2));
        assert!(report.per_rank[0].verdict.sorted);
        assert!(!report.per_rank[1].verdict.sorted);
    }

    #[test]
    fn test_first_violation_wins_across_ranks() {
        let report = check(vec![1, 0, 5, 6, 3, 7, 8, 2], 4, PartitionPolicy::BackLoaded);
        assert_eq!(report.verdict, SortednessVerdict::violation_at(0));
    }

    #[test]
    fn test_more_workers_than_elements() {
        let report = check(vec![4, 3], 5, PartitionPolicy::FrontLoaded);
        assert_eq!(report.verdict, SortednessVerdict::violation_at(0));

        let report = check(vec![4, 3], 5, PartitionPolicy::BackLoaded);
        assert_eq!(report.verdict, SortednessVerdict::violation_at(0));
    }

    /// Every array of length `0..=max_len` over the values `0..base`
    fn all_arrays(base: i64, max_len: usize) -> Vec<Vec<i64>> {
        let mut all = vec![Vec::new()];
        let mut frontier: Vec<Vec<i64>> = vec![Vec::new()];
        for _ in 0..max_len {
            frontier = frontier
                .iter()
                .flat_map(|prefix| {
                    (0..base).map(move |v| {
                        let mut next = prefix.clone();
                        next.push(v);
                        next
                    })
                })
                .collect();
            all.extend(frontier.iter().cloned());
        }
        all
    }

    #[test]
    fn test_matches_single_pass_scan_for_every_small_array() {
        let arrays = all_arrays(3, 6);
        assert_eq!(arrays.len(), 1093);

        for values in arrays {
            let first = values.windows(2).position(|w| w[0] > w[1]);
            let expected = scan(&values, None, 0);
            assert_eq!(expected.first_violation, first);
            assert_eq!(expected.sorted, first.is_none());

            for workers in 1..=7 {
                for policy in [PartitionPolicy::FrontLoaded, PartitionPolicy::BackLoaded] {
                    let report = check(values.clone(), workers, policy);
                    assert_eq!(
                        report.verdict, expected,
                        "{:?} on {} workers, {} partitions",
                        values, workers, policy
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_array_is_sorted() {
        let report = check(Vec::new(), 3, PartitionPolicy::FrontLoaded);
        assert!(report.verdict.sorted);
        assert_eq!(report.elements, 0);
    }
}
