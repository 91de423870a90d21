//! Pipeline runs
//!
//! A [`PipelineRun`] is everything the coordinator knows about one
//! iteration: the global array and the partition plan derived from it.
//! Nothing here is global or rank-indexed; each iteration builds a fresh
//! run and discards it afterwards.
//!
//! Both pipelines are SPMD functions: every rank calls `run` with the same
//! group, the coordinator passes `Some(&run)` and gets `Some(report)` back,
//! every other rank passes `None` and gets `None`.

pub mod sortedness;
pub mod statistics;
pub mod verify;

use crate::error::try_buffer;
use crate::partition::{Partition, PartitionPlan, PartitionPolicy};
use crate::Result;
use serde::{Deserialize, Serialize};

pub use sortedness::SortednessReport;
pub use statistics::StatisticsReport;

/// Result of one iteration, whichever pipeline produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum Report {
    Sortedness(SortednessReport),
    Statistics(StatisticsReport),
}

impl Report {
    pub fn iteration(&self) -> u64 {
        match self {
            Report::Sortedness(r) => r.iteration,
            Report::Statistics(r) => r.iteration,
        }
    }
}

/// One iteration's input, owned by the coordinator
#[derive(Debug, Clone)]
pub struct PipelineRun<V> {
    iteration: u64,
    values: Vec<V>,
    plan: PartitionPlan,
}

impl<V: Clone> PipelineRun<V> {
    pub fn new(iteration: u64, values: Vec<V>, workers: usize, policy: PartitionPolicy) -> Result<Self> {
        let plan = PartitionPlan::new(values.len(), workers, policy)?;
        Ok(Self {
            iteration,
            values,
            plan,
        })
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn plan(&self) -> &PartitionPlan {
        &self.plan
    }

    /// Copy out every rank's slice, in rank order
    ///
    /// With `with_boundary`, a non-empty partition that does not start at
    /// index 0 also carries the element just before it.
    pub fn assignments(&self, with_boundary: bool) -> Result<Vec<Assignment<V>>> {
        let mut out = try_buffer("assignment list", self.plan.workers())?;
        for partition in self.plan.iter() {
            let slice = self
                .values
                .get(partition.range())
                .ok_or_else(|| anyhow::anyhow!("Partition {:?} is outside the array", partition.range()))?;

            let mut values = try_buffer("partition", slice.len())?;
            values.extend_from_slice(slice);

            let boundary = if with_boundary {
                partition
                    .boundary_index()
                    .and_then(|i| self.values.get(i))
                    .cloned()
            } else {
                None
            };

            out.push(Assignment {
                partition: *partition,
                boundary,
                values,
            });
        }
        Ok(out)
    }
}

/// What one rank receives in the scatter step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment<V> {
    pub partition: Partition,
    /// Element preceding the partition, for seam checks
    pub boundary: Option<V>,
    pub values: Vec<V>,
}
