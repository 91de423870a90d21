//! Array partitioning
//!
//! Splits `n` elements across `p` ranks into contiguous, non-overlapping
//! partitions ordered by rank. Rank `r`'s partition always immediately
//! precedes rank `r + 1`'s, so the union is exactly `[0, n)`.
//!
//! # Remainder policies
//!
//! When `n` is not a multiple of `p`, the `n % p` leftover elements have to
//! go somewhere:
//!
//! - **FrontLoaded** (default): ranks `0..remainder` get one extra element.
//! - **BackLoaded**: the last rank absorbs the whole remainder.
//!
//! One policy is active for a whole session. Offsets are always the running
//! sum of earlier lengths, never `rank * base`.
//!
//! # Example
//!
//! ```
//! use splitscan::partition::{PartitionPlan, PartitionPolicy};
//!
//! let plan = PartitionPlan::new(5, 2, PartitionPolicy::FrontLoaded).unwrap();
//! assert_eq!(plan.get(0).unwrap().range(), 0..3);
//! assert_eq!(plan.get(1).unwrap().range(), 3..5);
//!
//! let plan = PartitionPlan::new(5, 2, PartitionPolicy::BackLoaded).unwrap();
//! assert_eq!(plan.get(0).unwrap().range(), 0..2);
//! assert_eq!(plan.get(1).unwrap().range(), 2..5);
//! ```

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Remainder distribution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// First `n % p` ranks receive `base + 1` elements
    FrontLoaded,
    /// Last rank receives `base + n % p` elements
    BackLoaded,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self::FrontLoaded
    }
}

impl fmt::Display for PartitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrontLoaded => write!(f, "front-loaded"),
            Self::BackLoaded => write!(f, "back-loaded"),
        }
    }
}

/// One rank's contiguous slice of the global array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Owning rank
    pub rank: usize,
    /// Global index of the first element
    pub offset: usize,
    /// Number of elements (may be zero when `n < p`)
    pub length: usize,
}

impl Partition {
    /// Global index range covered by this partition
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Global index of the element preceding this partition, if the
    /// partition needs one to check its leading seam
    pub fn boundary_index(&self) -> Option<usize> {
        if self.length > 0 && self.offset > 0 {
            Some(self.offset - 1)
        } else {
            None
        }
    }
}

/// Immutable partition layout for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    total: usize,
    policy: PartitionPolicy,
    partitions: Vec<Partition>,
}

impl PartitionPlan {
    /// Compute the layout of `total` elements over `workers` ranks
    ///
    /// Fails only when `workers == 0`. `total < workers` is valid and yields
    /// zero-length partitions.
    pub fn new(total: usize, workers: usize, policy: PartitionPolicy) -> Result<Self, PipelineError> {
        if workers == 0 {
            return Err(PipelineError::PartitionUnderflow { elements: total });
        }

        let base = total / workers;
        let remainder = total % workers;

        let mut partitions = Vec::with_capacity(workers);
        let mut offset = 0;
        for rank in 0..workers {
            let length = match policy {
                PartitionPolicy::FrontLoaded => base + usize::from(rank < remainder),
                PartitionPolicy::BackLoaded if rank == workers - 1 => base + remainder,
                PartitionPolicy::BackLoaded => base,
            };
            partitions.push(Partition { rank, offset, length });
            offset += length;
        }

        debug_assert_eq!(offset, total);

        Ok(Self {
            total,
            policy,
            partitions,
        })
    }

    /// Total number of elements covered
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn policy(&self) -> PartitionPolicy {
        self.policy
    }

    /// Number of ranks
    pub fn workers(&self) -> usize {
        self.partitions.len()
    }

    pub fn get(&self, rank: usize) -> Option<&Partition> {
        self.partitions.get(rank)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }
}
