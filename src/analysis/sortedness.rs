//! Sortedness scan
//!
//! A rank sees its own slice plus, when its partition does not start at
//! index 0, the value immediately before it in the global array. Any
//! ordering check that spans a partition edge is decided by the rank that
//! owns the right-hand side of the seam, since it holds both values.
//!
//! A violation is reported as the global index `i` of the left element of
//! the first descending pair `a[i] > a[i + 1]`. For a seam violation that
//! left element is the boundary value, so the reported index is
//! `offset - 1`.

use serde::{Deserialize, Serialize};

/// Local (or combined) sortedness result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortednessVerdict {
    pub sorted: bool,
    /// Global index of the first violation; `None` when sorted
    pub first_violation: Option<usize>,
}

impl SortednessVerdict {
    pub fn sorted() -> Self {
        Self {
            sorted: true,
            first_violation: None,
        }
    }

    pub fn violation_at(index: usize) -> Self {
        Self {
            sorted: false,
            first_violation: Some(index),
        }
    }
}

impl Default for SortednessVerdict {
    fn default() -> Self {
        Self::sorted()
    }
}

/// Scan one partition left to right, stopping at the first violation
///
/// # Arguments
///
/// * `local` - This rank's slice
/// * `boundary` - Value preceding `local[0]` in the global array, if any
/// * `offset` - Global index of `local[0]`
///
/// With `boundary = None` and `offset = 0` this is the plain sequential
/// check over a whole array.
pub fn scan<T: PartialOrd>(local: &[T], boundary: Option<&T>, offset: usize) -> SortednessVerdict {
    let Some(first) = local.first() else {
        return SortednessVerdict::sorted();
    };

    if let Some(prev) = boundary {
        if first < prev {
            return SortednessVerdict::violation_at(offset.saturating_sub(1));
        }
    }

    // Last element has no right neighbour inside the partition
    for (i, pair) in local.windows(2).enumerate() {
        if pair[0] > pair[1] {
            return SortednessVerdict::violation_at(offset + i);
        }
    }

    SortednessVerdict::sorted()
}
