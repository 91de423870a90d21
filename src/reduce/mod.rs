//! Reduction rules
//!
//! Each reducible quantity implements [`Combine`]: an identity element and an
//! associative binary operation. Per-rank values are always folded in
//! ascending rank order, which makes every reduction deterministic for a
//! fixed partitioning. Float sums are not bit-identical across different
//! worker counts, only numerically equivalent.
//!
//! | Quantity          | Type                 | Rule                               |
//! |-------------------|----------------------|------------------------------------|
//! | sorted flag + pos | `SortednessVerdict`  | AND, first unsorted by rank        |
//! | sum/min/max/count | `LocalSummary`       | sum, min, max, sum                 |
//! | variance / totals | `Sum`                | sum                                |
//! | percentage max    | `ArgMax`             | max value, lowest index on tie     |
//!
//! # Example
//!
//! ```
//! use splitscan::analysis::SortednessVerdict;
//! use splitscan::reduce::fold_ranked;
//!
//! let verdicts = vec![
//!     SortednessVerdict::sorted(),
//!     SortednessVerdict::violation_at(7),
//!     SortednessVerdict::violation_at(12),
//! ];
//! assert_eq!(fold_ranked(verdicts), SortednessVerdict::violation_at(7));
//! ```

use crate::analysis::{IndexedValue, LocalSummary, SortednessVerdict};
use serde::{Deserialize, Serialize};

/// Associative combination with an identity element
pub trait Combine: Sized {
    /// Neutral element contributed by an empty partition
    fn identity() -> Self;

    /// Combine a lower-ranked value (`self`) with a higher-ranked one
    fn combine(self, higher: Self) -> Self;
}

impl Combine for SortednessVerdict {
    fn identity() -> Self {
        SortednessVerdict::sorted()
    }

    fn combine(self, higher: Self) -> Self {
        // Lowest-ranked unsorted report wins
        if self.sorted {
            higher
        } else {
            self
        }
    }
}

impl Combine for LocalSummary {
    fn identity() -> Self {
        LocalSummary::empty()
    }

    fn combine(self, higher: Self) -> Self {
        self.merge(higher)
    }
}

/// Plain floating-point sum
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sum(pub f64);

impl Combine for Sum {
    fn identity() -> Self {
        Sum(0.0)
    }

    fn combine(self, higher: Self) -> Self {
        Sum(self.0 + higher.0)
    }
}

/// Arg-max over indexed values; `None` for empty partitions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArgMax(pub Option<IndexedValue>);

impl Combine for ArgMax {
    fn identity() -> Self {
        ArgMax(None)
    }

    fn combine(self, higher: Self) -> Self {
        match (self.0, higher.0) {
            (Some(a), Some(b)) => ArgMax(Some(IndexedValue::max_of(a, b))),
            (a, b) => ArgMax(a.or(b)),
        }
    }
}

/// Fold per-rank values in ascending rank order
pub fn fold_ranked<C: Combine>(values: impl IntoIterator<Item = C>) -> C {
    values.into_iter().fold(C::identity(), C::combine)
}

/// Exclusive scan: element `r` is the combination of ranks `0..r`
pub fn exclusive_scan<C: Combine + Clone>(values: impl IntoIterator<Item = C>) -> Vec<C> {
    let mut running = C::identity();
    let mut out = Vec::new();
    for value in values {
        out.push(running.clone());
        running = running.combine(value);
    }
    out
}
