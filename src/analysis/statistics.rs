//! Statistics stages
//!
//! The statistics pipeline runs in dependency order:
//!
//! 1. `LocalSummary::of` - sum, min, max, count per partition
//! 2. coordinator reduces and broadcasts `GlobalMoments`
//! 3. `variance_term` - Σ (x - mean)² per partition
//! 4. `percentage_transform` - (x - min) / (max - min) * 100
//! 5. `local_arg_max` - first maximum of the percentage slice
//! 6. `inclusive_prefix` + `apply_prefix_offset` - prefix sums
//! 7. `count_relative_to_mean` - coordinator-side below/above counts
//!
//! Stages 3-5 need the broadcast moments and must not run before them.

use crate::error::{try_buffer, PipelineError};
use serde::{Deserialize, Serialize};

/// Stage 1 result: neutral when the partition is empty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalSummary {
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl LocalSummary {
    /// Neutral element: zero sum, `+∞` min, `-∞` max
    pub fn empty() -> Self {
        Self {
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }

    pub fn of(values: &[f64]) -> Self {
        values.iter().fold(Self::empty(), |mut acc, &x| {
            acc.sum += x;
            if x < acc.min {
                acc.min = x;
            }
            if x > acc.max {
                acc.max = x;
            }
            acc.count += 1;
            acc
        })
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            count: self.count + other.count,
        }
    }
}

impl Default for LocalSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Global values broadcast back to every rank after the first reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalMoments {
    pub count: usize,
    pub sum: f64,
    /// `None` when the array is empty
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GlobalMoments {
    pub fn from_summary(summary: LocalSummary) -> Self {
        if summary.count == 0 {
            return Self {
                count: 0,
                sum: 0.0,
                mean: None,
                min: None,
                max: None,
            };
        }

        Self {
            count: summary.count,
            sum: summary.sum,
            mean: Some(summary.sum / summary.count as f64),
            min: Some(summary.min),
            max: Some(summary.max),
        }
    }

    /// `max - min` when it is strictly positive
    ///
    /// `None` covers both the empty array and the all-equal array, which
    /// the percentage transform maps to a constant zero vector. Finite
    /// bounds far enough apart give `+∞`.
    pub fn range(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if max > min => Some(max - min),
            _ => None,
        }
    }

    /// Population variance from the reduced Σ (x - mean)²
    pub fn variance(&self, variance_term: f64) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(variance_term / self.count as f64)
        }
    }
}

/// Σ (x - mean)² over one partition
pub fn variance_term(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|&x| (x - mean) * (x - mean)).sum()
}

/// Range-normalised percentage of every value
///
/// Degenerate range (all values equal, or no values) yields `0.0` for every
/// element instead of NaN. A range wider than `f64::MAX` is normalised on
/// halved operands, so the minimum still maps to exactly 0 and the maximum
/// to exactly 100.
pub fn percentage_transform(values: &[f64], moments: &GlobalMoments) -> Result<Vec<f64>, PipelineError> {
    let mut out = try_buffer("percentage vector", values.len())?;
    match (moments.range(), moments.min, moments.max) {
        (Some(range), Some(min), _) if range.is_finite() => {
            out.extend(values.iter().map(|&x| (x - min) / range * 100.0));
        }
        (Some(_), Some(min), Some(max)) => {
            let half_min = min / 2.0;
            let half_range = max / 2.0 - half_min;
            out.extend(values.iter().map(|&x| (x / 2.0 - half_min) / half_range * 100.0));
        }
        _ => out.extend(std::iter::repeat(0.0).take(values.len())),
    }
    Ok(out)
}

/// A value tagged with its global index, for arg-max reductions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedValue {
    pub value: f64,
    pub index: usize,
}

impl IndexedValue {
    /// Larger value wins; on a tie the lower global index wins
    pub fn max_of(a: Self, b: Self) -> Self {
        if b.value > a.value || (b.value == a.value && b.index < a.index) {
            b
        } else {
            a
        }
    }
}

/// First maximum of a partition's slice, with its global index
pub fn local_arg_max(values: &[f64], offset: usize) -> Option<IndexedValue> {
    let mut best: Option<IndexedValue> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some(b) if value <= b.value => {}
            _ => {
                best = Some(IndexedValue {
                    value,
                    index: offset + i,
                })
            }
        }
    }
    best
}

/// Inclusive running sum of a partition
pub fn inclusive_prefix(values: &[f64]) -> Result<Vec<f64>, PipelineError> {
    let mut out = try_buffer("prefix vector", values.len())?;
    let mut running = 0.0;
    for &x in values {
        running += x;
        out.push(running);
    }
    Ok(out)
}

/// Shift a local prefix vector by the sum of all lower-ranked partitions
pub fn apply_prefix_offset(prefix: &mut [f64], offset: f64) {
    for value in prefix.iter_mut() {
        *value += offset;
    }
}

/// Number of elements strictly below and strictly above the mean
pub fn count_relative_to_mean(values: &[f64], mean: f64) -> (usize, usize) {
    values.iter().fold((0, 0), |(below, above), &x| {
        if x < mean {
            (below + 1, above)
        } else if x > mean {
            (below, above + 1)
        } else {
            (below, above)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_local_summary() {
        let s = LocalSummary::of(&[3.0, -1.0, 4.0]);
        assert_eq!(s.sum, 6.0);
        assert_eq!(s.min, -1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.count, 3);
    }

    #[test]
    fn test_empty_summary_is_neutral() {
        let s = LocalSummary::of(&[2.0, 5.0]);
        assert_eq!(s.merge(LocalSummary::of(&[])), s);
        assert_eq!(LocalSummary::of(&[]).merge(s), s);
    }

    #[test]
    fn test_moments_and_variance() {
        let moments = GlobalMoments::from_summary(LocalSummary::of(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(moments.mean, Some(2.5));
        assert_eq!(moments.range(), Some(3.0));

        let term = variance_term(&[1.0, 2.0, 3.0, 4.0], 2.5);
        assert!(approx(moments.variance(term).unwrap(), 1.25));
    }

    #[test]
    fn test_empty_moments() {
        let moments = GlobalMoments::from_summary(LocalSummary::empty());
        assert_eq!(moments.mean, None);
        assert_eq!(moments.min, None);
        assert_eq!(moments.range(), None);
        assert_eq!(moments.variance(0.0), None);
    }

    #[test]
    fn test_percentage_transform() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let moments = GlobalMoments::from_summary(LocalSummary::of(&values));
        let pct = percentage_transform(&values, &moments).unwrap();
        assert_eq!(pct[0], 0.0);
        assert!(approx(pct[1], 100.0 / 3.0));
        assert!(approx(pct[2], 200.0 / 3.0));
        assert_eq!(pct[3], 100.0);
    }

    #[test]
    fn test_percentage_transform_range_wider_than_f64() {
        let values = [-1e308, 0.0, 1e308];
        let moments = GlobalMoments::from_summary(LocalSummary::of(&values));
        assert_eq!(moments.range(), Some(f64::INFINITY));

        let pct = percentage_transform(&values, &moments).unwrap();
        assert_eq!(pct[0], 0.0);
        assert!(approx(pct[1], 50.0));
        assert_eq!(pct[2], 100.0);

        let best = local_arg_max(&pct, 0).unwrap();
        assert_eq!(best.index, 2);
        assert_eq!(best.value, 100.0);
    }

    #[test]
    fn test_percentage_transform_degenerate_range() {
        let values = [5.0, 5.0, 5.0];
        let moments = GlobalMoments::from_summary(LocalSummary::of(&values));
        let pct = percentage_transform(&values, &moments).unwrap();
        assert_eq!(pct, vec![0.0, 0.0, 0.0]);
        assert!(pct.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_local_arg_max_keeps_first() {
        let best = local_arg_max(&[10.0, 50.0, 50.0, 20.0], 7).unwrap();
        assert_eq!(best.value, 50.0);
        assert_eq!(best.index, 8);
        assert_eq!(local_arg_max(&[], 3), None);
    }

    #[test]
    fn test_indexed_value_tie_break() {
        let a = IndexedValue { value: 100.0, index: 9 };
        let b = IndexedValue { value: 100.0, index: 2 };
        assert_eq!(IndexedValue::max_of(a, b).index, 2);
        assert_eq!(IndexedValue::max_of(b, a).index, 2);

        let c = IndexedValue { value: 99.0, index: 0 };
        assert_eq!(IndexedValue::max_of(c, a).index, 9);
    }

    #[test]
    fn test_prefix_with_offset() {
        let mut prefix = inclusive_prefix(&[3.0, 4.0]).unwrap();
        assert_eq!(prefix, vec![3.0, 7.0]);
        apply_prefix_offset(&mut prefix, 3.0);
        assert_eq!(prefix, vec![6.0, 10.0]);
    }

    #[test]
    fn test_count_relative_to_mean() {
        assert_eq!(count_relative_to_mean(&[1.0, 2.0, 3.0, 4.0], 2.5), (2, 2));
        assert_eq!(count_relative_to_mean(&[1.0, 2.0, 3.0], 2.0), (1, 1));
        assert_eq!(count_relative_to_mean(&[5.0, 5.0], 5.0), (0, 0));
    }
}
