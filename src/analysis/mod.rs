//! Per-rank analysis
//!
//! Pure functions over one rank's partition. Nothing in here knows about
//! transports or ranks beyond the partition offset needed to turn local
//! positions into global indices.
//!
//! - `sortedness`: boundary-aware ordering scan
//! - `statistics`: sums, range bounds, variance terms, percentage transform,
//!   arg-max and prefix sums

pub mod sortedness;
pub mod statistics;

pub use sortedness::SortednessVerdict;
pub use statistics::{GlobalMoments, IndexedValue, LocalSummary};
