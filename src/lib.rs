//! splitscan - partitioned array analysis over a fixed worker group
//!
//! A coordinator splits an array into contiguous partitions, every rank
//! computes over its own slice, and the partial results are reduced back
//! to the coordinator.
//!
//! # Architecture
//!
//! - **Partitioning**: front-loaded or back-loaded remainder policies
//! - **Collectives**: broadcast, scatter, gather, reduce and exclusive scan over a star topology
//! - **Transports**: in-process threads or TCP node services
//! - **Pipelines**: first-violation sortedness check and a multi-stage statistics pass

pub mod analysis;
pub mod config;
pub mod controller;
pub mod distributed;
pub mod error;
pub mod group;
pub mod input;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod reduce;

// Re-export commonly used types
pub use config::Config;
pub use error::PipelineError;
pub use group::Transport;

/// Result type used throughout splitscan
pub type Result<T> = anyhow::Result<T>;
