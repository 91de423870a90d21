//! Pipeline error taxonomy
//!
//! Every failure either aborts the session or is defined away by policy
//! (zero range, empty array, zero-length partitions). These variants are the
//! ones that abort. They travel inside `anyhow::Error`, so callers that need
//! to classify a failure can `downcast_ref::<PipelineError>()`.

use thiserror::Error;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker group (threads or node connections) could not be started
    #[error("failed to initialize worker group: {0}")]
    InitializationFailure(String),

    /// A partition or result buffer could not be reserved
    #[error("failed to allocate {what} ({elements} elements)")]
    AllocationFailure { what: &'static str, elements: usize },

    /// Input that no explicit policy can turn into a defined result
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A partition plan was requested for an empty worker group
    #[error("cannot partition {elements} elements across zero workers")]
    PartitionUnderflow { elements: usize },

    /// A peer sent something other than what the current step expects
    #[error("protocol error on rank {rank}: {detail}")]
    Protocol { rank: usize, detail: String },

    /// A peer went away mid-collective
    #[error("rank {peer} disconnected")]
    Disconnected { peer: usize },
}

/// Reserve a buffer of exactly `elements` slots or fail with `AllocationFailure`
pub fn try_buffer<T>(what: &'static str, elements: usize) -> Result<Vec<T>, PipelineError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(elements)
        .map_err(|_| PipelineError::AllocationFailure { what, elements })?;
    Ok(buf)
}
