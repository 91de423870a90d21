//! Distributed mode implementation
//!
//! # Architecture
//!
//! Distributed mode uses a coordinator-node architecture:
//!
//! - **Coordinator**: rank 0; owns the input, connects to every node, drives
//!   the collectives and prints results
//! - **Node Service**: runs on each node, accepts a rank from the
//!   coordinator and executes the worker side of every pipeline run
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `node_service`: Node service implementation
//! - `coordinator`: Connection setup and rank assignment

pub mod coordinator;
pub mod node_service;
pub mod protocol;

// Re-export key types
pub use protocol::{ErrorMessage, HelloMessage, Message, ReadyMessage, PROTOCOL_VERSION};

pub use coordinator::DistributedCoordinator;
pub use node_service::NodeService;
