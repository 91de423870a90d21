//! Distributed coordinator
//!
//! This module implements the coordinator side of distributed mode.
//! The coordinator:
//! - Connects to all node services, in host-list order
//! - Assigns rank `i + 1` to the `i`-th node
//! - Ships the session parameters and waits for every node to be ready
//! - Hands the connections to a [`TcpTransport`] as rank 0

use crate::config::SessionConfig;
use crate::distributed::protocol::*;
use crate::error::PipelineError;
use crate::group::tcp::TcpTransport;
use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Distributed coordinator
pub struct DistributedCoordinator {
    /// Pipeline and partition policy every node must run
    session: SessionConfig,

    /// List of node addresses (host:port), rank order
    node_addresses: Vec<String>,
}

impl DistributedCoordinator {
    /// Create a new distributed coordinator
    pub fn new(session: SessionConfig, node_addresses: Vec<String>) -> Result<Self> {
        if node_addresses.is_empty() {
            anyhow::bail!("No nodes specified for distributed mode");
        }

        Ok(Self {
            session,
            node_addresses,
        })
    }

    /// Group size including the coordinator
    pub fn group_size(&self) -> usize {
        self.node_addresses.len() + 1
    }

    /// Connect to every node and build the coordinator's transport
    ///
    /// `runtime` must be multi-threaded; the returned transport blocks on it.
    pub fn connect(&self, runtime: &Runtime) -> Result<TcpTransport> {
        let nodes = runtime
            .block_on(self.connect_nodes())
            .map_err(|e| PipelineError::InitializationFailure(format!("{:#}", e)))?;
        Ok(TcpTransport::coordinator(runtime.handle().clone(), nodes))
    }

    async fn connect_nodes(&self) -> Result<Vec<TcpStream>> {
        let size = self.group_size();
        info!(nodes = self.node_addresses.len(), "connecting to node services");

        let mut connections = Vec::with_capacity(self.node_addresses.len());
        for (i, addr) in self.node_addresses.iter().enumerate() {
            let rank = i + 1;
            let mut stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("Failed to connect to {}", addr))?;
            stream
                .set_nodelay(true)
                .with_context(|| format!("Failed to set TCP_NODELAY for {}", addr))?;

            let hello = HelloMessage {
                protocol_version: PROTOCOL_VERSION,
                rank,
                size,
                session: self.session,
            };
            write_message(&mut stream, &Message::Hello(hello))
                .await
                .with_context(|| format!("Failed to send HELLO to node {} ({})", rank, addr))?;

            debug!(rank, %addr, "sent HELLO");
            connections.push((rank, addr, stream));
        }

        for (rank, addr, stream) in &mut connections {
            let msg = read_message(stream)
                .await
                .with_context(|| format!("Failed to read READY from node {} ({})", rank, addr))?;

            match msg {
                Message::Ready(ready) => {
                    if ready.protocol_version != PROTOCOL_VERSION {
                        anyhow::bail!(
                            "Protocol version mismatch on node {}: expected {}, got {}",
                            rank,
                            PROTOCOL_VERSION,
                            ready.protocol_version
                        );
                    }
                    if ready.rank != *rank {
                        anyhow::bail!("Node {} acknowledged rank {} instead", rank, ready.rank);
                    }
                    info!(rank = *rank, node = %ready.node_id, %addr, "node ready");
                }
                Message::Error(err) => {
                    anyhow::bail!("Node {} reported error: {}", rank, err.error);
                }
                other => {
                    anyhow::bail!("Expected READY from node {}, got {}", rank, other.kind());
                }
            }
        }

        info!(size, "all nodes ready");
        Ok(connections.into_iter().map(|(_, _, stream)| stream).collect())
    }
}
