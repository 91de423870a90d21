//! Node service for distributed mode
//!
//! This module implements the node service that runs on each node in distributed mode.
//! The node service:
//! - Listens for connections from the coordinator
//! - Accepts a rank and the session parameters (HELLO), answers READY
//! - Runs the worker side of the session until the coordinator stops it
//! - Reports a fatal error back to the coordinator before leaving
//! - Goes back to waiting for the next coordinator

use crate::controller;
use crate::distributed::protocol::*;
use crate::group::tcp::TcpTransport;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

/// Node service
///
/// Owns a multi-threaded runtime; each session's collectives block on it.
pub struct NodeService {
    runtime: Runtime,
    listener: TcpListener,

    /// Node identifier (hostname)
    node_id: String,
}

impl NodeService {
    /// Bind the listening socket (`addr` as `host:port`)
    pub fn bind(addr: &str) -> Result<Self> {
        let runtime = Runtime::new().context("Failed to start async runtime")?;
        let listener = runtime
            .block_on(TcpListener::bind(addr))
            .with_context(|| format!("Failed to bind node service on {}", addr))?;

        Ok(Self {
            runtime,
            listener,
            node_id: get_node_id(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listening address")
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Serve coordinators forever
    ///
    /// A failed session is logged and the service keeps listening.
    pub fn run(&self) -> Result<()> {
        info!(addr = %self.local_addr()?, node = %self.node_id, "node service listening");

        loop {
            match self.serve_once() {
                Ok(()) => info!("session complete, waiting for next coordinator"),
                Err(e) => error!(error = %format!("{:#}", e), "session failed"),
            }
        }
    }

    /// Accept one coordinator and run its session to completion
    pub fn serve_once(&self) -> Result<()> {
        let (stream, peer) = self
            .runtime
            .block_on(self.listener.accept())
            .context("Failed to accept connection")?;
        info!(%peer, "coordinator connected");

        let (stream, hello) = self.runtime.block_on(self.handshake(stream))?;
        info!(rank = hello.rank, size = hello.size, session = %hello.session, "joined session");

        let mut transport = TcpTransport::node(self.runtime.handle().clone(), hello.rank, hello.size, stream)?;

        let result = controller::run_worker(&mut transport, &hello.session);
        if let Err(e) = &result {
            warn!(rank = hello.rank, error = %format!("{:#}", e), "worker failed");
            transport.report_error(&self.node_id, e);
        }
        result
    }

    /// Read HELLO, validate it and answer READY
    async fn handshake(&self, mut stream: TcpStream) -> Result<(TcpStream, HelloMessage)> {
        stream.set_nodelay(true).context("Failed to set TCP_NODELAY")?;

        let hello = match read_message(&mut stream).await.context("Failed to read HELLO")? {
            Message::Hello(hello) => hello,
            other => anyhow::bail!("Expected HELLO, got {}", other.kind()),
        };

        if hello.protocol_version != PROTOCOL_VERSION {
            let error = ErrorMessage {
                node_id: self.node_id.clone(),
                rank: hello.rank,
                error: format!(
                    "Protocol version mismatch: coordinator={}, node={}",
                    hello.protocol_version, PROTOCOL_VERSION
                ),
            };
            write_message(&mut stream, &Message::Error(error)).await?;
            anyhow::bail!("Protocol version mismatch");
        }

        let ready = ReadyMessage {
            protocol_version: PROTOCOL_VERSION,
            node_id: self.node_id.clone(),
            rank: hello.rank,
        };
        write_message(&mut stream, &Message::Ready(ready))
            .await
            .context("Failed to send READY")?;

        Ok((stream, hello))
    }
}

/// Get node identifier (hostname, or "unknown")
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
