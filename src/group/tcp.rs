//! TCP worker group
//!
//! The coordinator holds one connection per node service (rank `r` is the
//! `r`-th node in the host list); a node holds a single connection back to
//! the coordinator. Every frame travels as a `Message::Collective` with the
//! protocol's length-prefixed framing.
//!
//! The collectives are synchronous, so each `send`/`recv` blocks on the
//! owning runtime through a [`Handle`]. The runtime must be multi-threaded
//! and the caller must not itself be running inside it.

use crate::distributed::protocol::{read_message, serialize_message, write_frame, write_message, ErrorMessage, Message};
use crate::error::PipelineError;
use crate::group::{Frame, Transport, COORDINATOR};
use crate::Result;
use anyhow::Context;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// One rank's end of a TCP worker group
pub struct TcpTransport {
    rank: usize,
    size: usize,
    handle: Handle,
    /// `links[peer]` is the connection to `peer`, if this rank has one
    links: Vec<Option<TcpStream>>,
}

impl TcpTransport {
    /// Coordinator side: `nodes[i]` is the connection to rank `i + 1`
    pub fn coordinator(handle: Handle, nodes: Vec<TcpStream>) -> Self {
        let size = nodes.len() + 1;
        let mut links = Vec::with_capacity(size);
        links.push(None);
        links.extend(nodes.into_iter().map(Some));

        Self {
            rank: COORDINATOR,
            size,
            handle,
            links,
        }
    }

    /// Node side: a single link to the coordinator
    pub fn node(handle: Handle, rank: usize, size: usize, coordinator: TcpStream) -> Result<Self> {
        if rank == COORDINATOR || rank >= size {
            return Err(PipelineError::Protocol {
                rank,
                detail: format!("rank {} is not a valid node rank in a group of {}", rank, size),
            }
            .into());
        }

        let mut links: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();
        links[COORDINATOR] = Some(coordinator);

        Ok(Self {
            rank,
            size,
            handle,
            links,
        })
    }

    fn link(&mut self, peer: usize) -> Result<&mut TcpStream> {
        let rank = self.rank;
        self.links
            .get_mut(peer)
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                PipelineError::Protocol {
                    rank,
                    detail: format!("no connection to rank {}", peer),
                }
                .into()
            })
    }

    /// Tell the coordinator this node is giving up (best effort)
    pub fn report_error(&mut self, node_id: &str, error: &anyhow::Error) {
        let rank = self.rank;
        let handle = self.handle.clone();
        let Ok(stream) = self.link(COORDINATOR) else {
            return;
        };

        let msg = Message::Error(ErrorMessage {
            node_id: node_id.to_string(),
            rank,
            error: format!("{:#}", error),
        });
        if let Err(e) = handle.block_on(write_message(stream, &msg)) {
            debug!(rank, error = %e, "could not report failure to coordinator");
        }
    }
}

impl Transport for TcpTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&mut self, dest: usize, frame: Frame) -> Result<()> {
        let handle = self.handle.clone();
        // Oversized frames fail here, before the peer sees a partial session
        let framed = serialize_message(&Message::Collective(frame))?;
        let stream = self.link(dest)?;
        handle
            .block_on(write_frame(stream, &framed))
            .with_context(|| PipelineError::Disconnected { peer: dest })
    }

    fn recv(&mut self, src: usize) -> Result<Frame> {
        let rank = self.rank;
        let handle = self.handle.clone();
        let stream = self.link(src)?;
        let msg = handle
            .block_on(read_message(stream))
            .with_context(|| PipelineError::Disconnected { peer: src })?;

        match msg {
            Message::Collective(frame) => Ok(frame),
            Message::Error(err) => {
                warn!(peer = src, node = %err.node_id, "peer reported failure");
                Err(PipelineError::Protocol {
                    rank: err.rank,
                    detail: err.error,
                }
                .into())
            }
            other => Err(PipelineError::Protocol {
                rank,
                detail: format!("expected COLLECTIVE from rank {}, got {}", src, other.kind()),
            }
            .into()),
        }
    }
}
