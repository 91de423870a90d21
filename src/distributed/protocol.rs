//! Distributed mode protocol
//!
//! This module defines the protocol spoken between the coordinator (rank 0)
//! and node services (ranks 1..p). Messages are MessagePack-encoded
//! (rmp-serde) enums behind a length prefix.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Node Service
//!     |                              |
//!     |-- HELLO(rank, size, session)>|
//!     |                              |
//!     |<------- READY ---------------|
//!     |                              |
//!     |<====== COLLECTIVE(frame) ===>|   repeated, lockstep
//!     |                              |
//!     |<------- ERROR (on failure) --|
//! ```
//!
//! The session ends when the coordinator closes the connection after the
//! final "stop" decision has been broadcast.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use crate::config::SessionConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Protocol version
///
/// Coordinator and node services must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest message body accepted from the wire
pub const MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

/// Protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Coordinator assigns a rank and ships the session parameters
    Hello(HelloMessage),

    /// Node accepted its rank
    Ready(ReadyMessage),

    /// One encoded collective payload
    Collective(Vec<u8>),

    /// Node hit a fatal error and is leaving the session
    Error(ErrorMessage),
}

impl Message {
    /// Short name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "HELLO",
            Message::Ready(_) => "READY",
            Message::Collective(_) => "COLLECTIVE",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Session handshake sent by the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Rank assigned to the receiving node
    pub rank: usize,

    /// Total group size, coordinator included
    pub size: usize,

    /// Pipeline and partition policy for the whole session
    pub session: SessionConfig,
}

/// Ready message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyMessage {
    /// Protocol version
    pub protocol_version: u32,

    /// Node identifier (hostname)
    pub node_id: String,

    /// Rank the node accepted
    pub rank: usize,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Node identifier
    pub node_id: String,

    /// Rank of the failing node
    pub rank: usize,

    /// Error description
    pub error: String,
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;
    frame(msg_bytes)
}

/// Prefix a message body with its length, refusing bodies the peer would reject
fn frame(msg_bytes: Vec<u8>) -> Result<Vec<u8>> {
    let msg_len = frame_length(msg_bytes.len())?;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Checked body length for the prefix; the same cap applies to both directions
fn frame_length(len: usize) -> Result<u32> {
    if len > MAX_MESSAGE_BYTES {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", len);
    }
    u32::try_from(len).context("Message does not fit a 32-bit length prefix")
}

/// Read a complete message from a TCP stream
pub async fn read_message(stream: &mut tokio::net::TcpStream) -> Result<Message> {
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;

    let msg_len = frame_length(u32::from_le_bytes(len_buf) as usize)? as usize;

    let mut msg_buf = vec![0u8; msg_len];
    stream
        .read_exact(&mut msg_buf)
        .await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf).context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to a TCP stream
pub async fn write_message(stream: &mut tokio::net::TcpStream, msg: &Message) -> Result<()> {
    let framed = serialize_message(msg)?;
    write_frame(stream, &framed).await
}

/// Write an already framed message to a TCP stream
pub async fn write_frame(stream: &mut tokio::net::TcpStream, framed: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    stream.write_all(framed).await.context("Failed to write message")?;

    // Collectives are latency bound; push every frame out immediately
    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}
