//! Worker group abstraction
//!
//! A worker group is a fixed set of `size` ranks that execute the same
//! program in lockstep. Rank 0 is the coordinator. All traffic is explicit
//! message passing: values are encoded into frames and copied, never shared.
//!
//! # Transports
//!
//! - `local`: every rank is a thread in this process, linked by channels
//! - `tcp`: the coordinator holds one TCP connection per node service
//!
//! Both only ever route traffic between the coordinator and another rank
//! (star topology). The collective operations in [`collective`] are written
//! once against the [`Transport`] trait and work over either.

pub mod collective;
pub mod local;
pub mod tcp;

use crate::Result;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Rank of the coordinator in every group
pub const COORDINATOR: usize = 0;

/// Encoded collective payload
pub type Frame = Vec<u8>;

/// Point-to-point link layer underneath the collectives
///
/// `send` and `recv` block until the frame is handed off or arrives. There
/// are no timeouts: a stalled peer stalls the caller.
pub trait Transport: Send {
    /// This participant's rank
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    /// Send one frame to `dest`
    fn send(&mut self, dest: usize, frame: Frame) -> Result<()>;

    /// Receive the next frame from `src`
    fn recv(&mut self, src: usize) -> Result<Frame>;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }
}

/// Encode a value into a frame (MessagePack)
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Frame> {
    rmp_serde::to_vec(value).context("Failed to encode collective payload")
}

/// Decode a frame produced by [`encode`]
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    rmp_serde::from_slice(frame).context("Failed to decode collective payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;

    #[test]
    fn test_encode_decode_partition() {
        let part = Partition { rank: 2, offset: 10, length: 4 };
        let frame = encode(&part).unwrap();
        let back: Partition = decode(&frame).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let frame = encode(&"not a number").unwrap();
        assert!(decode::<u64>(&frame).is_err());
    }
}
