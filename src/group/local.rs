//! In-process worker group
//!
//! Each rank is a thread. Every ordered pair of ranks gets its own
//! unbounded channel, so `recv(src)` only ever sees frames from `src` and
//! per-pair ordering is FIFO. When a rank finishes or fails its transport is
//! dropped, which disconnects its channels; any rank blocked on it then fails
//! with `PipelineError::Disconnected` instead of hanging.

use crate::error::PipelineError;
use crate::group::{Frame, Transport, COORDINATOR};
use crate::Result;
use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::debug;

/// One rank's end of the in-process group
pub struct LocalTransport {
    rank: usize,
    /// `outbound[dest]` delivers to rank `dest`
    outbound: Vec<Sender<Frame>>,
    /// `inbound[src]` receives from rank `src`
    inbound: Vec<Receiver<Frame>>,
}

impl LocalTransport {
    /// Build a fully connected group of `size` transports, indexed by rank
    pub fn group(size: usize) -> Result<Vec<LocalTransport>> {
        if size == 0 {
            return Err(PipelineError::InitializationFailure("worker group needs at least one rank".to_string()).into());
        }

        let mut outbound: Vec<Vec<Sender<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inbound: Vec<Vec<Receiver<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();

        for src in 0..size {
            for dest in 0..size {
                let (tx, rx) = unbounded();
                outbound[src].push(tx);
                inbound[dest].push(rx);
            }
        }

        Ok(outbound
            .into_iter()
            .zip(inbound)
            .enumerate()
            .map(|(rank, (outbound, inbound))| LocalTransport {
                rank,
                outbound,
                inbound,
            })
            .collect())
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outbound.len()
    }

    fn send(&mut self, dest: usize, frame: Frame) -> Result<()> {
        let link = self
            .outbound
            .get(dest)
            .ok_or_else(|| anyhow::anyhow!("Rank {} is outside the group", dest))?;
        link.send(frame)
            .map_err(|_| PipelineError::Disconnected { peer: dest })?;
        Ok(())
    }

    fn recv(&mut self, src: usize) -> Result<Frame> {
        let link = self
            .inbound
            .get(src)
            .ok_or_else(|| anyhow::anyhow!("Rank {} is outside the group", src))?;
        let frame = link
            .recv()
            .map_err(|_| PipelineError::Disconnected { peer: src })?;
        Ok(frame)
    }
}

/// Run an SPMD session on `size` in-process ranks
///
/// Rank 0 runs `coordinator` on the calling thread (so it can own console
/// I/O); ranks `1..size` run `worker` on their own threads. Returns the
/// coordinator's result once every rank has finished.
///
/// If any rank fails, the error reported is the first one (by rank) that is
/// not a mere disconnect, since disconnects are the knock-on effect of
/// another rank going away.
pub fn run_local<C, W, R>(size: usize, coordinator: C, worker: W) -> Result<R>
where
    C: FnOnce(&mut LocalTransport) -> Result<R>,
    W: Fn(&mut LocalTransport) -> Result<()> + Sync,
{
    let mut transports = LocalTransport::group(size)?.into_iter();
    let mut root = transports
        .next()
        .ok_or_else(|| PipelineError::InitializationFailure("missing coordinator rank".to_string()))?;

    std::thread::scope(|scope| {
        let worker = &worker;
        let mut handles = Vec::with_capacity(size.saturating_sub(1));

        for mut transport in transports {
            let rank = transport.rank();
            let handle = std::thread::Builder::new()
                .name(format!("rank-{}", rank))
                .spawn_scoped(scope, move || {
                    let result = worker(&mut transport);
                    debug!(rank, ok = result.is_ok(), "rank finished");
                    result
                })
                .map_err(|e| PipelineError::InitializationFailure(format!("cannot spawn rank {}: {}", rank, e)))?;
            handles.push(handle);
        }

        let root_result = coordinator(&mut root);
        // Unblock any rank still waiting on the coordinator
        drop(root);

        let mut worker_results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .join()
                .map_err(|_| anyhow::anyhow!("Worker thread panicked"))
                .and_then(|r| r);
            worker_results.push(result);
        }

        pick_outcome(root_result, worker_results)
    })
}

fn is_disconnect(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Disconnected { .. })
    )
}

fn pick_outcome<R>(root: Result<R>, workers: Vec<Result<()>>) -> Result<R> {
    let mut errors: Vec<anyhow::Error> = Vec::new();
    let root = match root {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    };
    errors.extend(workers.into_iter().filter_map(|r| r.err()));

    if errors.is_empty() {
        return root.ok_or_else(|| anyhow::anyhow!("Rank {} produced no result", COORDINATOR));
    }

    let index = errors.iter().position(|e| !is_disconnect(e)).unwrap_or(0);
    Err(errors.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_shape() {
        let group = LocalTransport::group(3).unwrap();
        assert_eq!(group.len(), 3);
        for (rank, t) in group.iter().enumerate() {
            assert_eq!(t.rank(), rank);
            assert_eq!(t.size(), 3);
        }
        assert!(group[0].is_coordinator());
        assert!(!group[2].is_coordinator());
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(LocalTransport::group(0).is_err());
    }

    #[test]
    fn test_point_to_point() {
        let mut group = LocalTransport::group(2).unwrap();
        let mut b = group.pop().unwrap();
        let mut a = group.pop().unwrap();
        a.send(1, vec![1, 2, 3]).unwrap();
        assert_eq!(b.recv(0).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_recv_from_dropped_peer_disconnects() {
        let mut group = LocalTransport::group(2).unwrap();
        let mut b = group.pop().unwrap();
        drop(group);
        let err = b.recv(0).unwrap_err();
        assert!(is_disconnect(&err));
    }

    #[test]
    fn test_worker_error_is_root_cause() {
        let err = run_local(
            3,
            |group| {
                let frame = group.recv(2)?;
                Ok(frame)
            },
            |group| {
                if group.rank() == 2 {
                    anyhow::bail!("rank 2 exploded");
                }
                Ok(())
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("rank 2 exploded"));
    }

    #[test]
    fn test_coordinator_error_releases_workers() {
        let err = run_local(
            4,
            |_group| -> Result<()> { anyhow::bail!("no input") },
            |group| {
                group.recv(COORDINATOR)?;
                Ok(())
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no input");
    }

    #[test]
    fn test_worker_panic_reported() {
        let err = run_local(
            2,
            |_group| Ok(()),
            |_group| -> Result<()> { panic!("boom") },
        )
        .unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }
}
