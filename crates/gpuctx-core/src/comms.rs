//! Distributed-communication capability.
//!
//! The context stores at most one communicator and hands it out to
//! algorithms; the concrete collective protocol (NCCL, MPI, ...) lives
//! outside this workspace. [`LocalCommunicator`] is a single-participant
//! loopback used in tests and single-process runs.

use std::sync::Arc;

use crate::error::{ResourceError, Result};

/// Reduction operator for collective reduce operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Element-wise sum.
    Sum,
    /// Element-wise minimum.
    Min,
    /// Element-wise maximum.
    Max,
}

/// Capability set for multi-process / multi-device collectives.
///
/// Buffers are raw bytes; element typing and layout are agreed between the
/// participants, not by the context.
pub trait Communicator: Send + Sync {
    /// This participant's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Total number of participants.
    fn size(&self) -> usize;

    /// Broadcast `data` from `root` to all participants.
    fn broadcast(&self, data: &mut [u8], root: usize) -> Result<()>;

    /// Reduce `send` across participants into `recv` on `root`.
    fn reduce(&self, send: &[u8], recv: &mut [u8], op: ReduceOp, root: usize) -> Result<()>;

    /// Gather each participant's `send` into `recv` on `root`.
    fn gather(&self, send: &[u8], recv: &mut [u8], root: usize) -> Result<()>;

    /// Scatter slices of `send` on `root` into each participant's `recv`.
    fn scatter(&self, send: &[u8], recv: &mut [u8], root: usize) -> Result<()>;

    /// Block until every participant has entered the barrier.
    fn barrier(&self) -> Result<()>;
}

/// Shared communicator handle as stored in a context slot.
pub type SharedCommunicator = Arc<dyn Communicator>;

/// Single-participant loopback communicator.
///
/// Rank 0 of 1; every collective degenerates to a local copy or no-op.
/// Not installed by default: the communicator slot of a fresh context is
/// empty until the caller injects one.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCommunicator;

impl LocalCommunicator {
    fn check_root(&self, root: usize) -> Result<()> {
        if root != 0 {
            return Err(ResourceError::Comms(format!(
                "root {root} out of range for single-participant communicator"
            )));
        }
        Ok(())
    }

    fn copy(send: &[u8], recv: &mut [u8]) -> Result<()> {
        if send.len() != recv.len() {
            return Err(ResourceError::Comms(format!(
                "buffer length mismatch: send {} vs recv {}",
                send.len(),
                recv.len()
            )));
        }
        recv.copy_from_slice(send);
        Ok(())
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast(&self, _data: &mut [u8], root: usize) -> Result<()> {
        self.check_root(root)
    }

    fn reduce(&self, send: &[u8], recv: &mut [u8], _op: ReduceOp, root: usize) -> Result<()> {
        self.check_root(root)?;
        Self::copy(send, recv)
    }

    fn gather(&self, send: &[u8], recv: &mut [u8], root: usize) -> Result<()> {
        self.check_root(root)?;
        Self::copy(send, recv)
    }

    fn scatter(&self, send: &[u8], recv: &mut [u8], root: usize) -> Result<()> {
        self.check_root(root)?;
        Self::copy(send, recv)
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_communicator_rank_size() {
        let comm = LocalCommunicator;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
    }

    #[test]
    fn test_local_communicator_reduce_copies() {
        let comm = LocalCommunicator;
        let send = [1u8, 2, 3, 4];
        let mut recv = [0u8; 4];
        comm.reduce(&send, &mut recv, ReduceOp::Sum, 0).unwrap();
        assert_eq!(recv, send);
    }

    #[test]
    fn test_local_communicator_rejects_bad_root() {
        let comm = LocalCommunicator;
        let mut buf = [0u8; 4];
        assert!(comm.broadcast(&mut buf, 1).is_err());
    }

    #[test]
    fn test_local_communicator_rejects_length_mismatch() {
        let comm = LocalCommunicator;
        let send = [0u8; 4];
        let mut recv = [0u8; 8];
        assert!(comm.gather(&send, &mut recv, 0).is_err());
    }

    #[test]
    fn test_local_communicator_barrier() {
        let comm = LocalCommunicator;
        comm.barrier().unwrap();
    }
}
