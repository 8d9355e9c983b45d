//! Error taxonomy for resource-context operations.
//!
//! Construction failures are fatal: no partially-usable context is ever
//! returned. Per-call failures (index bounds, uninitialized communicator)
//! are reported to the immediate caller and leave every other accessor
//! intact.

use thiserror::Error;

/// Errors surfaced by resource contexts and their components.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Requested device ordinal does not exist.
    #[error("device {ordinal} not found ({available} devices present)")]
    DeviceNotFound {
        /// Ordinal that was requested.
        ordinal: usize,
        /// Number of devices actually present.
        available: usize,
    },

    /// Context construction failed; the context is unusable.
    #[error("context construction failed: {0}")]
    Construction(String),

    /// Auxiliary stream index is out of range.
    #[error("internal stream index {index} out of range (pool holds {count})")]
    StreamIndexOutOfBounds {
        /// Index that was requested.
        index: usize,
        /// Number of streams in the pool.
        count: usize,
    },

    /// Communicator accessed before one was injected.
    #[error("communicator accessed before initialization")]
    CommsNotInitialized,

    /// The underlying device runtime reported a failure. Device state may
    /// be corrupted; callers should treat the session as lost.
    #[error("device runtime error: {0}")]
    DeviceRuntime(String),

    /// Requested backend is not compiled in or not installed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Host memory allocation failed.
    #[error("host allocation of {size} bytes failed")]
    HostAllocationFailed {
        /// Requested allocation size in bytes.
        size: usize,
    },

    /// Device memory allocation failed.
    #[error("device allocation of {size} bytes failed")]
    DeviceAllocationFailed {
        /// Requested allocation size in bytes.
        size: usize,
    },

    /// A communicator implementation reported a failure.
    #[error("communicator error: {0}")]
    Comms(String),
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResourceError::StreamIndexOutOfBounds { index: 4, count: 4 };
        assert_eq!(
            err.to_string(),
            "internal stream index 4 out of range (pool holds 4)"
        );

        let err = ResourceError::DeviceNotFound {
            ordinal: 2,
            available: 1,
        };
        assert!(err.to_string().contains("device 2 not found"));
    }

    #[test]
    fn test_comms_not_initialized_message() {
        let err = ResourceError::CommsNotInitialized;
        assert!(err.to_string().contains("before initialization"));
    }
}
