//! # gpuctx-cuda
//!
//! CUDA backend for the gpuctx resource contract, built on cudarc.
//!
//! [`CudaResources`] composes a device binding, a primary stream plus a
//! fixed pool of auxiliary streams, eagerly-created cuBLAS / cuSOLVER /
//! cuSPARSE handles bound to the primary stream, and the injectable
//! allocator and communicator slots defined by `gpuctx-core`.
//!
//! # Requirements
//!
//! - NVIDIA GPU and driver at runtime
//! - CUDA Toolkit at build time (the `cuda` feature links the driver API)
//!
//! Without the `cuda` feature a stub with the same construction surface
//! is compiled and reports the backend as unavailable, so downstream
//! crates build unchanged on hosts without the toolkit.
//!
//! # Example
//!
//! ```ignore
//! use gpuctx_core::prelude::*;
//! use gpuctx_cuda::CudaResources;
//!
//! let mut ctx = CudaResources::new(&ResourceConfig::concurrent(4))?;
//! // ... fan work out across ctx.internal_streams() ...
//! ctx.fence_user_on_internal()?;
//! ctx.wait_on_user_stream()?;
//! # Ok::<(), ResourceError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(feature = "cuda")]
pub mod alloc;
#[cfg(feature = "cuda")]
mod device;
#[cfg(feature = "cuda")]
pub mod event;
#[cfg(feature = "cuda")]
pub mod library;
#[cfg(feature = "cuda")]
mod resources;
#[cfg(feature = "cuda")]
pub mod stream;

#[cfg(feature = "cuda")]
pub use alloc::{CudaDeviceAllocator, PinnedHostAllocator};
#[cfg(feature = "cuda")]
pub use device::CudaDeviceHandle;
#[cfg(feature = "cuda")]
pub use event::StreamFence;
#[cfg(feature = "cuda")]
pub use library::{
    CublasHandle, CusolverDnHandle, CusolverSpHandle, CusparseHandle, LibraryBundle,
};
#[cfg(feature = "cuda")]
pub use resources::{CudaResources, CudaResourcesBuilder};
#[cfg(feature = "cuda")]
pub use stream::StreamPool;

#[cfg(not(feature = "cuda"))]
mod stub;
#[cfg(not(feature = "cuda"))]
pub use stub::{CudaResources, CudaResourcesBuilder};

// cudarc can panic while loading a missing driver library; the probe
// folds panics and driver errors into a zero count.
#[cfg(feature = "cuda")]
fn probe_device_count() -> usize {
    std::panic::catch_unwind(|| {
        cudarc::driver::CudaContext::device_count().unwrap_or(0) as usize
    })
    .unwrap_or(0)
}

/// Number of visible CUDA devices, or 0 when the `cuda` feature is off,
/// the driver is not installed, or enumeration fails.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        probe_device_count()
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}

/// True when at least one CUDA device can be used right now.
pub fn is_cuda_available() -> bool {
    cuda_device_count() > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "cuda"))]
    fn test_availability_probes_without_cuda() {
        assert!(!is_cuda_available());
        assert_eq!(cuda_device_count(), 0);
    }
}
