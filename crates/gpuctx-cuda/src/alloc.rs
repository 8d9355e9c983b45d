//! CUDA-backed default allocators.
//!
//! Direct pass-through implementations of the core allocator traits.
//! Pool or caching allocators can be injected by callers; these defaults
//! only guarantee that a fresh context has working allocation.

use std::sync::Arc;

use cudarc::driver::result as cuda_result;
use cudarc::driver::sys as cuda_sys;
use cudarc::driver::CudaContext;

use gpuctx_core::alloc::{DeviceAllocator, HostAllocator};
use gpuctx_core::error::{ResourceError, Result};

/// Direct device-memory allocator over the driver API.
pub struct CudaDeviceAllocator {
    ctx: Arc<CudaContext>,
}

impl CudaDeviceAllocator {
    /// Create an allocator bound to `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<CudaContext>) -> Self {
        Self { ctx }
    }
}

impl DeviceAllocator for CudaDeviceAllocator {
    fn allocate(&self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(ResourceError::DeviceAllocationFailed { size });
        }
        self.ctx
            .bind_to_thread()
            .map_err(|e| ResourceError::DeviceRuntime(format!("context bind failed: {e}")))?;
        // Safety: the context is bound to the calling thread.
        let ptr = unsafe { cuda_result::malloc_sync(size) }
            .map_err(|_| ResourceError::DeviceAllocationFailed { size })?;
        Ok(ptr as usize)
    }

    fn deallocate(&self, addr: usize, _size: usize) {
        if addr == 0 || self.ctx.bind_to_thread().is_err() {
            return;
        }
        // Safety: addr came from `allocate` on this context. Failures on
        // teardown paths are ignored; deallocate must not panic.
        unsafe {
            let _ = cuda_result::free_sync(addr as cuda_sys::CUdeviceptr);
        }
    }
}

/// Page-locked host-memory allocator over the driver API.
///
/// Pinned allocations allow direct DMA transfers and can be mapped into
/// the device address space.
pub struct PinnedHostAllocator {
    ctx: Arc<CudaContext>,
}

impl PinnedHostAllocator {
    /// Create an allocator bound to `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<CudaContext>) -> Self {
        Self { ctx }
    }
}

impl HostAllocator for PinnedHostAllocator {
    fn allocate(&self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(ResourceError::HostAllocationFailed { size });
        }
        self.ctx
            .bind_to_thread()
            .map_err(|e| ResourceError::DeviceRuntime(format!("context bind failed: {e}")))?;
        // Safety: the context is bound to the calling thread.
        let ptr = unsafe { cuda_result::malloc_host(size, 0) }
            .map_err(|_| ResourceError::HostAllocationFailed { size })?;
        Ok(ptr as usize)
    }

    fn deallocate(&self, addr: usize, _size: usize) {
        if addr == 0 || self.ctx.bind_to_thread().is_err() {
            return;
        }
        // Safety: addr came from `allocate` on this context.
        unsafe {
            let _ = cuda_result::free_host(addr as *mut std::ffi::c_void);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_device_allocator_roundtrip() {
        let ctx = CudaContext::new(0).expect("device 0 should exist");
        let alloc = CudaDeviceAllocator::new(ctx);
        let addr = alloc.allocate(4096).unwrap();
        assert_ne!(addr, 0);
        alloc.deallocate(addr, 4096);
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_pinned_allocator_roundtrip() {
        let ctx = CudaContext::new(0).expect("device 0 should exist");
        let alloc = PinnedHostAllocator::new(ctx);
        let addr = alloc.allocate(4096).unwrap();
        assert_ne!(addr, 0);
        alloc.deallocate(addr, 4096);
    }
}
