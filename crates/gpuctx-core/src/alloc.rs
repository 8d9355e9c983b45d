//! Allocator capability traits and host-side defaults.
//!
//! A resource context always holds one device allocator and one host
//! allocator. Both are injectable; the defaults here (and the CUDA-side
//! defaults in the backend crate) guarantee that neither slot is ever
//! empty when a consumer dereferences it.
//!
//! Swapping an allocator mid-session does not migrate outstanding
//! allocations; callers must drain allocations from the old allocator
//! before swapping to an incompatible one.

use std::alloc::{alloc, dealloc, Layout};

use crate::error::{ResourceError, Result};

/// Device-memory allocation capability.
///
/// Addresses are raw device addresses. The context is agnostic to the
/// strategy behind them (pool, caching, direct pass-through).
pub trait DeviceAllocator: Send + Sync {
    /// Allocate `size` bytes of device memory and return its device address.
    fn allocate(&self, size: usize) -> Result<usize>;

    /// Release an allocation previously returned by [`allocate`].
    ///
    /// `size` must match the size passed at allocation.
    ///
    /// [`allocate`]: DeviceAllocator::allocate
    fn deallocate(&self, addr: usize, size: usize);
}

/// Host-memory allocation capability.
///
/// Same contract as [`DeviceAllocator`], but addresses are host pointers
/// (e.g. pageable or pinned memory, depending on the implementation).
pub trait HostAllocator: Send + Sync {
    /// Allocate `size` bytes of host memory and return its address.
    fn allocate(&self, size: usize) -> Result<usize>;

    /// Release an allocation previously returned by [`allocate`].
    ///
    /// [`allocate`]: HostAllocator::allocate
    fn deallocate(&self, addr: usize, size: usize);
}

/// Alignment used by the system allocators, matching the widest cache
/// line found on current hardware.
pub const SYSTEM_ALLOC_ALIGN: usize = 64;

fn system_layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size, SYSTEM_ALLOC_ALIGN).ok()
}

/// Shared allocation path for the system-backed defaults; `fail` picks
/// the error variant of the failing slot.
fn system_allocate(size: usize, fail: fn(usize) -> ResourceError) -> Result<usize> {
    let layout = system_layout(size).ok_or_else(|| fail(size))?;
    if layout.size() == 0 {
        return Err(fail(size));
    }
    // Safety: layout has non-zero size and valid alignment.
    let ptr = unsafe { alloc(layout) };
    if ptr.is_null() {
        return Err(fail(size));
    }
    Ok(ptr as usize)
}

fn system_deallocate(addr: usize, size: usize) {
    if addr == 0 {
        return;
    }
    if let Some(layout) = system_layout(size) {
        // Safety: addr came from `system_allocate` with the same layout.
        unsafe { dealloc(addr as *mut u8, layout) };
    }
}

/// Default host allocator backed by the system allocator.
///
/// Installed automatically when no host allocator is injected, so the
/// host slot is valid even in zero-configuration use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHostAllocator;

impl HostAllocator for SystemHostAllocator {
    fn allocate(&self, size: usize) -> Result<usize> {
        system_allocate(size, |size| ResourceError::HostAllocationFailed { size })
    }

    fn deallocate(&self, addr: usize, size: usize) {
        system_deallocate(addr, size);
    }
}

/// Host-backed stand-in for a device allocator.
///
/// Used by the null backend as the caller-independent default so the
/// device slot is never empty without hardware. Allocations live in host
/// memory; "device addresses" are host pointers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDeviceAllocator;

impl DeviceAllocator for SystemDeviceAllocator {
    fn allocate(&self, size: usize) -> Result<usize> {
        system_allocate(size, |size| ResourceError::DeviceAllocationFailed { size })
    }

    fn deallocate(&self, addr: usize, size: usize) {
        system_deallocate(addr, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_host_allocator_roundtrip() {
        let a = SystemHostAllocator;
        let addr = a.allocate(1024).unwrap();
        assert_ne!(addr, 0);
        assert_eq!(addr % SYSTEM_ALLOC_ALIGN, 0);
        a.deallocate(addr, 1024);
    }

    #[test]
    fn test_system_host_allocator_zero_size() {
        let a = SystemHostAllocator;
        assert!(matches!(
            a.allocate(0),
            Err(ResourceError::HostAllocationFailed { size: 0 })
        ));
    }

    #[test]
    fn test_system_device_allocator_zero_size() {
        let a = SystemDeviceAllocator;
        assert!(matches!(
            a.allocate(0),
            Err(ResourceError::DeviceAllocationFailed { size: 0 })
        ));
    }

    #[test]
    fn test_system_device_allocator_roundtrip() {
        let a = SystemDeviceAllocator;
        let addr = a.allocate(256).unwrap();
        assert_ne!(addr, 0);
        a.deallocate(addr, 256);
    }

    #[test]
    fn test_allocator_is_object_safe() {
        let device: Box<dyn DeviceAllocator> = Box::new(SystemDeviceAllocator);
        let host: Box<dyn HostAllocator> = Box::new(SystemHostAllocator);
        let d = device.allocate(64).unwrap();
        let h = host.allocate(64).unwrap();
        device.deallocate(d, 64);
        host.deallocate(h, 64);
    }
}
