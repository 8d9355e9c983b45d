//! Contract tests for the resource-context capability interface,
//! exercised against the null backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gpuctx_core::prelude::*;

#[test]
fn stream_pool_has_fixed_count_and_stable_order() {
    for n in [0usize, 1, 3, 8] {
        let ctx = NullResources::new(&ResourceConfig::concurrent(n));
        assert_eq!(ctx.num_internal_streams(), n);

        let first: Vec<NullStream> = ctx.internal_streams().to_vec();
        let second: Vec<NullStream> = ctx.internal_streams().to_vec();
        assert_eq!(first, second, "order must be stable across calls");
        assert_eq!(first.len(), n);

        // All identities distinct.
        for i in 0..n {
            for j in (i + 1)..n {
                assert_ne!(first[i], first[j]);
            }
        }
    }
}

#[test]
fn internal_stream_access_is_idempotent_and_bounds_checked() {
    let ctx = NullResources::new(&ResourceConfig::concurrent(4));

    for i in 0..4 {
        let a = *ctx.internal_stream(i).unwrap();
        let b = *ctx.internal_stream(i).unwrap();
        assert_eq!(a, b, "repeated access must return the same stream");
    }

    match ctx.internal_stream(4) {
        Err(ResourceError::StreamIndexOutOfBounds { index: 4, count: 4 }) => {}
        other => panic!("expected out-of-bounds error, got {other:?}"),
    }
}

#[test]
fn waits_return_immediately_with_no_enqueued_work() {
    let ctx = NullResources::new(&ResourceConfig::concurrent(4));
    assert_eq!(ctx.num_internal_streams(), 4);
    ctx.wait_on_user_stream().unwrap();
    ctx.wait_on_internal_streams().unwrap();
}

#[test]
fn communicator_slot_starts_empty() {
    let ctx = NullResources::default();
    assert!(!ctx.comms_initialized());
    assert!(matches!(
        ctx.communicator(),
        Err(ResourceError::CommsNotInitialized)
    ));
}

#[test]
fn injected_communicator_is_returned_by_identity() {
    let mut ctx = NullResources::default();
    let comm: Arc<dyn Communicator> = Arc::new(LocalCommunicator);

    ctx.set_communicator(Arc::clone(&comm));

    assert!(ctx.comms_initialized());
    let held = ctx.communicator().unwrap();
    assert!(Arc::ptr_eq(&held, &comm), "must hold the injected instance");
    assert_eq!(held.rank(), 0);
    assert_eq!(held.size(), 1);
}

#[test]
fn allocator_slots_are_never_empty() {
    let ctx = NullResources::default();

    let device = ctx.device_allocator();
    let host = ctx.host_allocator();

    let d = device.allocate(128).unwrap();
    let h = host.allocate(128).unwrap();
    assert_ne!(d, 0);
    assert_ne!(h, 0);
    device.deallocate(d, 128);
    host.deallocate(h, 128);
}

/// Counting allocator used to verify identity injection.
struct CountingAllocator {
    inner: SystemDeviceAllocator,
    allocations: AtomicUsize,
}

impl DeviceAllocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Result<usize> {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.inner.allocate(size)
    }

    fn deallocate(&self, addr: usize, size: usize) {
        self.inner.deallocate(addr, size);
    }
}

#[test]
fn injected_device_allocator_is_returned_by_identity() {
    let mut ctx = NullResources::default();
    let counting = Arc::new(CountingAllocator {
        inner: SystemDeviceAllocator,
        allocations: AtomicUsize::new(0),
    });
    let injected: Arc<dyn DeviceAllocator> = counting.clone();

    ctx.set_device_allocator(Arc::clone(&injected));

    let held = ctx.device_allocator();
    assert!(Arc::ptr_eq(&held, &injected));

    let addr = held.allocate(64).unwrap();
    held.deallocate(addr, 64);
    assert_eq!(counting.allocations.load(Ordering::Relaxed), 1);
}

#[test]
fn allocator_swap_does_not_disturb_other_slots() {
    let mut ctx = NullResources::new(&ResourceConfig::concurrent(2));
    let streams_before: Vec<NullStream> = ctx.internal_streams().to_vec();
    let blas_before = *ctx.blas();

    ctx.set_device_allocator(Arc::new(SystemDeviceAllocator));
    ctx.set_host_allocator(Arc::new(SystemHostAllocator));

    assert_eq!(ctx.internal_streams(), streams_before.as_slice());
    assert_eq!(*ctx.blas(), blas_before);
    assert!(!ctx.comms_initialized());
}

#[test]
fn two_contexts_have_disjoint_stream_pools() {
    let a = NullResources::new(&ResourceConfig::concurrent(3));
    let b = NullResources::new(&ResourceConfig::concurrent(3));

    for sa in a.internal_streams() {
        for sb in b.internal_streams() {
            assert_ne!(sa, sb, "pools of independent contexts must be disjoint");
        }
    }
}

#[test]
fn library_handle_access_returns_the_cached_handle() {
    let ctx = NullResources::default();
    let first = ctx.blas().id();
    let second = ctx.blas().id();
    assert_eq!(first, second, "handle is created once, not per access");
    assert_eq!(ctx.sparse().id(), ctx.sparse().id());
}

#[test]
fn library_handles_observe_stream_change() {
    let mut ctx = NullResources::default();
    assert_eq!(ctx.blas().bound_stream(), NullStream::DEFAULT);

    let replacement = NullStream::fresh();
    ctx.set_stream(replacement);

    // Every handle must be rebound before its next use; a stale binding
    // is a correctness bug.
    assert_eq!(ctx.blas().bound_stream(), replacement);
    assert_eq!(ctx.dense_solver().bound_stream(), replacement);
    assert_eq!(ctx.sparse_solver().bound_stream(), replacement);
    assert_eq!(ctx.sparse().bound_stream(), replacement);
}

#[test]
fn generic_algorithm_consumes_the_capability_interface() {
    fn checksum<R: Resources>(res: &R) -> Result<usize> {
        let mut total = res.num_internal_streams();
        if res.comms_initialized() {
            total += res.communicator()?.size();
        }
        res.wait_on_user_stream()?;
        Ok(total)
    }

    let mut ctx = NullResources::new(&ResourceConfig::concurrent(2));
    assert_eq!(checksum(&ctx).unwrap(), 2);

    ctx.set_communicator(Arc::new(LocalCommunicator));
    assert_eq!(checksum(&ctx).unwrap(), 3);
}
