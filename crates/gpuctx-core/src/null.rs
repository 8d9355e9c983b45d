//! No-op backend implementing the full resource contract on the host.
//!
//! `NullResources` exists so the contract can be exercised without an
//! accelerator: streams are identity tokens, waits return immediately,
//! and the library bundle consists of mock handles that record which
//! stream they are bound to. Construction never touches a driver and
//! cannot fail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::alloc::{DeviceAllocator, HostAllocator, SystemDeviceAllocator, SystemHostAllocator};
use crate::comms::Communicator;
use crate::config::ResourceConfig;
use crate::device::DeviceProperties;
use crate::error::{ResourceError, Result};
use crate::resources::Resources;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token standing in for an execution stream.
///
/// Ids are globally unique except for [`NullStream::DEFAULT`], the
/// analogue of the implicit default stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullStream {
    id: u64,
}

impl NullStream {
    /// The implicit default stream (id 0).
    pub const DEFAULT: NullStream = NullStream { id: 0 };

    /// Create a stream token with a fresh globally-unique id.
    pub fn fresh() -> Self {
        Self {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The token's id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for NullStream {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mock vendor-library handle.
///
/// Carries a unique identity (so caching is observable) and the stream
/// it is currently bound to (so rebinding is observable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullLibHandle {
    id: u64,
    bound: NullStream,
}

impl NullLibHandle {
    fn create(stream: NullStream) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            bound: stream,
        }
    }

    /// The handle's identity, stable for the context's lifetime.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The stream this handle is currently bound to.
    #[must_use]
    pub fn bound_stream(&self) -> NullStream {
        self.bound
    }
}

/// The four mock library handles, created eagerly at construction.
#[derive(Debug, Clone, Copy)]
struct NullLibraryBundle {
    blas: NullLibHandle,
    dense_solver: NullLibHandle,
    sparse_solver: NullLibHandle,
    sparse: NullLibHandle,
}

impl NullLibraryBundle {
    fn new(stream: NullStream) -> Self {
        Self {
            blas: NullLibHandle::create(stream),
            dense_solver: NullLibHandle::create(stream),
            sparse_solver: NullLibHandle::create(stream),
            sparse: NullLibHandle::create(stream),
        }
    }

    fn rebind(&mut self, stream: NullStream) {
        self.blas.bound = stream;
        self.dense_solver.bound = stream;
        self.sparse_solver.bound = stream;
        self.sparse.bound = stream;
    }
}

/// Resource context without a device behind it.
pub struct NullResources {
    properties: DeviceProperties,
    primary: NullStream,
    internal: Vec<NullStream>,
    library: NullLibraryBundle,
    device_allocator: Arc<dyn DeviceAllocator>,
    host_allocator: Arc<dyn HostAllocator>,
    communicator: Option<Arc<dyn Communicator>>,
}

impl NullResources {
    /// Create a null context for the given configuration.
    pub fn new(config: &ResourceConfig) -> Self {
        let primary = NullStream::DEFAULT;
        let internal: Vec<NullStream> = (0..config.num_internal_streams)
            .map(|_| NullStream::fresh())
            .collect();
        tracing::debug!(
            ordinal = config.device_ordinal,
            num_internal = internal.len(),
            "created null resource context"
        );
        Self {
            properties: DeviceProperties::null(config.device_ordinal),
            primary,
            internal,
            library: NullLibraryBundle::new(primary),
            device_allocator: Arc::new(SystemDeviceAllocator),
            host_allocator: Arc::new(SystemHostAllocator),
            communicator: None,
        }
    }

    /// Replace the primary stream, rebinding every library handle.
    pub fn set_stream(&mut self, stream: NullStream) {
        self.library.rebind(stream);
        self.primary = stream;
    }

    /// Inject a device allocator shared with the caller.
    pub fn set_device_allocator(&mut self, allocator: Arc<dyn DeviceAllocator>) {
        self.device_allocator = allocator;
    }

    /// Inject a host allocator shared with the caller.
    pub fn set_host_allocator(&mut self, allocator: Arc<dyn HostAllocator>) {
        self.host_allocator = allocator;
    }

    /// Install a communicator.
    pub fn set_communicator(&mut self, communicator: Arc<dyn Communicator>) {
        self.communicator = Some(communicator);
    }

    /// Mock dense-algebra handle, bound to the current primary stream.
    #[must_use]
    pub fn blas(&self) -> &NullLibHandle {
        &self.library.blas
    }

    /// Mock dense direct-solver handle.
    #[must_use]
    pub fn dense_solver(&self) -> &NullLibHandle {
        &self.library.dense_solver
    }

    /// Mock sparse direct-solver handle.
    #[must_use]
    pub fn sparse_solver(&self) -> &NullLibHandle {
        &self.library.sparse_solver
    }

    /// Mock sparse-algebra handle.
    #[must_use]
    pub fn sparse(&self) -> &NullLibHandle {
        &self.library.sparse
    }
}

impl Default for NullResources {
    fn default() -> Self {
        Self::new(&ResourceConfig::default())
    }
}

impl Resources for NullResources {
    type Stream = NullStream;

    fn device(&self) -> usize {
        self.properties.ordinal
    }

    fn device_properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn stream(&self) -> &NullStream {
        &self.primary
    }

    fn num_internal_streams(&self) -> usize {
        self.internal.len()
    }

    fn internal_stream(&self, index: usize) -> Result<&NullStream> {
        self.internal
            .get(index)
            .ok_or(ResourceError::StreamIndexOutOfBounds {
                index,
                count: self.internal.len(),
            })
    }

    fn internal_streams(&self) -> &[NullStream] {
        &self.internal
    }

    fn wait_on_user_stream(&self) -> Result<()> {
        Ok(())
    }

    fn wait_on_internal_streams(&self) -> Result<()> {
        Ok(())
    }

    fn device_allocator(&self) -> Arc<dyn DeviceAllocator> {
        Arc::clone(&self.device_allocator)
    }

    fn host_allocator(&self) -> Arc<dyn HostAllocator> {
        Arc::clone(&self.host_allocator)
    }

    fn communicator(&self) -> Result<Arc<dyn Communicator>> {
        self.communicator
            .as_ref()
            .map(Arc::clone)
            .ok_or(ResourceError::CommsNotInitialized)
    }

    fn comms_initialized(&self) -> bool {
        self.communicator.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_streams_are_distinct() {
        let a = NullStream::fresh();
        let b = NullStream::fresh();
        assert_ne!(a, b);
        assert_ne!(a, NullStream::DEFAULT);
    }

    #[test]
    fn test_default_primary_is_default_stream() {
        let ctx = NullResources::default();
        assert_eq!(*ctx.stream(), NullStream::DEFAULT);
        assert_eq!(ctx.num_internal_streams(), 0);
    }

    #[test]
    fn test_set_stream_rebinds_all_handles() {
        let mut ctx = NullResources::default();
        let blas_id = ctx.blas().id();
        let replacement = NullStream::fresh();

        ctx.set_stream(replacement);

        assert_eq!(*ctx.stream(), replacement);
        assert_eq!(ctx.blas().bound_stream(), replacement);
        assert_eq!(ctx.dense_solver().bound_stream(), replacement);
        assert_eq!(ctx.sparse_solver().bound_stream(), replacement);
        assert_eq!(ctx.sparse().bound_stream(), replacement);
        // Rebinding does not recreate the handle.
        assert_eq!(ctx.blas().id(), blas_id);
    }

    #[test]
    fn test_handle_identities_are_distinct() {
        let ctx = NullResources::default();
        let ids = [
            ctx.blas().id(),
            ctx.dense_solver().id(),
            ctx.sparse_solver().id(),
            ctx.sparse().id(),
        ];
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert_ne!(ids[i], ids[j]);
            }
        }
    }
}
