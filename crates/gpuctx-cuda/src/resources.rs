//! The CUDA resource context.
//!
//! Composes the device handle, stream pool, vendor library bundle and
//! the injectable allocator/communicator slots into the one object
//! algorithms receive. Construction order is device, then streams, then
//! library handles, then default allocators; the communicator slot
//! starts empty. Teardown runs in exact reverse via field drop order:
//! library handles before streams, streams before the device context.

use std::sync::Arc;

use cudarc::driver::CudaStream;

use gpuctx_core::alloc::{DeviceAllocator, HostAllocator};
use gpuctx_core::comms::Communicator;
use gpuctx_core::config::ResourceConfig;
use gpuctx_core::device::DeviceProperties;
use gpuctx_core::error::{ResourceError, Result};
use gpuctx_core::resources::Resources;

use crate::alloc::{CudaDeviceAllocator, PinnedHostAllocator};
use crate::device::CudaDeviceHandle;
use crate::library::{CublasHandle, CusolverDnHandle, CusolverSpHandle, CusparseHandle, LibraryBundle};
use crate::stream::StreamPool;

/// Per-session CUDA execution context.
///
/// Created once per logical session and passed by reference into
/// successive algorithm calls. Mutators take `&mut self`; callers must
/// not swap a slot while device work depending on the old value is in
/// flight.
pub struct CudaResources {
    // Field order fixes teardown: handles before streams, streams
    // before the device context.
    library: LibraryBundle,
    streams: StreamPool,
    device: CudaDeviceHandle,
    device_allocator: Arc<dyn DeviceAllocator>,
    host_allocator: Arc<dyn HostAllocator>,
    communicator: Option<Arc<dyn Communicator>>,
}

impl CudaResources {
    /// Build a context for the given configuration.
    ///
    /// All vendor handles are created here, eagerly, so resource
    /// exhaustion or a missing device surfaces now rather than inside an
    /// algorithm. No partially-usable context is ever returned.
    pub fn new(config: &ResourceConfig) -> Result<Self> {
        let device = CudaDeviceHandle::new(config.device_ordinal)?;
        let streams = StreamPool::new(device.context(), config.num_internal_streams)?;
        let library = LibraryBundle::new(streams.user_stream())?;
        let device_allocator: Arc<dyn DeviceAllocator> =
            Arc::new(CudaDeviceAllocator::new(Arc::clone(device.context())));
        let host_allocator: Arc<dyn HostAllocator> =
            Arc::new(PinnedHostAllocator::new(Arc::clone(device.context())));

        tracing::info!(
            ordinal = config.device_ordinal,
            num_internal_streams = config.num_internal_streams,
            "created CUDA resource context"
        );

        Ok(Self {
            library,
            streams,
            device,
            device_allocator,
            host_allocator,
            communicator: None,
        })
    }

    /// Start building a context with overrides.
    #[must_use]
    pub fn builder() -> CudaResourcesBuilder {
        CudaResourcesBuilder::new()
    }

    /// Replace the primary stream.
    ///
    /// Every vendor handle is rebound before the new stream is
    /// published, so no consumer can observe a stale binding. Must not
    /// be called while work dependent on the old stream is in flight.
    pub fn set_stream(&mut self, stream: Arc<CudaStream>) -> Result<()> {
        self.library.rebind(&stream)?;
        self.streams.set_user_stream(stream);
        tracing::debug!("replaced primary stream and rebound library handles");
        Ok(())
    }

    /// Inject a device allocator shared with the caller.
    ///
    /// Outstanding allocations from the previous allocator are not
    /// migrated.
    pub fn set_device_allocator(&mut self, allocator: Arc<dyn DeviceAllocator>) {
        self.device_allocator = allocator;
    }

    /// Inject a host allocator shared with the caller.
    pub fn set_host_allocator(&mut self, allocator: Arc<dyn HostAllocator>) {
        self.host_allocator = allocator;
    }

    /// Install a communicator for multi-process collectives.
    pub fn set_communicator(&mut self, communicator: Arc<dyn Communicator>) {
        self.communicator = Some(communicator);
    }

    /// The cuBLAS handle, bound to the current primary stream.
    #[must_use]
    pub fn cublas(&self) -> &CublasHandle {
        self.library.cublas()
    }

    /// The cuSOLVER dense handle, bound to the current primary stream.
    #[must_use]
    pub fn cusolver_dn(&self) -> &CusolverDnHandle {
        self.library.cusolver_dn()
    }

    /// The cuSOLVER sparse handle, bound to the current primary stream.
    #[must_use]
    pub fn cusolver_sp(&self) -> &CusolverSpHandle {
        self.library.cusolver_sp()
    }

    /// The cuSPARSE handle, bound to the current primary stream.
    #[must_use]
    pub fn cusparse(&self) -> &CusparseHandle {
        self.library.cusparse()
    }

    /// Make the primary stream wait device-side for every auxiliary
    /// stream. See [`StreamPool::fence_user_on_internal`].
    pub fn fence_user_on_internal(&self) -> Result<()> {
        self.streams.fence_user_on_internal()
    }

    /// Make every auxiliary stream wait device-side for the primary
    /// stream. See [`StreamPool::fence_internal_on_user`].
    pub fn fence_internal_on_user(&self) -> Result<()> {
        self.streams.fence_internal_on_user()
    }

    /// The owned device handle.
    #[must_use]
    pub fn device_handle(&self) -> &CudaDeviceHandle {
        &self.device
    }
}

impl Resources for CudaResources {
    type Stream = Arc<CudaStream>;

    fn device(&self) -> usize {
        self.device.ordinal()
    }

    fn device_properties(&self) -> &DeviceProperties {
        self.device.properties()
    }

    fn stream(&self) -> &Arc<CudaStream> {
        self.streams.user_stream()
    }

    fn num_internal_streams(&self) -> usize {
        self.streams.num_internal()
    }

    fn internal_stream(&self, index: usize) -> Result<&Arc<CudaStream>> {
        self.streams.internal(index)
    }

    fn internal_streams(&self) -> &[Arc<CudaStream>] {
        self.streams.internal_streams()
    }

    fn wait_on_user_stream(&self) -> Result<()> {
        self.streams.wait_on_user_stream()
    }

    fn wait_on_internal_streams(&self) -> Result<()> {
        self.streams.wait_on_internal_streams()
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

/// Builder for [`CudaResources`].
pub struct CudaResourcesBuilder {
    config: ResourceConfig,
    stream: Option<Arc<CudaStream>>,
    device_allocator: Option<Arc<dyn DeviceAllocator>>,
    host_allocator: Option<Arc<dyn HostAllocator>>,
    communicator: Option<Arc<dyn Communicator>>,
}

impl CudaResourcesBuilder {
    /// Create a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ResourceConfig::default(),
            stream: None,
            device_allocator: None,
            host_allocator: None,
            communicator: None,
        }
    }

    /// Set the full configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind a specific device ordinal.
    #[must_use]
    pub fn on_device(mut self, ordinal: usize) -> Self {
        self.config.device_ordinal = ordinal;
        self
    }

    /// Set the auxiliary stream count.
    #[must_use]
    pub fn with_internal_streams(mut self, count: usize) -> Self {
        self.config.num_internal_streams = count;
        self
    }

    /// Override the primary stream.
    #[must_use]
    pub fn with_stream(mut self, stream: Arc<CudaStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Override the device allocator.
    #[must_use]
    pub fn with_device_allocator(mut self, allocator: Arc<dyn DeviceAllocator>) -> Self {
        self.device_allocator = Some(allocator);
        self
    }

    /// Override the host allocator.
    #[must_use]
    pub fn with_host_allocator(mut self, allocator: Arc<dyn HostAllocator>) -> Self {
        self.host_allocator = Some(allocator);
        self
    }

    /// Install a communicator.
    #[must_use]
    pub fn with_communicator(mut self, communicator: Arc<dyn Communicator>) -> Self {
        self.communicator = Some(communicator);
        self
    }

    /// Build the context.
    pub fn build(self) -> Result<CudaResources> {
        let mut resources = CudaResources::new(&self.config)?;
        if let Some(stream) = self.stream {
            resources.set_stream(stream)?;
        }
        if let Some(allocator) = self.device_allocator {
            resources.set_device_allocator(allocator);
        }
        if let Some(allocator) = self.host_allocator {
            resources.set_host_allocator(allocator);
        }
        if let Some(communicator) = self.communicator {
            resources.set_communicator(communicator);
        }
        Ok(resources)
    }
}

impl Default for CudaResourcesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
