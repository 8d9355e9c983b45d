//! Placeholder surface when CUDA support is not compiled in.
//!
//! The stub context implements the full [`Resources`] contract (with
//! [`NullStream`] as the stream type) so code generic over the trait
//! compiles unchanged, and the stub builder accepts every override that
//! only needs core types. The one real-backend method without a stub
//! counterpart is `with_stream`/`set_stream`, whose signature requires
//! the cudarc stream type. Construction always fails, so no trait
//! method can ever run.

use std::sync::Arc;

use gpuctx_core::alloc::{
    DeviceAllocator, HostAllocator, SystemDeviceAllocator, SystemHostAllocator,
};
use gpuctx_core::comms::Communicator;
use gpuctx_core::config::ResourceConfig;
use gpuctx_core::device::DeviceProperties;
use gpuctx_core::error::{ResourceError, Result};
use gpuctx_core::null::NullStream;
use gpuctx_core::resources::Resources;

/// Stub CUDA context when the `cuda` feature is disabled.
pub struct CudaResources {
    properties: DeviceProperties,
    primary: NullStream,
}

impl CudaResources {
    /// Construction fails: CUDA support is not compiled in.
    pub fn new(_config: &ResourceConfig) -> Result<Self> {
        tracing::warn!("CUDA resource context requested but the cuda feature is not enabled");
        Err(ResourceError::BackendUnavailable(
            "CUDA feature not enabled".to_string(),
        ))
    }

    /// Start building a context; `build` will fail.
    #[must_use]
    pub fn builder() -> CudaResourcesBuilder {
        CudaResourcesBuilder::new()
    }
}

impl Resources for CudaResources {
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
        0
    }

    fn internal_stream(&self, index: usize) -> Result<&NullStream> {
        Err(ResourceError::StreamIndexOutOfBounds { index, count: 0 })
    }

    fn internal_streams(&self) -> &[NullStream] {
        &[]
    }

    fn wait_on_user_stream(&self) -> Result<()> {
        Ok(())
    }

    fn wait_on_internal_streams(&self) -> Result<()> {
        Ok(())
    }

    fn device_allocator(&self) -> Arc<dyn DeviceAllocator> {
        Arc::new(SystemDeviceAllocator)
    }

    fn host_allocator(&self) -> Arc<dyn HostAllocator> {
        Arc::new(SystemHostAllocator)
    }

    fn communicator(&self) -> Result<Arc<dyn Communicator>> {
        Err(ResourceError::CommsNotInitialized)
    }

    fn comms_initialized(&self) -> bool {
        false
    }
}

/// Stub builder when the `cuda` feature is disabled.
///
/// Accepts the same core-typed overrides as the real builder; they are
/// discarded because `build` cannot succeed without CUDA support.
pub struct CudaResourcesBuilder {
    config: ResourceConfig,
}

impl CudaResourcesBuilder {
    /// Create a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ResourceConfig::default(),
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

    /// Override the device allocator. Accepted and discarded.
    #[must_use]
    pub fn with_device_allocator(self, _allocator: Arc<dyn DeviceAllocator>) -> Self {
        self
    }

    /// Override the host allocator. Accepted and discarded.
    #[must_use]
    pub fn with_host_allocator(self, _allocator: Arc<dyn HostAllocator>) -> Self {
        self
    }

    /// Install a communicator. Accepted and discarded.
    #[must_use]
    pub fn with_communicator(self, _communicator: Arc<dyn Communicator>) -> Self {
        self
    }

    /// Build fails: CUDA support is not compiled in.
    pub fn build(self) -> Result<CudaResources> {
        CudaResources::new(&self.config)
    }
}

impl Default for CudaResourcesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpuctx_core::comms::LocalCommunicator;

    #[test]
    fn test_stub_construction_reports_backend_unavailable() {
        match CudaResources::new(&ResourceConfig::default()) {
            Err(ResourceError::BackendUnavailable(msg)) => {
                assert!(msg.contains("CUDA"));
            }
            _ => panic!("stub construction must fail"),
        }
    }

    #[test]
    fn test_stub_builder_fails_on_build() {
        let result = CudaResources::builder()
            .on_device(1)
            .with_internal_streams(4)
            .build();
        assert!(matches!(
            result,
            Err(ResourceError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_stub_builder_accepts_all_core_overrides() {
        let result = CudaResources::builder()
            .with_config(ResourceConfig::concurrent(2))
            .with_device_allocator(Arc::new(SystemDeviceAllocator))
            .with_host_allocator(Arc::new(SystemHostAllocator))
            .with_communicator(Arc::new(LocalCommunicator))
            .build();
        assert!(matches!(
            result,
            Err(ResourceError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_stub_satisfies_the_capability_interface() {
        fn accepts_resources<R: Resources>() {}
        accepts_resources::<CudaResources>();
    }
}
