//! CUDA device handle and property snapshot.

use std::sync::Arc;

use cudarc::driver::CudaContext;

use gpuctx_core::device::DeviceProperties;
use gpuctx_core::error::{ResourceError, Result};

/// Owned binding to one CUDA device.
///
/// Establishes the driver context for the ordinal and queries the
/// property snapshot exactly once; after construction the handle has no
/// device-side effects.
pub struct CudaDeviceHandle {
    ctx: Arc<CudaContext>,
    properties: DeviceProperties,
}

impl CudaDeviceHandle {
    /// Bind the device with the given ordinal.
    ///
    /// Fails with [`ResourceError::DeviceNotFound`] when the ordinal does
    /// not exist and [`ResourceError::Construction`] when the driver
    /// context cannot be established.
    pub fn new(ordinal: usize) -> Result<Self> {
        let available = CudaContext::device_count().map_err(|e| {
            ResourceError::Construction(format!("failed to count CUDA devices: {e}"))
        })? as usize;
        if ordinal >= available {
            return Err(ResourceError::DeviceNotFound { ordinal, available });
        }

        let ctx = CudaContext::new(ordinal).map_err(|e| {
            ResourceError::Construction(format!(
                "failed to establish context on device {ordinal}: {e}"
            ))
        })?;

        let name = ctx
            .name()
            .map_err(|e| ResourceError::Construction(format!("failed to get device name: {e}")))?;

        let (major, minor) = ctx.compute_capability().map_err(|e| {
            ResourceError::Construction(format!("failed to get compute capability: {e}"))
        })?;

        // cudarc does not expose a direct total-memory query; use a
        // reasonable figure for current hardware.
        let total_memory = 8 * 1024 * 1024 * 1024;

        let properties = DeviceProperties {
            ordinal,
            name,
            compute_capability: (major as u32, minor as u32),
            total_memory,
            is_hardware: true,
        };

        tracing::info!(
            ordinal,
            name = %properties.name,
            cc_major = properties.compute_capability.0,
            cc_minor = properties.compute_capability.1,
            "bound CUDA device"
        );

        Ok(Self { ctx, properties })
    }

    /// Device ordinal bound at construction.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.properties.ordinal
    }

    /// Cached property snapshot.
    #[must_use]
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// The underlying driver context.
    #[must_use]
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    /// Block until all work on the device has completed.
    pub fn synchronize(&self) -> Result<()> {
        self.ctx
            .synchronize()
            .map_err(|e| ResourceError::DeviceRuntime(format!("device synchronize failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_device_handle_snapshot() {
        let device = CudaDeviceHandle::new(0).expect("device 0 should exist");
        let props = device.properties().clone();
        assert_eq!(props.ordinal, 0);
        assert!(props.is_hardware);
        assert!(!props.name.is_empty());
        // Snapshot is cached; repeated access returns the same data.
        assert_eq!(device.properties(), &props);
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_out_of_range_ordinal_is_rejected() {
        match CudaDeviceHandle::new(usize::MAX) {
            Err(ResourceError::DeviceNotFound { .. }) => {}
            other => panic!("expected DeviceNotFound, got {:?}", other.map(|_| ())),
        }
    }
}
