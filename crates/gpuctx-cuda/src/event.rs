//! Event-based stream fences.

use cudarc::driver::result as cuda_result;
use cudarc::driver::sys as cuda_sys;

use gpuctx_core::error::{ResourceError, Result};

/// A one-shot dependency between streams.
///
/// Records the current tail of one stream and makes another stream wait
/// for it device-side, without blocking the host. Created with timing
/// disabled; fences are ordering primitives, not timers.
pub struct StreamFence {
    event: cuda_sys::CUevent,
}

impl StreamFence {
    /// Create a fence event.
    pub fn new() -> Result<Self> {
        let event = cuda_result::event::create(cuda_sys::CUevent_flags::CU_EVENT_DISABLE_TIMING)
            .map_err(|e| {
                ResourceError::Construction(format!("failed to create fence event: {e:?}"))
            })?;
        Ok(Self { event })
    }

    /// Capture all work enqueued on `stream` up to this call.
    ///
    /// # Safety
    ///
    /// `stream` must be valid and belong to the current CUDA context.
    pub unsafe fn record(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: upheld by the caller.
        unsafe { cuda_result::event::record(self.event, stream) }
            .map_err(|e| ResourceError::DeviceRuntime(format!("failed to record fence: {e:?}")))
    }

    /// Make `stream` wait device-side for the captured work.
    ///
    /// Returns immediately on the host; the dependency is enforced by
    /// the device scheduler.
    ///
    /// # Safety
    ///
    /// `stream` must be valid and the fence must have been recorded.
    pub unsafe fn make_stream_wait(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: upheld by the caller.
        unsafe {
            cuda_result::stream::wait_event(
                stream,
                self.event,
                cuda_sys::CUevent_wait_flags::CU_EVENT_WAIT_DEFAULT,
            )
        }
        .map_err(|e| ResourceError::DeviceRuntime(format!("failed to enqueue fence wait: {e:?}")))
    }

    /// Block the calling thread until the captured work has completed.
    ///
    /// # Safety
    ///
    /// The fence must have been recorded.
    pub unsafe fn synchronize(&self) -> Result<()> {
        // Safety: upheld by the caller.
        unsafe { cuda_result::event::synchronize(self.event) }
            .map_err(|e| ResourceError::DeviceRuntime(format!("fence synchronize failed: {e:?}")))
    }
}

impl Drop for StreamFence {
    fn drop(&mut self) {
        // Safety: we own the event. Pending waits keep the underlying
        // resource alive until they complete.
        unsafe {
            let _ = cuda_result::event::destroy(self.event);
        }
    }
}

// Events can be used from any thread within the owning context.
unsafe impl Send for StreamFence {}
unsafe impl Sync for StreamFence {}
