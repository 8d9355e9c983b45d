//! Primary-stream slot and auxiliary stream pool.
//!
//! The pool owns its auxiliary streams for the lifetime of the context;
//! the primary (user) stream is a replaceable slot that defaults to the
//! context's default stream. Auxiliary streams exist for intra-call
//! parallelism only: an algorithm that fans work out across them must
//! fence the primary stream on them (see [`StreamPool::fence_user_on_internal`])
//! before returning control to its caller.

use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaStream};

use gpuctx_core::error::{ResourceError, Result};

use crate::event::StreamFence;

/// Fixed-size pool of auxiliary streams plus the primary-stream slot.
pub struct StreamPool {
    ctx: Arc<CudaContext>,
    user: Arc<CudaStream>,
    /// Auxiliary streams in creation order; order is stable for the
    /// pool's lifetime.
    internal: Vec<Arc<CudaStream>>,
}

impl StreamPool {
    /// Create a pool with `num_internal` auxiliary streams.
    ///
    /// The primary slot starts as the context's default stream. Stream
    /// creation failure aborts construction.
    pub fn new(ctx: &Arc<CudaContext>, num_internal: usize) -> Result<Self> {
        let user = ctx.default_stream();
        let mut internal = Vec::with_capacity(num_internal);
        for _ in 0..num_internal {
            let stream = ctx.new_stream().map_err(|e| {
                ResourceError::Construction(format!("failed to create internal stream: {e}"))
            })?;
            internal.push(stream);
        }
        tracing::debug!(num_internal, "created stream pool");
        Ok(Self {
            ctx: Arc::clone(ctx),
            user,
            internal,
        })
    }

    /// Bind the pool's context to the calling thread.
    ///
    /// Waits and fences can be issued from any thread holding a shared
    /// reference; the raw driver calls they make require the context to
    /// be current on that thread.
    fn bind(&self) -> Result<()> {
        self.ctx
            .bind_to_thread()
            .map_err(|e| ResourceError::DeviceRuntime(format!("failed to bind context: {e}")))
    }

    /// Replace the primary stream. Does not touch the auxiliary pool.
    pub fn set_user_stream(&mut self, stream: Arc<CudaStream>) {
        self.user = stream;
    }

    /// The current primary stream.
    #[must_use]
    pub fn user_stream(&self) -> &Arc<CudaStream> {
        &self.user
    }

    /// Number of auxiliary streams.
    #[must_use]
    pub fn num_internal(&self) -> usize {
        self.internal.len()
    }

    /// The `index`-th auxiliary stream.
    pub fn internal(&self, index: usize) -> Result<&Arc<CudaStream>> {
        self.internal
            .get(index)
            .ok_or(ResourceError::StreamIndexOutOfBounds {
                index,
                count: self.internal.len(),
            })
    }

    /// All auxiliary streams in creation order.
    #[must_use]
    pub fn internal_streams(&self) -> &[Arc<CudaStream>] {
        &self.internal
    }

    /// Block until all work enqueued on the primary stream has completed.
    pub fn wait_on_user_stream(&self) -> Result<()> {
        self.bind()?;
        self.user
            .synchronize()
            .map_err(|e| ResourceError::DeviceRuntime(format!("user stream sync failed: {e}")))
    }

    /// Block until every auxiliary stream has drained.
    pub fn wait_on_internal_streams(&self) -> Result<()> {
        self.bind()?;
        for stream in &self.internal {
            stream.synchronize().map_err(|e| {
                ResourceError::DeviceRuntime(format!("internal stream sync failed: {e}"))
            })?;
        }
        Ok(())
    }

    /// Make the primary stream wait for every auxiliary stream.
    ///
    /// Device-side only; the host is not blocked. Algorithms call this
    /// after fanning work out across the pool, so results are ordered on
    /// the primary stream before control returns to the caller.
    pub fn fence_user_on_internal(&self) -> Result<()> {
        self.bind()?;
        for stream in &self.internal {
            let fence = StreamFence::new()?;
            // Safety: both streams belong to this pool's context.
            unsafe {
                fence.record(stream.cu_stream())?;
                fence.make_stream_wait(self.user.cu_stream())?;
            }
        }
        Ok(())
    }

    /// Make every auxiliary stream wait for the primary stream.
    ///
    /// Used before pool streams consume results produced on the primary
    /// stream.
    pub fn fence_internal_on_user(&self) -> Result<()> {
        self.bind()?;
        let fence = StreamFence::new()?;
        // Safety: both streams belong to this pool's context.
        unsafe {
            fence.record(self.user.cu_stream())?;
            for stream in &self.internal {
                fence.make_stream_wait(stream.cu_stream())?;
            }
        }
        Ok(())
    }
}

impl Drop for StreamPool {
    fn drop(&mut self) {
        // Release auxiliary streams in reverse creation order.
        while self.internal.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> StreamPool {
        let ctx = CudaContext::new(0).expect("device 0 should exist");
        StreamPool::new(&ctx, n).expect("pool creation should succeed")
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_pool_count_and_bounds() {
        let pool = pool(4);
        assert_eq!(pool.num_internal(), 4);
        assert!(pool.internal(3).is_ok());
        assert!(matches!(
            pool.internal(4),
            Err(ResourceError::StreamIndexOutOfBounds { index: 4, count: 4 })
        ));
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_empty_pool_waits_do_not_deadlock() {
        let pool = pool(0);
        pool.wait_on_user_stream().unwrap();
        pool.wait_on_internal_streams().unwrap();
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_fences_with_idle_streams() {
        let pool = pool(2);
        pool.fence_internal_on_user().unwrap();
        pool.fence_user_on_internal().unwrap();
        pool.wait_on_user_stream().unwrap();
        pool.wait_on_internal_streams().unwrap();
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_fences_from_worker_thread() {
        // The pool is created on this thread; waits and fences must work
        // from a thread that never made the context current itself.
        let pool = pool(2);
        std::thread::spawn(move || {
            pool.fence_internal_on_user().unwrap();
            pool.fence_user_on_internal().unwrap();
            pool.wait_on_user_stream().unwrap();
            pool.wait_on_internal_streams().unwrap();
        })
        .join()
        .unwrap();
    }
}
