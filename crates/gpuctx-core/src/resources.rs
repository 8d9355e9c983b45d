//! The resource-context capability interface.
//!
//! Algorithms take one `&impl Resources` (or a concrete backend context)
//! and obtain everything they need from it: device identity and
//! properties, the primary and auxiliary streams, the allocators and the
//! communicator. This is the only parameter algorithms depend on for
//! device access; no global or implicit device state exists.
//!
//! # Concurrency
//!
//! Accessor calls are safe from multiple threads once no mutator is
//! active. Mutators (`set_stream`, allocator and communicator injection)
//! are inherent `&mut self` methods on the concrete contexts, so the
//! borrow checker enforces that no reader observes a slot mid-swap.
//! Callers remain responsible for not swapping while device work that
//! depends on the old value is still in flight.

use std::sync::Arc;

use crate::alloc::{DeviceAllocator, HostAllocator};
use crate::comms::Communicator;
use crate::device::DeviceProperties;
use crate::error::Result;

/// Capability interface presented by every resource context.
///
/// `wait_on_user_stream` and `wait_on_internal_streams` are the only
/// operations that block the calling thread; everything else is a
/// side-effect-free accessor. Cross-stream ordering is the algorithm's
/// responsibility, established with the backend's fencing primitives.
pub trait Resources {
    /// Backend execution-stream handle.
    type Stream: Clone;

    /// Ordinal of the device this context is bound to.
    fn device(&self) -> usize;

    /// Cached device-property snapshot, queried once at construction.
    fn device_properties(&self) -> &DeviceProperties;

    /// The primary (user) stream all library handles are bound to.
    fn stream(&self) -> &Self::Stream;

    /// Number of auxiliary streams, fixed at construction.
    fn num_internal_streams(&self) -> usize;

    /// The `index`-th auxiliary stream.
    ///
    /// Fails with [`ResourceError::StreamIndexOutOfBounds`] when `index`
    /// is not below [`num_internal_streams`].
    ///
    /// [`ResourceError::StreamIndexOutOfBounds`]: crate::error::ResourceError::StreamIndexOutOfBounds
    /// [`num_internal_streams`]: Resources::num_internal_streams
    fn internal_stream(&self, index: usize) -> Result<&Self::Stream>;

    /// All auxiliary streams in creation order, stable across calls.
    fn internal_streams(&self) -> &[Self::Stream];

    /// Block until all work enqueued on the primary stream has completed.
    fn wait_on_user_stream(&self) -> Result<()>;

    /// Block until every auxiliary stream has drained.
    fn wait_on_internal_streams(&self) -> Result<()>;

    /// The device allocator. Never absent; a default is installed at
    /// construction when none is injected.
    fn device_allocator(&self) -> Arc<dyn DeviceAllocator>;

    /// The host allocator. Never absent.
    fn host_allocator(&self) -> Arc<dyn HostAllocator>;

    /// The injected communicator.
    ///
    /// Fails with [`ResourceError::CommsNotInitialized`] when none has
    /// been injected; code paths that tolerate absence should probe
    /// [`comms_initialized`] first.
    ///
    /// [`ResourceError::CommsNotInitialized`]: crate::error::ResourceError::CommsNotInitialized
    /// [`comms_initialized`]: Resources::comms_initialized
    fn communicator(&self) -> Result<Arc<dyn Communicator>>;

    /// Whether a communicator has been injected. Never fails.
    fn comms_initialized(&self) -> bool;
}
