//! # gpuctx-core
//!
//! Backend-neutral contract for per-session GPU execution contexts.
//!
//! A resource context owns the computational resources numerical
//! algorithms need on an accelerator: the device binding, a primary
//! execution stream plus a fixed pool of auxiliary streams, vendor
//! math-library handles, a device and a host allocator, and an optional
//! distributed communicator. The algorithms themselves carry no
//! device state. This crate defines that contract:
//!
//! - [`Resources`] - the capability interface algorithms consume
//! - [`DeviceAllocator`] / [`HostAllocator`] - injectable allocation capabilities
//! - [`Communicator`] - injectable collective-communication capability
//! - [`ResourceError`] - the error taxonomy shared by all backends
//! - [`NullResources`] - a no-op backend for tests and host-only runs
//!
//! Concrete accelerator backends (e.g. the CUDA backend in
//! `gpuctx-cuda`) implement [`Resources`] over real streams and vendor
//! handles.
//!
//! ## Example
//!
//! ```
//! use gpuctx_core::prelude::*;
//!
//! fn algorithm<R: Resources>(res: &R) -> Result<()> {
//!     let _props = res.device_properties();
//!     for i in 0..res.num_internal_streams() {
//!         let _stream = res.internal_stream(i)?;
//!     }
//!     res.wait_on_internal_streams()
//! }
//!
//! let ctx = NullResources::new(&ResourceConfig::concurrent(2));
//! algorithm(&ctx).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod alloc;
pub mod comms;
pub mod config;
pub mod device;
pub mod error;
pub mod null;
pub mod resources;

pub use alloc::{DeviceAllocator, HostAllocator, SystemDeviceAllocator, SystemHostAllocator};
pub use comms::{Communicator, LocalCommunicator, ReduceOp, SharedCommunicator};
pub use config::{ResourceConfig, DEFAULT_NUM_INTERNAL_STREAMS};
pub use device::DeviceProperties;
pub use error::{ResourceError, Result};
pub use null::{NullLibHandle, NullResources, NullStream};
pub use resources::Resources;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::alloc::{
        DeviceAllocator, HostAllocator, SystemDeviceAllocator, SystemHostAllocator,
    };
    pub use crate::comms::{Communicator, LocalCommunicator, ReduceOp, SharedCommunicator};
    pub use crate::config::{ResourceConfig, DEFAULT_NUM_INTERNAL_STREAMS};
    pub use crate::device::DeviceProperties;
    pub use crate::error::{ResourceError, Result};
    pub use crate::null::{NullLibHandle, NullResources, NullStream};
    pub use crate::resources::Resources;
}
