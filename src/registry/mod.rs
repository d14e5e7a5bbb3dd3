//! The `registry` module tracks which topics this client consumes and which
//! it publishes on.
//!
//! It is a pure in-memory structure with no I/O; the bridge owns one and
//! reads it on every inbound publish and on every reconnect.

#[allow(clippy::module_inception)]
pub mod registry;

pub use registry::{Advertisement, Callback, Registry, Subscription};
