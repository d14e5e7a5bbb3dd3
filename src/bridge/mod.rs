//! The `bridge` module is the client proper: the connection state machine,
//! the rosbridge wire messages, and the `Bridge` handle that ties the
//! registry to the transport.
//!
//! Outbound calls update the registry, encode a frame and hand it to the
//! transport. Inbound frames are decoded and routed to the callback
//! registered for their topic.

#[allow(clippy::module_inception)]
pub mod bridge;
pub mod message;
pub mod state;

pub use bridge::Bridge;
pub use message::{ClientMessage, PublishBody, ServerMessage};
pub use state::{ConnectionState, Event};
