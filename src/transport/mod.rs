//! The `transport` module owns the network side of the client: a single
//! websocket connection to the broker at a time.
//!
//! It has no knowledge of the JSON protocol. Inbound frames and lifecycle
//! changes are reported through the `TransportHandler` hooks; the bridge
//! decides what they mean.

pub mod websocket;

pub use websocket::{TransportHandler, WsTransport};
