//! # rosbridge-client
//!
//! `rosbridge_client` lets an application exchange topic-based
//! publish/subscribe messages with a rosbridge server over a single,
//! self-healing WebSocket connection, using the rosbridge JSON protocol
//! (`subscribe`, `unsubscribe`, `advertise`, `unadvertise`, `publish`).
//!
//! ## Core Modules
//!
//! - `bridge`: the connection state machine, wire messages and the `Bridge` handle.
//! - `registry`: the topic → callback and topic → advertisement maps.
//! - `transport`: the WebSocket connection and its duplex I/O loop.
//! - `config`: loading connection and logging settings.
//! - `utils`: error types and logging sink construction.
//!
//! ## Example
//!
//! ```no_run
//! use rosbridge_client::{Bridge, BridgeSettings};
//!
//! # async fn run() -> rosbridge_client::Result<()> {
//! let bridge = Bridge::new(&BridgeSettings::default())?;
//! bridge.connect()?;
//! // Returns NotConnected until the socket is open, but the subscription
//! // is kept and declared to the broker as soon as it is.
//! let _ = bridge.subscribe("/chatter", "std_msgs/String", |msg| println!("{msg}"));
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod registry;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testutil;

pub use bridge::{Bridge, ConnectionState};
pub use config::{BridgeSettings, LoggingSettings, Settings, load_config};
pub use utils::error::{BridgeError, FrameError, Result};
