//! The `error` module defines the error types used by the bridge.
//!
//! `BridgeError` is what the public surface returns. `FrameError` describes
//! why an inbound frame was discarded; it is only ever logged, never returned
//! to the application.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// A send was attempted while the connection is not in the Connected state.
    #[error("not connected to the broker")]
    NotConnected,

    /// The dial did not complete within the configured connect timeout.
    #[error("connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Underlying websocket I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bridge was built outside a tokio runtime.
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Reasons an inbound frame is rejected by the dispatcher.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported op `{0}`")]
    UnsupportedOp(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
