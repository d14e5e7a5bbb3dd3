//! rosbridge wire messages
//!
//! One JSON object per websocket frame, discriminated by its `op` field.
//! The client sends the five operations in `ClientMessage`; the only inbound
//! operation it understands is `publish`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::FrameError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        topic: String,
        #[serde(rename = "type")]
        message_type: String,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },
    #[serde(rename = "advertise")]
    Advertise {
        topic: String,
        #[serde(rename = "type")]
        message_type: String,
    },
    #[serde(rename = "unadvertise")]
    Unadvertise { topic: String },
    #[serde(rename = "publish")]
    Publish { topic: String, msg: PublishBody },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishBody {
    pub data: Value,
}

impl ClientMessage {
    pub fn topic(&self) -> &str {
        match self {
            ClientMessage::Subscribe { topic, .. }
            | ClientMessage::Unsubscribe { topic }
            | ClientMessage::Advertise { topic, .. }
            | ClientMessage::Unadvertise { topic }
            | ClientMessage::Publish { topic, .. } => topic,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::Unsubscribe { .. } => "unsubscribe",
            ClientMessage::Advertise { .. } => "advertise",
            ClientMessage::Unadvertise { .. } => "unadvertise",
            ClientMessage::Publish { .. } => "publish",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op")]
pub enum ServerMessage {
    #[serde(rename = "publish")]
    Publish { topic: String, msg: Value },
}

impl ServerMessage {
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_slice(frame)?;
        match value.get("op").and_then(Value::as_str) {
            Some("publish") => {}
            Some(op) => return Err(FrameError::UnsupportedOp(op.to_string())),
            None => return Err(FrameError::MissingField("op")),
        }
        Ok(serde_json::from_value(value)?)
    }
}
