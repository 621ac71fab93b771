//! Request/response envelopes and their textual encoding.
//!
//! Every exchange on the wire is one JSON object per direction:
//! - request: `{"cmd": <operation name>, "payload": <operation object>}`
//! - response: `{"ok": <bool>, "payload": <operation object, omitted on failure>}`
//!
//! The envelope layer knows nothing about individual operations; typed
//! payloads live in [`crate::commands`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Faults at the envelope layer.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("request encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("message decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One outbound command envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub cmd: String,
    pub payload: Value,
}

impl Request {
    pub fn new(cmd: impl Into<String>, payload: Value) -> Self {
        Self {
            cmd: cmd.into(),
            payload,
        }
    }

    /// Encodes the request to its wire text.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }

    /// Decodes a request from raw wire bytes (server side).
    pub fn from_json(raw: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(raw).map_err(WireError::Decode)
    }
}

/// One inbound reply envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Response {
    /// A successful reply carrying a payload.
    pub fn success(payload: Value) -> Self {
        Self {
            ok: true,
            payload: Some(payload),
        }
    }

    /// A successful reply without payload (acknowledgement only).
    pub fn ack() -> Self {
        Self {
            ok: true,
            payload: None,
        }
    }

    /// A rejection; the payload is omitted.
    pub fn failure() -> Self {
        Self {
            ok: false,
            payload: None,
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }

    /// Decodes a response from raw wire bytes.
    pub fn from_json(raw: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(raw).map_err(WireError::Decode)
    }
}
