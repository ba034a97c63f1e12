//! Envelope wire shape wrapping success and error bodies.
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "listDevices succeeded",
//!   "command": "listDevices",
//!   "params": {"page": "0"},
//!   "payload": [...],
//!   "httpStatus": "OK"
//! }
//! ```

use indexmap::IndexMap;
use portico_core::Pojo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outer body shape used by endpoints with the envelope flag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Operation id.
    pub command: String,
    /// Echoed request parameters.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Individual error messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Spring status name, e.g. `NOT_FOUND`.
    pub http_status: String,
    /// The error and its causes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throwable: Option<Throwable>,
    /// Structured error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Pojo>,
}

impl Envelope {
    /// A successful envelope for `operation_id` carrying `payload`.
    pub fn success(operation_id: &str, payload: Option<Value>) -> Self {
        Self {
            success: true,
            message: format!("{operation_id} succeeded"),
            command: operation_id.to_string(),
            payload,
            ..Self::default()
        }
    }
}

/// Serialized error chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Throwable {
    /// Error message.
    pub message: String,
    /// The next error in the chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Throwable>>,
    /// Stack frames, when known.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<String>,
}

impl Throwable {
    /// Builds the chain from an error and its sources.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let messages: Vec<String> = err.chain().map(ToString::to_string).collect();
        messages
            .into_iter()
            .rev()
            .fold(None, |cause, message| {
                Some(Self {
                    message,
                    cause: cause.map(Box::new),
                    stack_trace: Vec::new(),
                })
            })
            .unwrap_or_default()
    }
}
