//! Inbound push-channel payloads, decoded at the channel boundary.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A decoded channel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Structured progress report for one step.
    Status(StatusMessage),
    /// Bare text: the finished document.
    Deliverable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    /// Step id as sent by the workflow; may not name a known step.
    pub step: String,
    pub status: ReportedStatus,
    pub data: Option<Value>,
    pub run_id: Option<String>,
}

/// Status field of a structured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Active,
    Completed,
    Error,
    Other(String),
}

impl ReportedStatus {
    fn from_wire(status: String) -> Self {
        match status.as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Other(status),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unrecognized payload shape: {0}")]
    UnrecognizedShape(&'static str),
}

#[derive(Deserialize)]
struct WireStatus {
    step: String,
    status: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default, rename = "runId")]
    run_id: Option<String>,
}

impl InboundMessage {
    /// Decode a payload. Anything that is neither a `{step, status}` object
    /// nor a JSON string is refused.
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(text) => Ok(Self::Deliverable(text)),
            Value::Object(map) if map.contains_key("step") && map.contains_key("status") => {
                let wire: WireStatus = serde_json::from_value(Value::Object(map))?;
                Ok(Self::Status(StatusMessage {
                    step: wire.step,
                    status: ReportedStatus::from_wire(wire.status),
                    data: wire.data,
                    run_id: wire.run_id,
                }))
            }
            Value::Object(_) => Err(DecodeError::UnrecognizedShape(
                "object without step/status fields",
            )),
            Value::Array(_) => Err(DecodeError::UnrecognizedShape("array")),
            Value::Number(_) => Err(DecodeError::UnrecognizedShape("number")),
            Value::Bool(_) => Err(DecodeError::UnrecognizedShape("boolean")),
            Value::Null => Err(DecodeError::UnrecognizedShape("null")),
        }
    }

    /// Decode raw JSON text.
    pub fn decode_str(raw: &str) -> Result<Self, DecodeError> {
        Self::decode(serde_json::from_str(raw)?)
    }
}
