use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, common::Vars};

const STATUS_KEY: &str = "status";

/// The single return shape of every handler and every tool.
///
/// Serializes as `{"status": "success", ...payload}` or
/// `{"status": "error", "message": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    Success(Vars),
    Error {
        message: String,
    },
}

impl Envelope {
    /// Create a success envelope carrying `payload`. A `status` key in the payload is dropped.
    pub fn success(mut payload: Vars) -> Self {
        payload.remove(STATUS_KEY);
        Envelope::Success(payload)
    }

    /// Create a success envelope with no payload.
    pub fn ok() -> Self {
        Envelope::Success(Vars::new())
    }

    /// Create an error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            message: message.into(),
        }
    }

    /// Collapse a fallible outcome into an envelope.
    pub fn from_result(result: Result<Envelope>) -> Self {
        match result {
            Ok(envelope) => envelope,
            Err(err) => Envelope::error(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// Payload of a success envelope.
    pub fn payload(&self) -> Option<&Vars> {
        match self {
            Envelope::Success(payload) => Some(payload),
            Envelope::Error {
                ..
            } => None,
        }
    }

    /// Message of an error envelope.
    pub fn message(&self) -> Option<&str> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Error {
                message,
            } => Some(message),
        }
    }

    pub fn into_value(self) -> Value {
        let mut map = serde_json::Map::new();
        match self {
            Envelope::Success(payload) => {
                if let Value::Object(fields) = Value::from(payload) {
                    map.extend(fields);
                }
                map.insert(STATUS_KEY.to_string(), Value::from("success"));
            }
            Envelope::Error {
                message,
            } => {
                map.insert(STATUS_KEY.to_string(), Value::from("error"));
                map.insert("message".to_string(), Value::from(message));
            }
        }
        Value::Object(map)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.into_value()
    }
}
