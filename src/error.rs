//! Error types for Toolflow.
//!
//! All errors in Toolflow are represented by the `ToolflowError` enum,
//! which provides specific variants for different error categories.
//! The tool-dispatch layer is the only place that turns them into an
//! error envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Toolflow operations.
///
/// Each variant represents a specific category of error that can occur
/// while building, resolving, or executing a node or a tool call.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum ToolflowError {
    /// A required field is missing or could not be resolved (no URL, no host, ...).
    #[error("{0}")]
    Config(String),

    /// The credential is absent or belongs to the wrong service family.
    #[error("{0}")]
    Credential(String),

    /// Unknown node type, tool, or operation name.
    #[error("{0}")]
    Unsupported(String),

    /// The external service call itself failed.
    #[error("{0}")]
    Collaborator(String),

    /// A request or node definition does not satisfy its declared schema.
    #[error("{0}")]
    Validation(String),

    /// Node registry errors (duplicate registration).
    #[error("{0}")]
    Registry(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Credential store errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<std::io::Error> for ToolflowError {
    fn from(error: std::io::Error) -> Self {
        ToolflowError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for ToolflowError {
    fn from(error: serde_json::Error) -> Self {
        ToolflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for ToolflowError {
    fn from(error: toml::de::Error) -> Self {
        ToolflowError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for ToolflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        ToolflowError::Validation(error.to_string())
    }
}
