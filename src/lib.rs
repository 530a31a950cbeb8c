//! # Toolflow
//!
//! Toolflow exposes a fixed catalog of external-service operations (SQL queries,
//! object storage, file transfer, workflow orchestrator, chat notifications)
//! to callers such as LLM agents through one uniform contract.
//!
//! ## Core Features
//!
//! - **Node Execution Framework**: a registry of handlers keyed by node type, with
//!   `{{name}}` variable resolution and a per-execution log
//! - **Tool Dispatch**: self-describing tools with JSON-schema parameters, invoked by name
//! - **Uniform Results**: every call returns `{"status": "success", ...}` or
//!   `{"status": "error", "message": "..."}`
//! - **Pluggable Collaborators**: credential store and service clients are traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use toolflow::{Config, Toolbox};
//!
//! let toolbox = Toolbox::builder().config(Config::from_file("toolflow.toml")?).build()?;
//!
//! let credentials = toolbox.invoke("list_credentials", json!({})).await;
//! let rows = toolbox.invoke("sql_query", json!({"query": "SELECT 1", "credentialId": 1})).await;
//! ```

mod builder;
pub mod clients;
mod common;
mod config;
mod error;
pub mod runtime;
pub mod store;
#[cfg(test)]
mod testing;
mod toolbox;
pub mod tools;
mod utils;
pub mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::ToolboxBuilder;
pub use common::Vars;
pub use config::{Config, CredentialSeed};
pub use error::ToolflowError;
pub use toolbox::{NodeOutcome, Toolbox};
pub use workflow::{Envelope, NodeConfig};

/// Result type alias for Toolflow operations.
pub type Result<T> = std::result::Result<T, ToolflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
