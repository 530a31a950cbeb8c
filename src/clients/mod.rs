//! Collaborator boundaries.
//!
//! Every external service is reached through a small async trait so that the
//! node handlers and tools never depend on a concrete SDK:
//!
//! - [`SqlClient`]: relational queries, backed by `sqlx` ([`PgSqlClient`])
//! - [`WebhookClient`]: chat webhooks, backed by `reqwest` ([`HttpWebhookClient`])
//! - [`Orchestrator`]: workflow orchestrator REST API, backed by `reqwest` ([`AirflowClient`])
//! - [`ObjectStorage`] and [`FileTransfer`]: provided by the embedding application
//!
//! Clients report failures as [`ClientError`], whose variants carry the
//! structured signals the core needs (`NotFound`, `NoResultSet`) instead of
//! leaving callers to match on error text.

pub mod airflow;
pub mod sql;
pub mod storage;
pub mod transfer;
pub mod webhook;

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{Config, Result, ToolflowError};

pub use airflow::{AirflowClient, AirflowConnection, AirflowRequest, Orchestrator};
pub use sql::{PgSqlClient, SqlClient, SqlConnection, SqlDialect, SqlTarget, classify_sql_error};
pub use storage::{ObjectStorage, StorageConnection, StorageRequest};
pub use transfer::{FileTransfer, TransferConnection, TransferRequest, TransferSession};
pub use webhook::{HttpWebhookClient, WebhookClient};

/// Failure reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The statement completed but produced no result set.
    #[error("statement returned no result set")]
    NoResultSet,

    /// Any other failure (network, auth, malformed request).
    #[error("{0}")]
    Failed(String),
}

impl From<ClientError> for ToolflowError {
    fn from(error: ClientError) -> Self {
        ToolflowError::Collaborator(error.to_string())
    }
}

/// The set of collaborator clients available to handlers and tools.
#[derive(Clone)]
pub struct Clients {
    sql: Arc<dyn SqlClient>,
    webhook: Arc<dyn WebhookClient>,
    orchestrator: Arc<dyn Orchestrator>,
    storage: Option<Arc<dyn ObjectStorage>>,
    transfer: Option<Arc<dyn FileTransfer>>,
}

impl Clients {
    pub fn new(
        sql: Arc<dyn SqlClient>,
        webhook: Arc<dyn WebhookClient>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self {
            sql,
            webhook,
            orchestrator,
            storage: None,
            transfer: None,
        }
    }

    /// Builds the shipped clients (`sqlx` and `reqwest` based) from the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http_timeout = Duration::from_millis(config.http_timeout_ms);
        let sql = PgSqlClient::new(config.internal_database_url.as_deref(), Duration::from_millis(config.sql_connect_timeout_ms))?;
        let webhook = HttpWebhookClient::new(http_timeout)?;
        let orchestrator = AirflowClient::new(http_timeout)?;

        Ok(Self::new(Arc::new(sql), Arc::new(webhook), Arc::new(orchestrator)))
    }

    pub fn with_sql(
        mut self,
        sql: Arc<dyn SqlClient>,
    ) -> Self {
        self.sql = sql;
        self
    }

    pub fn with_webhook(
        mut self,
        webhook: Arc<dyn WebhookClient>,
    ) -> Self {
        self.webhook = webhook;
        self
    }

    pub fn with_orchestrator(
        mut self,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_storage(
        mut self,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_transfer(
        mut self,
        transfer: Arc<dyn FileTransfer>,
    ) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn sql(&self) -> Arc<dyn SqlClient> {
        self.sql.clone()
    }

    pub fn webhook(&self) -> Arc<dyn WebhookClient> {
        self.webhook.clone()
    }

    pub fn orchestrator(&self) -> Arc<dyn Orchestrator> {
        self.orchestrator.clone()
    }

    pub fn storage(&self) -> Result<Arc<dyn ObjectStorage>> {
        self.storage.clone().ok_or_else(|| ToolflowError::Config("no object storage client is configured".to_string()))
    }

    pub fn transfer(&self) -> Result<Arc<dyn FileTransfer>> {
        self.transfer.clone().ok_or_else(|| ToolflowError::Config("no file transfer client is configured".to_string()))
    }
}
