use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    Result,
    clients::Clients,
    common::Vars,
    store::{self, Credential, CredentialFamily, CredentialId, CredentialStore},
};

use super::{LogLevel, Logs};

/// execution id
pub type ExecutionId = String;

/// Everything one node execution can see: its variables, the log side
/// channel, the credential store and the collaborator clients.
#[derive(Clone)]
pub struct Context {
    execution_id: ExecutionId,
    vars: Arc<Vars>,
    logs: Logs,
    credentials: Arc<dyn CredentialStore>,
    clients: Clients,
}

impl Context {
    pub fn new(
        execution_id: ExecutionId,
        credentials: Arc<dyn CredentialStore>,
        clients: Clients,
    ) -> Self {
        Self {
            execution_id,
            vars: Arc::new(Vars::new()),
            logs: Logs::new(),
            credentials,
            clients,
        }
    }

    /// Sets the variables available for placeholder substitution.
    pub fn with_vars(
        mut self,
        vars: Vars,
    ) -> Self {
        self.vars = Arc::new(vars);
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn logs(&self) -> Logs {
        self.logs.clone()
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Loads a credential of the given family, see [`store::lookup_credential`].
    pub fn credential(
        &self,
        id: CredentialId,
        family: CredentialFamily,
    ) -> Result<Credential> {
        store::lookup_credential(self.credentials.as_ref(), id, family)
    }

    /// Appends to the execution log and mirrors the entry to `tracing`.
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!(execution_id = %self.execution_id, "{}", message),
            LogLevel::Info => info!(execution_id = %self.execution_id, "{}", message),
            LogLevel::Warn => warn!(execution_id = %self.execution_id, "{}", message),
            LogLevel::Error => error!(execution_id = %self.execution_id, "{}", message),
        }
        self.logs.append(level, message);
    }
}
