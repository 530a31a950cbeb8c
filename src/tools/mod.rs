//! Tool-dispatch layer.
//!
//! Every tool is a self-describing callable: a [`ToolDescriptor`] (name,
//! description, JSON schema of its parameters) plus an async body. Tools are
//! defined in an explicit table ([`ToolRegistry::builtin`]); each request is
//! checked against the declared operation list and schema before the body runs.

mod airflow;
mod s3;
mod sftp;
mod sql;
mod system;

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::trace;
use uuid::Uuid;

use crate::{
    Config, Result, ToolflowError,
    clients::Clients,
    common::Vars,
    runtime::Context,
    store::{self, Credential, CredentialFamily, CredentialId, CredentialStore},
    workflow::{Envelope, Node, NodeConfig, NodeRegistry},
};

pub use airflow::{AirflowCheckTool, AirflowOperation};
pub use s3::{S3Operation, S3OperationTool};
pub use sftp::{SftpOperation, SftpOperationTool};
pub use sql::{InspectOperation, SqlInspectTool, SqlQueryTool};
pub use system::{ListCredentialsTool, SYSTEM_INSTRUCTIONS, SystemInstructionsTool};

const OPERATION_KEY: &str = "operation";
const CREDENTIAL_ID_KEY: &str = "credentialId";
const RESULT_KEY: &str = "result";

/// Name, description and parameter schema of a tool.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Everything a tool body can reach.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialStore>,
    pub clients: Clients,
    pub nodes: Arc<NodeRegistry>,
}

impl Services {
    /// Loads credential `id` and checks its family, see [`store::lookup_credential`].
    pub fn credential(
        &self,
        id: CredentialId,
        family: CredentialFamily,
    ) -> Result<Credential> {
        store::lookup_credential(self.credentials.as_ref(), id, family)
    }

    /// A fresh execution context with its own id and log sequence.
    pub fn context(
        &self,
        vars: Vars,
    ) -> Arc<Context> {
        let ctx = Context::new(Uuid::new_v4().to_string(), self.credentials.clone(), self.clients.clone()).with_vars(vars);
        Arc::new(ctx)
    }

    /// Resolves, constructs and runs one node.
    pub async fn run_node(
        &self,
        config: &NodeConfig,
        ctx: Arc<Context>,
    ) -> Result<Envelope> {
        let node = Node::new(config, &self.nodes)?;
        node.run(ctx).await
    }

    /// Routes a synthesized `sql_query` node through the node registry.
    pub async fn run_sql(
        &self,
        tool: &str,
        data: Vars,
    ) -> Result<Envelope> {
        let config = NodeConfig::new(format!("mcp_{}", tool), "sql_query", data);
        self.run_node(&config, self.context(Vars::new())).await
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the descriptor of the tool. Built once, when the tool is defined.
    fn descriptor() -> ToolDescriptor
    where
        Self: Sized;

    /// Executes the tool with a request that already satisfies its schema.
    async fn call(
        &self,
        services: &Services,
        request: Vars,
    ) -> Result<Envelope>;
}

struct DefinedTool {
    descriptor: ToolDescriptor,
    validator: jsonschema::Validator,
    operations: Option<Vec<String>>,
    tool: Box<dyn Tool>,
}

/// Explicit table of callable tools, in definition order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<DefinedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped tool catalog.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.define(SystemInstructionsTool)?;
        registry.define(ListCredentialsTool)?;
        registry.define(SqlQueryTool)?;
        registry.define(SqlInspectTool)?;
        registry.define(AirflowCheckTool)?;
        registry.define(S3OperationTool)?;
        registry.define(SftpOperationTool)?;
        Ok(registry)
    }

    /// Adds `tool` to the table. Fails on a duplicate name or an invalid parameter schema.
    pub fn define<T: Tool + 'static>(
        &mut self,
        tool: T,
    ) -> Result<()> {
        let descriptor = T::descriptor();
        if self.get(&descriptor.name).is_some() {
            return Err(ToolflowError::Registry(format!("tool '{}' is already defined", descriptor.name)));
        }

        let validator = jsonschema::validator_for(&descriptor.parameters)?;
        let operations = descriptor.parameters.pointer("/properties/operation/enum").and_then(Value::as_array).map(|names| {
            names.iter().filter_map(Value::as_str).map(str::to_string).collect()
        });

        trace!("tool_registry::define({})", descriptor.name);
        self.tools.push(DefinedTool {
            descriptor,
            validator,
            operations,
            tool: Box::new(tool),
        });
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|defined| defined.descriptor.clone()).collect()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&ToolDescriptor> {
        self.find(name).map(|defined| &defined.descriptor)
    }

    fn find(
        &self,
        name: &str,
    ) -> Option<&DefinedTool> {
        self.tools.iter().find(|defined| defined.descriptor.name == name)
    }

    /// Checks `request` against the tool's declared operations and schema, then calls it.
    pub async fn dispatch(
        &self,
        services: &Services,
        name: &str,
        request: Value,
    ) -> Result<Envelope> {
        let defined = self.find(name).ok_or_else(|| ToolflowError::Unsupported(format!("unsupported tool '{}'", name)))?;
        if !request.is_object() {
            return Err(ToolflowError::Validation(format!("request of tool '{}' must be a JSON object", name)));
        }

        if let (Some(operations), Some(operation)) = (&defined.operations, request.get(OPERATION_KEY).and_then(Value::as_str)) {
            if !operations.iter().any(|op| op == operation) {
                return Err(unsupported_operation(operation));
            }
        }

        let errors: Vec<String> = defined.validator.iter_errors(&request).map(|err| err.to_string()).collect();
        if !errors.is_empty() {
            return Err(ToolflowError::Validation(format!("invalid request for tool '{}': {}", name, errors.join("; "))));
        }

        defined.tool.call(services, Vars::from(request)).await
    }
}

fn unsupported_operation(operation: &str) -> ToolflowError {
    ToolflowError::Unsupported(format!("unsupported operation '{}'", operation))
}

/// Snake-case names of every operation of `T`, for descriptor enums.
pub(crate) fn operation_names<T: IntoEnumIterator + Into<&'static str>>() -> Vec<&'static str> {
    T::iter().map(Into::into).collect()
}

/// Parses the request's `operation` into `T`.
pub(crate) fn parse_operation<T: FromStr>(request: &Vars) -> Result<T> {
    let operation = request.get_str(OPERATION_KEY).unwrap_or_default();
    operation.parse().map_err(|_| unsupported_operation(operation))
}

/// The request's required `credentialId`.
pub(crate) fn credential_id(request: &Vars) -> Result<CredentialId> {
    store::parse_credential_id(request.lookup(CREDENTIAL_ID_KEY))?.ok_or_else(|| ToolflowError::Config("'credentialId' is required".to_string()))
}

/// A non-empty string argument the operation cannot run without.
pub(crate) fn required_str<'a>(
    request: &'a Vars,
    key: &str,
    operation: &str,
) -> Result<&'a str> {
    optional_str(request, key).ok_or_else(|| ToolflowError::Config(format!("'{}' is required for operation '{}'", key, operation)))
}

pub(crate) fn optional_str<'a>(
    request: &'a Vars,
    key: &str,
) -> Option<&'a str> {
    request.get_str(key).filter(|s| !s.is_empty())
}

/// Wraps a raw collaborator result; an empty result is a bare success.
pub(crate) fn wrap_result(value: Value) -> Envelope {
    match value {
        Value::Null => Envelope::ok(),
        value => Envelope::success(Vars::new().with(RESULT_KEY, value)),
    }
}
