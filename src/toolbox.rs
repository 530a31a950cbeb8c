//! Toolbox - the main entry point for Toolflow.
//!
//! The toolbox owns the tool table, the node registry, the credential store
//! and the collaborator clients, and exposes:
//! - Tool listing and invocation
//! - Direct node execution with the execution log

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use futures::FutureExt;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    Result, ToolflowError,
    common::Vars,
    runtime::LogEntry,
    tools::{SYSTEM_INSTRUCTIONS, Services, ToolDescriptor, ToolRegistry},
    workflow::{Envelope, NodeConfig, NodeRegistry},
};

/// Envelope of a node execution together with everything it logged.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub envelope: Envelope,
    pub logs: Vec<LogEntry>,
}

/// Uniform access to the external-service tools.
///
/// # Example
///
/// ```rust,ignore
/// let toolbox = Toolbox::builder().config(Config::from_file("toolflow.toml")?).build()?;
///
/// for tool in toolbox.list_tools() {
///     println!("{}: {}", tool.name, tool.description);
/// }
///
/// let envelope = toolbox.invoke("sql_query", json!({"query": "SELECT 1"})).await;
/// ```
pub struct Toolbox {
    /// Services handed to every tool call.
    services: Services,
    /// Callable tools in definition order.
    tools: ToolRegistry,
}

impl Toolbox {
    pub fn builder() -> crate::ToolboxBuilder {
        crate::ToolboxBuilder::new()
    }

    pub(crate) fn new(
        services: Services,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            services,
            tools,
        }
    }

    /// Descriptors of every tool, in definition order. Invokes nothing.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.descriptors()
    }

    pub fn system_instructions(&self) -> &'static str {
        SYSTEM_INSTRUCTIONS
    }

    pub fn node_registry(&self) -> Arc<NodeRegistry> {
        self.services.nodes.clone()
    }

    /// Invokes tool `name` with `request`.
    ///
    /// Never fails: errors, and panics raised inside the tool, come back as
    /// an error envelope.
    pub async fn invoke(
        &self,
        name: &str,
        request: Value,
    ) -> Envelope {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.tools.dispatch(&self.services, name, request)).catch_unwind().await;
        let result = outcome.unwrap_or_else(|panic| Err(ToolflowError::Collaborator(format!("tool '{}' panicked: {}", name, panic_message(panic.as_ref())))));

        let elapsed = start.elapsed().as_millis();
        match &result {
            Ok(_) => info!(tool = name, elapsed_ms = elapsed as u64, "tool call succeeded"),
            Err(err) => warn!(tool = name, elapsed_ms = elapsed as u64, "tool call failed: {}", err),
        }
        Envelope::from_result(result)
    }

    /// Runs one node with `vars` as its variables and returns its envelope and logs.
    pub async fn run_node(
        &self,
        config: &NodeConfig,
        vars: Vars,
    ) -> NodeOutcome {
        let ctx = self.services.context(vars);
        let logs = ctx.logs();
        let result: Result<Envelope> = AssertUnwindSafe(self.services.run_node(config, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolflowError::Collaborator(format!("node '{}' panicked: {}", config.id, panic_message(panic.as_ref())))));

        NodeOutcome {
            envelope: Envelope::from_result(result),
            logs: logs.entries(),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
