use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Result, ToolflowError,
    common::Vars,
    runtime::Context,
    workflow::{Envelope, NodeRegistry, actions::Action},
};

/// node id
pub type NodeId = String;

/// A node as configured by the caller: which handler to use and its data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// node id
    pub id: NodeId,
    /// registry key of the handler
    #[serde(rename = "type")]
    pub node_type: String,
    /// handler data, validated by the handler on construction
    #[serde(default)]
    pub data: Vars,
}

impl NodeConfig {
    pub fn new(
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        data: Vars,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data,
        }
    }
}

/// A configured node paired with its constructed handler.
pub struct Node {
    /// node id
    pub id: NodeId,
    /// registry key of the handler
    pub node_type: String,
    /// node action
    pub action: Box<dyn Action>,
}

impl Node {
    /// Resolves the handler for `config.node_type` and constructs it from `config.data`.
    pub fn new(
        config: &NodeConfig,
        registry: &NodeRegistry,
    ) -> Result<Self> {
        let factory = registry.resolve(&config.node_type).ok_or_else(|| ToolflowError::Unsupported(format!("unsupported node type '{}'", config.node_type)))?;
        let action = factory(config.data.clone().into())?;

        Ok(Self {
            id: config.id.clone(),
            node_type: config.node_type.clone(),
            action,
        })
    }

    pub async fn run(
        &self,
        ctx: Arc<Context>,
    ) -> Result<Envelope> {
        trace!("node::run({}, {}) in execution {}", self.node_type, self.id, ctx.execution_id());
        self.action.run(ctx, self.id.clone()).await
    }
}
