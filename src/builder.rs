use std::sync::Arc;

use tracing::debug;

use crate::{
    Config, Result, Toolbox,
    clients::Clients,
    store::{CredentialStore, MemStore},
    tools::{Services, ToolRegistry},
    workflow::NodeRegistry,
};

/// Assembles a [`Toolbox`].
///
/// Anything left unset is derived from the config: the credential store is a
/// [`MemStore`] seeded with `config.credentials`, the clients are the shipped
/// `sqlx`/`reqwest` ones and the tool table is [`ToolRegistry::builtin`].
#[derive(Default)]
pub struct ToolboxBuilder {
    config: Config,
    credentials: Option<Arc<dyn CredentialStore>>,
    clients: Option<Clients>,
    nodes: Option<Arc<NodeRegistry>>,
    tools: Option<ToolRegistry>,
}

impl ToolboxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn credentials(
        mut self,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn clients(
        mut self,
        clients: Clients,
    ) -> Self {
        self.clients = Some(clients);
        self
    }

    /// Uses `nodes` instead of a fresh registry, e.g. one with extra node types registered.
    pub fn node_registry(
        mut self,
        nodes: Arc<NodeRegistry>,
    ) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn tools(
        mut self,
        tools: ToolRegistry,
    ) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn build(self) -> Result<Toolbox> {
        let credentials: Arc<dyn CredentialStore> = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(MemStore::from_seeds(&self.config.credentials)?),
        };
        let clients = match self.clients {
            Some(clients) => clients,
            None => Clients::from_config(&self.config)?,
        };
        let nodes = self.nodes.unwrap_or_default();
        nodes.discover();
        let tools = match self.tools {
            Some(tools) => tools,
            None => ToolRegistry::builtin()?,
        };
        debug!("toolbox_builder::build() with {} tools and node types {:?}", tools.descriptors().len(), nodes.types());

        let services = Services {
            config: Arc::new(self.config),
            credentials,
            clients,
            nodes,
        };
        Ok(Toolbox::new(services, tools))
    }
}
