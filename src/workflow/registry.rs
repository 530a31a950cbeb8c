use std::{
    collections::HashMap,
    sync::{Once, RwLock},
};

use tracing::{debug, trace, warn};

use crate::{
    Result, ToolflowError,
    workflow::actions::{self, ActionFactory},
};

/// Mapping from node type name to the factory building its handler.
///
/// Built-in handlers are loaded lazily by [`NodeRegistry::discover`], exactly
/// once per registry. Explicit registrations may happen before or after
/// discovery; a name can only be registered once.
pub struct NodeRegistry {
    factories: RwLock<HashMap<String, ActionFactory>>,
    discovered: Once,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            discovered: Once::new(),
        }
    }

    /// Registers `factory` under `type_name`. Fails if the name is taken.
    pub fn register(
        &self,
        type_name: &str,
        factory: ActionFactory,
    ) -> Result<()> {
        trace!("node_registry::register({})", type_name);
        let mut factories = self.factories.write().map_err(|err| ToolflowError::Registry(err.to_string()))?;
        if factories.contains_key(type_name) {
            return Err(ToolflowError::Registry(format!("node type '{}' is already registered", type_name)));
        }
        factories.insert(type_name.to_string(), factory);
        Ok(())
    }

    /// Loads the built-in handlers. Only the first call does any work.
    pub fn discover(&self) {
        self.discovered.call_once(|| {
            for (action_type, factory) in actions::builtin_actions() {
                if let Err(err) = self.register(action_type.as_ref(), factory) {
                    warn!("skipping built-in node type '{}': {}", action_type, err);
                }
            }
            debug!("node_registry::discover() loaded {} node types", self.types().len());
        });
    }

    /// Returns the factory for `type_name`, discovering built-ins first if needed.
    pub fn resolve(
        &self,
        type_name: &str,
    ) -> Option<ActionFactory> {
        self.discover();
        self.factories.read().ok()?.get(type_name).copied()
    }

    /// Registered type names, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().map(|factories| factories.keys().cloned().collect()).unwrap_or_default();
        names.sort();
        names
    }
}
