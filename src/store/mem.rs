use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicI64, Ordering},
    },
};

use tracing::trace;

use crate::{
    Result, ShareLock,
    common::Vars,
    config::CredentialSeed,
    utils,
};

use super::{Credential, CredentialId, CredentialStore, CredentialType, map_store_err};

/// In-memory credential store.
#[derive(Debug, Clone)]
pub struct MemStore {
    credentials: ShareLock<BTreeMap<CredentialId, Credential>>,
    next_id: Arc<AtomicI64>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            credentials: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Creates a store holding the credentials declared in the config file.
    pub fn from_seeds(seeds: &[CredentialSeed]) -> Result<Self> {
        let store = Self::new();
        for seed in seeds {
            store.insert(&seed.name, seed.credential_type, seed.data.clone())?;
        }
        Ok(store)
    }

    /// Stores a new credential and returns it with its assigned id.
    pub fn insert(
        &self,
        name: &str,
        credential_type: CredentialType,
        data: Vars,
    ) -> Result<Credential> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("mem_store::insert({}, {})", id, credential_type);
        let credential = Credential {
            id,
            name: name.to_string(),
            credential_type,
            data,
            created_at: utils::time::now(),
        };
        self.credentials.write().map_err(map_store_err)?.insert(id, credential.clone());
        Ok(credential)
    }

    pub fn remove(
        &self,
        id: CredentialId,
    ) -> Result<bool> {
        Ok(self.credentials.write().map_err(map_store_err)?.remove(&id).is_some())
    }
}

impl CredentialStore for MemStore {
    fn get_credential(
        &self,
        id: CredentialId,
    ) -> Result<Option<Credential>> {
        trace!("mem_store::get_credential({})", id);
        Ok(self.credentials.read().map_err(map_store_err)?.get(&id).cloned())
    }

    fn get_credentials(&self) -> Result<Vec<Credential>> {
        Ok(self.credentials.read().map_err(map_store_err)?.values().cloned().collect())
    }
}
