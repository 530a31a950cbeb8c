//! Credential storage.
//!
//! The core only ever reads credentials. The store is consumed through the
//! [`CredentialStore`] trait so the embedding application can plug in its own
//! persistence; [`MemStore`] is the in-memory implementation used by default
//! and in tests.

pub mod data;
mod mem;

use std::error::Error;

use serde_json::Value;

use crate::{Result, ToolflowError};

pub use data::*;
pub use mem::MemStore;

/// Maps storage errors to ToolflowError.
fn map_store_err(err: impl Error) -> ToolflowError {
    ToolflowError::Store(err.to_string())
}

/// Read access to stored credentials.
pub trait CredentialStore: Send + Sync {
    /// Finds a credential by id. Returns `Ok(None)` when it does not exist.
    fn get_credential(
        &self,
        id: CredentialId,
    ) -> Result<Option<Credential>>;

    /// Lists every stored credential ordered by id.
    fn get_credentials(&self) -> Result<Vec<Credential>>;
}

/// Loads credential `id` and checks that it belongs to `family`.
///
/// Fails with a credential error when the id is unknown or the stored type
/// serves another family, so no external call is attempted with it.
pub fn lookup_credential(
    store: &dyn CredentialStore,
    id: CredentialId,
    family: CredentialFamily,
) -> Result<Credential> {
    let credential = store.get_credential(id)?.ok_or_else(|| ToolflowError::Credential(format!("Credential {} not found", id)))?;
    if credential.family() != family {
        return Err(ToolflowError::Credential(format!(
            "invalid credential for this operation: credential {} is of type '{}', expected the '{}' family",
            id, credential.credential_type, family
        )));
    }
    Ok(credential)
}

/// Reads an optional credential id given as a number or a numeric string.
///
/// `null`, a missing value and an empty string all mean "no credential".
pub fn parse_credential_id(value: Option<&Value>) -> Result<Option<CredentialId>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| ToolflowError::Config(format!("invalid credentialId: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| ToolflowError::Config(format!("invalid credentialId: '{}'", s))),
        Some(other) => Err(ToolflowError::Config(format!("invalid credentialId: {}", other))),
    }
}
