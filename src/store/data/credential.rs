use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::Vars;

/// Credential id, assigned by the store at creation.
pub type CredentialId = i64;

/// Concrete service a credential connects to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CredentialType {
    Postgres,
    Mssql,
    S3,
    Sftp,
    Airflow,
    Slack,
}

/// Operation family a credential can be used for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CredentialFamily {
    Sql,
    ObjectStorage,
    FileTransfer,
    Orchestrator,
    Chat,
}

impl CredentialType {
    pub fn family(&self) -> CredentialFamily {
        match self {
            CredentialType::Postgres | CredentialType::Mssql => CredentialFamily::Sql,
            CredentialType::S3 => CredentialFamily::ObjectStorage,
            CredentialType::Sftp => CredentialFamily::FileTransfer,
            CredentialType::Airflow => CredentialFamily::Orchestrator,
            CredentialType::Slack => CredentialFamily::Chat,
        }
    }
}

/// A stored, typed bundle of connection parameters for one external service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: CredentialId,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// connection parameters, shape depends on `credential_type`
    pub data: Vars,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn family(&self) -> CredentialFamily {
        self.credential_type.family()
    }

    /// Non-empty string field of `data`.
    pub fn data_str(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.data.get_str(key).filter(|s| !s.is_empty())
    }

    /// Port-like field of `data`, accepting both numbers and numeric strings.
    pub fn data_port(
        &self,
        key: &str,
    ) -> Option<u16> {
        match self.data.get::<Value>(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The non-sensitive projection of a credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialSummary {
    pub id: CredentialId,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&Credential> for CredentialSummary {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            name: credential.name.clone(),
            credential_type: credential.credential_type,
            created_at: credential.created_at,
        }
    }
}
