use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Result, ToolflowError,
    store::{Credential, CredentialType},
};

use super::ClientError;

const DEFAULT_REGION: &str = "us-east-1";

/// Connection parameters of an object-storage account.
#[derive(Clone, PartialEq)]
pub struct StorageConnection {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
}

impl StorageConnection {
    /// Reads `accessKey`, `secretKey`, `region` and `endpoint` from an object-storage credential.
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        if credential.credential_type != CredentialType::S3 {
            return Err(ToolflowError::Credential(format!("credential {} is not an object storage credential", credential.id)));
        }
        let field = |key: &str| {
            credential.data_str(key).map(str::to_string).ok_or_else(|| ToolflowError::Config(format!("credential {} has no {}", credential.id, key)))
        };

        Ok(Self {
            access_key: field("accessKey")?,
            secret_key: field("secretKey")?,
            region: credential.data_str("region").unwrap_or(DEFAULT_REGION).to_string(),
            endpoint: credential.data_str("endpoint").map(str::to_string),
        })
    }
}

/// One object-storage operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageRequest {
    ListBuckets,
    ListObjects {
        bucket: String,
        prefix: String,
    },
    HeadObject {
        bucket: String,
        key: String,
    },
    PresignGet {
        bucket: String,
        key: String,
        expires_in: u64,
    },
    DeleteObject {
        bucket: String,
        key: String,
    },
    CopyObject {
        bucket: String,
        key: String,
        dest_bucket: String,
        dest_key: String,
    },
    BucketLocation {
        bucket: String,
    },
    ListObjectVersions {
        bucket: String,
        prefix: String,
    },
    GetBucketVersioning {
        bucket: String,
    },
}

/// Object-storage collaborator, implemented by the embedding application.
///
/// Implementations report a missing bucket or key as [`ClientError::NotFound`].
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn call(
        &self,
        conn: &StorageConnection,
        request: &StorageRequest,
    ) -> std::result::Result<Value, ClientError>;
}
