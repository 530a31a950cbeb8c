use async_trait::async_trait;
use serde_json::json;

use crate::{
    Result,
    clients::{ClientError, StorageConnection, StorageRequest},
    common::Vars,
    store::CredentialFamily,
    workflow::Envelope,
};

use super::{Services, Tool, ToolDescriptor, credential_id, operation_names, optional_str, parse_operation, required_str, wrap_result};

const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum S3Operation {
    ListBuckets,
    ListObjects,
    GetMetadata,
    GeneratePresigned,
    Delete,
    Copy,
    Exists,
    Location,
    Versions,
    Versioning,
}

fn build_request(
    operation: S3Operation,
    request: &Vars,
) -> Result<StorageRequest> {
    let op = operation.as_ref();
    let arg = |key: &str| required_str(request, key, op).map(str::to_string);
    let prefix = || optional_str(request, "prefix").unwrap_or_default().to_string();

    let storage_request = match operation {
        S3Operation::ListBuckets => StorageRequest::ListBuckets,
        S3Operation::ListObjects => StorageRequest::ListObjects {
            bucket: arg("bucket")?,
            prefix: prefix(),
        },
        S3Operation::GetMetadata | S3Operation::Exists => StorageRequest::HeadObject {
            bucket: arg("bucket")?,
            key: arg("key")?,
        },
        S3Operation::GeneratePresigned => StorageRequest::PresignGet {
            bucket: arg("bucket")?,
            key: arg("key")?,
            expires_in: request.get::<u64>("expiresIn").unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS),
        },
        S3Operation::Delete => StorageRequest::DeleteObject {
            bucket: arg("bucket")?,
            key: arg("key")?,
        },
        S3Operation::Copy => {
            let bucket = arg("bucket")?;
            StorageRequest::CopyObject {
                key: arg("key")?,
                dest_bucket: optional_str(request, "destBucket").map(str::to_string).unwrap_or_else(|| bucket.clone()),
                dest_key: arg("destKey")?,
                bucket,
            }
        }
        S3Operation::Location => StorageRequest::BucketLocation {
            bucket: arg("bucket")?,
        },
        S3Operation::Versions => StorageRequest::ListObjectVersions {
            bucket: arg("bucket")?,
            prefix: prefix(),
        },
        S3Operation::Versioning => StorageRequest::GetBucketVersioning {
            bucket: arg("bucket")?,
        },
    };
    Ok(storage_request)
}

pub struct S3OperationTool;

#[async_trait]
impl Tool for S3OperationTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "s3_operation".to_string(),
            description: "Comprehensive S3 operations (buckets, objects, metadata, presigned, etc.). Use this tool instead of writing custom code for S3 tasks. Requires a valid credentialId from list_credentials.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "operation": { "type": "string", "enum": operation_names::<S3Operation>() },
                    "credentialId": { "type": ["integer", "string"], "description": "The ID of the S3 credential from list_credentials" },
                    "bucket": { "type": "string" },
                    "key": { "type": "string" },
                    "prefix": { "type": "string" },
                    "destBucket": { "type": "string", "description": "Target bucket for copy, defaults to bucket" },
                    "destKey": { "type": "string", "description": "Target key for copy" },
                    "expiresIn": { "type": "integer", "minimum": 1, "default": 3600, "description": "Presigned URL lifetime in seconds" }
                },
                "required": ["operation", "credentialId"]
            }),
        }
    }

    async fn call(
        &self,
        services: &Services,
        request: Vars,
    ) -> Result<Envelope> {
        let operation: S3Operation = parse_operation(&request)?;
        let credential = services.credential(credential_id(&request)?, CredentialFamily::ObjectStorage)?;
        let conn = StorageConnection::from_credential(&credential)?;
        let storage_request = build_request(operation, &request)?;
        let storage = services.clients.storage()?;

        let result = storage.call(&conn, &storage_request).await;
        match (operation, result) {
            (S3Operation::Exists, Ok(_)) => Ok(Envelope::success(Vars::new().with("exists", true))),
            (S3Operation::Exists, Err(ClientError::NotFound(_))) => Ok(Envelope::success(Vars::new().with("exists", false))),
            (_, Ok(value)) => Ok(wrap_result(value)),
            (_, Err(err)) => Err(err.into()),
        }
    }
}
