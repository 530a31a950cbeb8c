use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::{
    Result, ToolflowError,
    clients::{ClientError, TransferConnection, TransferRequest, transfer},
    common::Vars,
    store::{Credential, CredentialFamily},
    workflow::Envelope,
};

use super::{Services, Tool, ToolDescriptor, credential_id, operation_names, optional_str, parse_operation, required_str, wrap_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SftpOperation {
    ListDir,
    Mkdir,
    Rmdir,
    Stat,
    Rename,
    Remove,
    Chmod,
    Chown,
    Exists,
}

/// Host and port: request first, then the credential, then the default port.
fn connection(
    request: &Vars,
    credential: &Credential,
) -> Result<TransferConnection> {
    let host = optional_str(request, "host")
        .or_else(|| credential.data_str("host"))
        .or_else(|| credential.data_str("baseUrl"))
        .ok_or_else(|| ToolflowError::Config("Host not found in request or credential".to_string()))?;
    let port = request.get::<u16>("port").or_else(|| credential.data_port("port")).unwrap_or(transfer::DEFAULT_PORT);

    Ok(TransferConnection {
        host: host.to_string(),
        port,
        username: credential.data_str("username").map(str::to_string),
        password: credential.data_str("password").map(str::to_string),
    })
}

fn build_request(
    operation: SftpOperation,
    request: &Vars,
) -> Result<TransferRequest> {
    let op = operation.as_ref();
    let path = || required_str(request, "path", op).map(str::to_string);
    let number = |key: &str| request.get::<u32>(key).ok_or_else(|| ToolflowError::Config(format!("'{}' is required for operation '{}'", key, op)));

    let transfer_request = match operation {
        SftpOperation::ListDir => TransferRequest::ListDir {
            path: optional_str(request, "path").unwrap_or(".").to_string(),
        },
        SftpOperation::Mkdir => TransferRequest::Mkdir {
            path: path()?,
        },
        SftpOperation::Rmdir => TransferRequest::Rmdir {
            path: path()?,
        },
        SftpOperation::Stat | SftpOperation::Exists => TransferRequest::Stat {
            path: path()?,
        },
        SftpOperation::Rename => TransferRequest::Rename {
            path: path()?,
            new_path: required_str(request, "newPath", op)?.to_string(),
        },
        SftpOperation::Remove => TransferRequest::Remove {
            path: path()?,
        },
        SftpOperation::Chmod => TransferRequest::Chmod {
            path: path()?,
            mode: number("mode")?,
        },
        SftpOperation::Chown => TransferRequest::Chown {
            path: path()?,
            uid: number("uid")?,
            gid: number("gid")?,
        },
    };
    Ok(transfer_request)
}

pub struct SftpOperationTool;

#[async_trait]
impl Tool for SftpOperationTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "sftp_operation".to_string(),
            description: "Detailed SFTP operations (list_dir, mkdir, rmdir, stat, rename, remove, chmod, chown, exists). DO NOT GENERATE CODE. USE THIS TOOL FOR ALL SFTP TASKS. Requires a valid credentialId from list_credentials.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "operation": { "type": "string", "enum": operation_names::<SftpOperation>() },
                    "credentialId": { "type": ["integer", "string"], "description": "The ID of the SFTP credential from list_credentials" },
                    "path": { "type": "string", "description": "Remote path to operate on" },
                    "newPath": { "type": "string", "description": "New path for rename operation" },
                    "mode": { "type": "integer", "minimum": 0, "description": "Permissions mode for chmod" },
                    "uid": { "type": "integer", "minimum": 0, "description": "Owner user id for chown" },
                    "gid": { "type": "integer", "minimum": 0, "description": "Owner group id for chown" },
                    "host": { "type": "string", "description": "SFTP host (if not provided in credential)" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535, "default": 22, "description": "SFTP port (default 22)" }
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
        let operation: SftpOperation = parse_operation(&request)?;
        let credential = services.credential(credential_id(&request)?, CredentialFamily::FileTransfer)?;
        let conn = connection(&request, &credential)?;
        let transfer_request = build_request(operation, &request)?;
        let transfer = services.clients.transfer()?;

        let mut session = transfer.open(&conn).await?;
        let result = session.run(&transfer_request).await;
        if let Err(err) = session.close().await {
            warn!("failed to close transfer session to {}:{}: {}", conn.host, conn.port, err);
        }

        match (operation, result) {
            (SftpOperation::Exists, Ok(_)) => Ok(Envelope::success(Vars::new().with("exists", true))),
            (SftpOperation::Exists, Err(ClientError::NotFound(_))) => Ok(Envelope::success(Vars::new().with("exists", false))),
            (_, Ok(value)) => Ok(wrap_result(value)),
            (_, Err(err)) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::{
        Config,
        store::{CredentialType, MemStore},
        testing::{self, MockTransfer},
        workflow::NodeRegistry,
    };

    fn services(
        store: MemStore,
        transfer: Arc<MockTransfer>,
    ) -> Services {
        Services {
            config: Arc::new(Config::default()),
            credentials: Arc::new(store),
            clients: testing::clients().with_transfer(transfer),
            nodes: Arc::new(NodeRegistry::new()),
        }
    }

    fn sftp_store(data: Value) -> MemStore {
        let store = MemStore::new();
        store.insert("files", CredentialType::Sftp, data.into()).unwrap();
        store
    }

    fn request(value: Value) -> Vars {
        value.into()
    }

    #[tokio::test]
    async fn test_mkdir() {
        let transfer = MockTransfer::returning(Value::Null);
        let envelope = SftpOperationTool
            .call(&services(sftp_store(json!({"host": "files.example.com", "username": "u"})), transfer.clone()), request(json!({"operation": "mkdir", "credentialId": 1, "path": "/in"})))
            .await
            .unwrap();

        assert_eq!(envelope.into_value(), json!({"status": "success"}));
        assert_eq!(transfer.requests(), vec![TransferRequest::Mkdir {
            path: "/in".to_string(),
        }]);
        assert_eq!(transfer.connections(), vec![("files.example.com".to_string(), 22)]);
        assert_eq!((transfer.opened(), transfer.closed()), (1, 1));
    }

    #[tokio::test]
    async fn test_host_and_port_resolution() {
        let transfer = MockTransfer::returning(json!([]));
        let store = sftp_store(json!({"baseUrl": "base.example.com", "port": "2222"}));
        SftpOperationTool.call(&services(store, transfer.clone()), request(json!({"operation": "list_dir", "credentialId": 1}))).await.unwrap();
        assert_eq!(transfer.connections(), vec![("base.example.com".to_string(), 2222)]);
        assert_eq!(transfer.requests(), vec![TransferRequest::ListDir {
            path: ".".to_string(),
        }]);

        let transfer = MockTransfer::returning(json!([]));
        let store = sftp_store(json!({"host": "cred.example.com"}));
        SftpOperationTool
            .call(&services(store, transfer.clone()), request(json!({"operation": "list_dir", "credentialId": 1, "host": "req.example.com", "port": 2022})))
            .await
            .unwrap();
        assert_eq!(transfer.connections(), vec![("req.example.com".to_string(), 2022)]);
    }

    #[tokio::test]
    async fn test_missing_host_opens_nothing() {
        let transfer = MockTransfer::returning(Value::Null);
        let err = SftpOperationTool.call(&services(sftp_store(json!({})), transfer.clone()), request(json!({"operation": "stat", "credentialId": 1, "path": "/x"}))).await.unwrap_err();

        assert_eq!(err, ToolflowError::Config("Host not found in request or credential".to_string()));
        assert_eq!(transfer.opened(), 0);
    }

    #[tokio::test]
    async fn test_exists_not_found() {
        let transfer = MockTransfer::failing(ClientError::NotFound("/missing".to_string()));
        let envelope = SftpOperationTool
            .call(&services(sftp_store(json!({"host": "h"})), transfer.clone()), request(json!({"operation": "exists", "credentialId": 1, "path": "/missing"})))
            .await
            .unwrap();

        assert_eq!(envelope.into_value(), json!({"status": "success", "exists": false}));
        assert_eq!(transfer.closed(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_on_failure() {
        let transfer = MockTransfer::failing(ClientError::Failed("permission denied".to_string()));
        let err = SftpOperationTool
            .call(&services(sftp_store(json!({"host": "h"})), transfer.clone()), request(json!({"operation": "remove", "credentialId": 1, "path": "/etc/passwd"})))
            .await
            .unwrap_err();

        assert_eq!(err, ToolflowError::Collaborator("permission denied".to_string()));
        assert_eq!((transfer.opened(), transfer.closed()), (1, 1));
    }

    #[tokio::test]
    async fn test_chmod_requires_mode() {
        let transfer = MockTransfer::returning(Value::Null);
        let err = SftpOperationTool.call(&services(sftp_store(json!({"host": "h"})), transfer.clone()), request(json!({"operation": "chmod", "credentialId": 1, "path": "/x"}))).await.unwrap_err();

        assert_eq!(err, ToolflowError::Config("'mode' is required for operation 'chmod'".to_string()));
        assert_eq!(transfer.opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let transfer = MockTransfer::returning(Value::Null);
        let err = SftpOperationTool.call(&services(MemStore::new(), transfer.clone()), request(json!({"operation": "list_dir", "credentialId": 5}))).await.unwrap_err();

        assert_eq!(err, ToolflowError::Credential("Credential 5 not found".to_string()));
        assert_eq!(transfer.opened(), 0);
    }
}
