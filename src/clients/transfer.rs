use async_trait::async_trait;
use serde_json::Value;

use super::ClientError;

pub const DEFAULT_PORT: u16 = 22;

/// Connection parameters of a file-transfer server.
#[derive(Clone, PartialEq)]
pub struct TransferConnection {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One file-transfer operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferRequest {
    ListDir {
        path: String,
    },
    Mkdir {
        path: String,
    },
    Rmdir {
        path: String,
    },
    Stat {
        path: String,
    },
    Rename {
        path: String,
        new_path: String,
    },
    Remove {
        path: String,
    },
    Chmod {
        path: String,
        mode: u32,
    },
    Chown {
        path: String,
        uid: u32,
        gid: u32,
    },
}

/// File-transfer collaborator, implemented by the embedding application.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Opens an authenticated session. The caller closes it.
    async fn open(
        &self,
        conn: &TransferConnection,
    ) -> std::result::Result<Box<dyn TransferSession>, ClientError>;
}

/// An open file-transfer session.
///
/// Implementations report a missing path as [`ClientError::NotFound`].
#[async_trait]
pub trait TransferSession: Send {
    async fn run(
        &mut self,
        request: &TransferRequest,
    ) -> std::result::Result<Value, ClientError>;

    async fn close(self: Box<Self>) -> std::result::Result<(), ClientError>;
}
