//! Recording collaborator mocks shared by the unit tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    clients::{
        AirflowConnection, AirflowRequest, ClientError, Clients, FileTransfer, ObjectStorage, Orchestrator, SqlClient, SqlTarget, StorageConnection, StorageRequest, TransferConnection,
        TransferRequest, TransferSession, WebhookClient,
    },
    common::Vars,
    runtime::Context,
    store::MemStore,
};

type ClientResult<T> = std::result::Result<T, ClientError>;

pub struct MockSql {
    result: ClientResult<Vec<Vars>>,
    calls: Mutex<Vec<(SqlTarget, String)>>,
}

impl MockSql {
    pub fn returning(rows: Vec<Vars>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(rows),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ClientError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(SqlTarget, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlClient for MockSql {
    async fn query(
        &self,
        target: &SqlTarget,
        sql: &str,
    ) -> ClientResult<Vec<Vars>> {
        self.calls.lock().unwrap().push((target.clone(), sql.to_string()));
        self.result.clone()
    }
}

pub struct MockWebhook {
    result: ClientResult<String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockWebhook {
    pub fn returning(body: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(body.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ClientError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookClient for MockWebhook {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> ClientResult<String> {
        self.calls.lock().unwrap().push((url.to_string(), body.clone()));
        self.result.clone()
    }
}

pub struct MockOrchestrator {
    result: ClientResult<Value>,
    calls: Mutex<Vec<(String, AirflowRequest)>>,
}

impl MockOrchestrator {
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(value),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ClientError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Base url and request of every call.
    pub fn calls(&self) -> Vec<(String, AirflowRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Orchestrator for MockOrchestrator {
    async fn call(
        &self,
        conn: &AirflowConnection,
        request: &AirflowRequest,
    ) -> ClientResult<Value> {
        self.calls.lock().unwrap().push((conn.url.clone(), request.clone()));
        self.result.clone()
    }
}

pub struct MockStorage {
    result: ClientResult<Value>,
    calls: Mutex<Vec<StorageRequest>>,
}

impl MockStorage {
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(value),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ClientError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<StorageRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn call(
        &self,
        _conn: &StorageConnection,
        request: &StorageRequest,
    ) -> ClientResult<Value> {
        self.calls.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

/// File-transfer mock counting opened and closed sessions.
pub struct MockTransfer {
    result: ClientResult<Value>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    connections: Mutex<Vec<(String, u16)>>,
    requests: Arc<Mutex<Vec<TransferRequest>>>,
}

impl MockTransfer {
    fn with_result(result: ClientResult<Value>) -> Arc<Self> {
        Arc::new(Self {
            result,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            connections: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn returning(value: Value) -> Arc<Self> {
        Self::with_result(Ok(value))
    }

    pub fn failing(err: ClientError) -> Arc<Self> {
        Self::with_result(Err(err))
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Host and port of every opened session.
    pub fn connections(&self) -> Vec<(String, u16)> {
        self.connections.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileTransfer for MockTransfer {
    async fn open(
        &self,
        conn: &TransferConnection,
    ) -> ClientResult<Box<dyn TransferSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.connections.lock().unwrap().push((conn.host.clone(), conn.port));
        Ok(Box::new(MockSession {
            result: self.result.clone(),
            closed: self.closed.clone(),
            requests: self.requests.clone(),
        }))
    }
}

struct MockSession {
    result: ClientResult<Value>,
    closed: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<TransferRequest>>>,
}

#[async_trait]
impl TransferSession for MockSession {
    async fn run(
        &mut self,
        request: &TransferRequest,
    ) -> ClientResult<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }

    async fn close(self: Box<Self>) -> ClientResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Clients answering with empty successes, for tests that only care about one collaborator.
pub fn clients() -> Clients {
    Clients::new(MockSql::returning(Vec::new()), MockWebhook::returning("ok"), MockOrchestrator::returning(Value::Null))
}

pub fn context(
    store: MemStore,
    clients: Clients,
) -> Arc<Context> {
    Arc::new(Context::new("test-execution".to_string(), Arc::new(store), clients))
}
