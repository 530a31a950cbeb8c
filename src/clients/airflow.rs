use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use tracing::trace;

use crate::{Result, ToolflowError};

use super::ClientError;

/// Connection parameters of an orchestrator REST API.
#[derive(Clone, PartialEq)]
pub struct AirflowConnection {
    /// base url of the webserver, e.g. `http://airflow:8080`
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One orchestrator operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum AirflowRequest {
    Health,
    ListDags {
        limit: u64,
    },
    GetDagDetails {
        dag_id: String,
    },
    TriggerDag {
        dag_id: String,
        conf: Option<Value>,
    },
    GetDagRun {
        dag_id: String,
        dag_run_id: String,
    },
    ListDagRuns {
        dag_id: String,
        limit: u64,
    },
    ListTaskInstances {
        dag_id: String,
        dag_run_id: String,
    },
    GetTaskLogs {
        dag_id: String,
        dag_run_id: String,
        task_id: String,
        try_number: u64,
    },
    PauseDag {
        dag_id: String,
    },
    UnpauseDag {
        dag_id: String,
    },
    ClearTaskInstances {
        dag_id: String,
        dag_run_id: Option<String>,
    },
    ListConnections,
    GetConnection {
        connection_id: String,
    },
    ListXcoms {
        dag_id: String,
        dag_run_id: String,
        task_id: String,
    },
    DeleteDag {
        dag_id: String,
    },
    ClearDagRun {
        dag_id: String,
        dag_run_id: String,
    },
}

/// HTTP shape of a request against the stable REST API (`/api/v1`).
struct Route {
    method: Method,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Route {
    fn new(
        method: Method,
        segments: &[&str],
    ) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    fn query(
        mut self,
        key: &'static str,
        value: impl ToString,
    ) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    fn body(
        mut self,
        body: Value,
    ) -> Self {
        self.body = Some(body);
        self
    }
}

impl AirflowRequest {
    fn route(&self) -> Route {
        match self {
            AirflowRequest::Health => Route::new(Method::GET, &["health"]),
            AirflowRequest::ListDags {
                limit,
            } => Route::new(Method::GET, &["dags"]).query("limit", limit),
            AirflowRequest::GetDagDetails {
                dag_id,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "details"]),
            AirflowRequest::TriggerDag {
                dag_id,
                conf,
            } => Route::new(Method::POST, &["dags", dag_id.as_str(), "dagRuns"]).body(json!({ "conf": conf.clone().unwrap_or_else(|| json!({})) })),
            AirflowRequest::GetDagRun {
                dag_id,
                dag_run_id,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "dagRuns", dag_run_id.as_str()]),
            AirflowRequest::ListDagRuns {
                dag_id,
                limit,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "dagRuns"]).query("limit", limit),
            AirflowRequest::ListTaskInstances {
                dag_id,
                dag_run_id,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "dagRuns", dag_run_id.as_str(), "taskInstances"]),
            AirflowRequest::GetTaskLogs {
                dag_id,
                dag_run_id,
                task_id,
                try_number,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "dagRuns", dag_run_id.as_str(), "taskInstances", task_id.as_str(), "logs", try_number.to_string().as_str()])
                .query("full_content", true),
            AirflowRequest::PauseDag {
                dag_id,
            } => Route::new(Method::PATCH, &["dags", dag_id.as_str()]).body(json!({ "is_paused": true })),
            AirflowRequest::UnpauseDag {
                dag_id,
            } => Route::new(Method::PATCH, &["dags", dag_id.as_str()]).body(json!({ "is_paused": false })),
            AirflowRequest::ClearTaskInstances {
                dag_id,
                dag_run_id,
            } => {
                let mut body = json!({ "dry_run": false });
                if let Some(run_id) = dag_run_id {
                    body["dag_run_id"] = json!(run_id);
                }
                Route::new(Method::POST, &["dags", dag_id.as_str(), "clearTaskInstances"]).body(body)
            }
            AirflowRequest::ListConnections => Route::new(Method::GET, &["connections"]),
            AirflowRequest::GetConnection {
                connection_id,
            } => Route::new(Method::GET, &["connections", connection_id.as_str()]),
            AirflowRequest::ListXcoms {
                dag_id,
                dag_run_id,
                task_id,
            } => Route::new(Method::GET, &["dags", dag_id.as_str(), "dagRuns", dag_run_id.as_str(), "taskInstances", task_id.as_str(), "xcomEntries"]),
            AirflowRequest::DeleteDag {
                dag_id,
            } => Route::new(Method::DELETE, &["dags", dag_id.as_str()]),
            AirflowRequest::ClearDagRun {
                dag_id,
                dag_run_id,
            } => Route::new(Method::POST, &["dags", dag_id.as_str(), "dagRuns", dag_run_id.as_str(), "clear"]).body(json!({ "dry_run": false })),
        }
    }
}

#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Performs `request` against the orchestrator at `conn`.
    ///
    /// Returns the decoded response body, `Value::Null` when the response is empty.
    async fn call(
        &self,
        conn: &AirflowConnection,
        request: &AirflowRequest,
    ) -> std::result::Result<Value, ClientError>;
}

/// Orchestrator client for the Airflow stable REST API, backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct AirflowClient {
    client: reqwest::Client,
}

impl AirflowClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|err| ToolflowError::Config(format!("failed to build http client: {}", err)))?;

        Ok(Self {
            client,
        })
    }
}

/// Joins `/api/v1/<segments>` onto the base url, percent-encoding each segment.
fn endpoint_url(
    base: &str,
    segments: &[String],
) -> std::result::Result<Url, ClientError> {
    let mut url = Url::parse(base).map_err(|err| ClientError::Failed(format!("invalid airflow url '{}': {}", base, err)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Failed(format!("invalid airflow url '{}'", base)))?
        .pop_if_empty()
        .extend(["api", "v1"])
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl Orchestrator for AirflowClient {
    async fn call(
        &self,
        conn: &AirflowConnection,
        request: &AirflowRequest,
    ) -> std::result::Result<Value, ClientError> {
        let route = request.route();
        let url = endpoint_url(&conn.url, &route.segments)?;
        trace!("airflow_client::call({} {})", route.method, url.path());

        let mut builder = self.client.request(route.method, url).query(&route.query);
        if let Some(username) = &conn.username {
            builder = builder.basic_auth(username, conn.password.as_ref());
        }
        if let Some(body) = &route.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(|err| ClientError::Failed(format!("Http error: {}", err)))?;
        let status = res.status();
        let text = res.text().await.map_err(|err| ClientError::Failed(err.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(text));
        }
        if !status.is_success() {
            return Err(ClientError::Failed(format!("airflow responded with {}: {}", status, text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        // task logs come back as plain text
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
