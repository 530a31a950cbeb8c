use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, ToolflowError,
    clients::{AirflowConnection, AirflowRequest},
    common::Vars,
    store::CredentialFamily,
    workflow::Envelope,
};

use super::{Services, Tool, ToolDescriptor, credential_id, operation_names, optional_str, parse_operation, required_str, wrap_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AirflowOperation {
    Health,
    ListDags,
    GetDagDetails,
    TriggerDag,
    GetDagRun,
    ListDagRuns,
    ListTaskInstances,
    GetTaskLogs,
    PauseDag,
    UnpauseDag,
    ClearTaskInstances,
    ListConnections,
    GetConnection,
    ListXcoms,
    DeleteDag,
    ClearDagRun,
}

/// Maps a validated request onto the orchestrator call it names.
fn build_request(
    operation: AirflowOperation,
    request: &Vars,
    default_limit: u64,
) -> Result<AirflowRequest> {
    let op = operation.as_ref();
    let arg = |key: &str| required_str(request, key, op).map(str::to_string);
    let limit = || request.get::<u64>("limit").unwrap_or(default_limit);

    let airflow_request = match operation {
        AirflowOperation::Health => AirflowRequest::Health,
        AirflowOperation::ListDags => AirflowRequest::ListDags {
            limit: limit(),
        },
        AirflowOperation::GetDagDetails => AirflowRequest::GetDagDetails {
            dag_id: arg("dagId")?,
        },
        AirflowOperation::TriggerDag => AirflowRequest::TriggerDag {
            dag_id: arg("dagId")?,
            conf: request.get::<Value>("conf").filter(|conf| !conf.is_null()),
        },
        AirflowOperation::GetDagRun => AirflowRequest::GetDagRun {
            dag_id: arg("dagId")?,
            dag_run_id: arg("dagRunId")?,
        },
        AirflowOperation::ListDagRuns => AirflowRequest::ListDagRuns {
            dag_id: arg("dagId")?,
            limit: limit(),
        },
        AirflowOperation::ListTaskInstances => AirflowRequest::ListTaskInstances {
            dag_id: arg("dagId")?,
            dag_run_id: arg("dagRunId")?,
        },
        AirflowOperation::GetTaskLogs => AirflowRequest::GetTaskLogs {
            dag_id: arg("dagId")?,
            dag_run_id: arg("dagRunId")?,
            task_id: arg("taskId")?,
            try_number: request.get::<u64>("tryNumber").unwrap_or(1),
        },
        AirflowOperation::PauseDag => AirflowRequest::PauseDag {
            dag_id: arg("dagId")?,
        },
        AirflowOperation::UnpauseDag => AirflowRequest::UnpauseDag {
            dag_id: arg("dagId")?,
        },
        AirflowOperation::ClearTaskInstances => AirflowRequest::ClearTaskInstances {
            dag_id: arg("dagId")?,
            dag_run_id: optional_str(request, "dagRunId").map(str::to_string),
        },
        AirflowOperation::ListConnections => AirflowRequest::ListConnections,
        AirflowOperation::GetConnection => AirflowRequest::GetConnection {
            connection_id: arg("connectionId")?,
        },
        AirflowOperation::ListXcoms => AirflowRequest::ListXcoms {
            dag_id: arg("dagId")?,
            dag_run_id: arg("dagRunId")?,
            task_id: arg("taskId")?,
        },
        AirflowOperation::DeleteDag => AirflowRequest::DeleteDag {
            dag_id: arg("dagId")?,
        },
        AirflowOperation::ClearDagRun => AirflowRequest::ClearDagRun {
            dag_id: arg("dagId")?,
            dag_run_id: arg("dagRunId")?,
        },
    };
    Ok(airflow_request)
}

pub struct AirflowCheckTool;

#[async_trait]
impl Tool for AirflowCheckTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "airflow_check".to_string(),
            description: "Comprehensive Airflow operations (health, list_dags, trigger, logs, etc.). Use this tool instead of writing custom code for Airflow tasks. Requires a valid credentialId from list_credentials.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "operation": { "type": "string", "enum": operation_names::<AirflowOperation>() },
                    "credentialId": { "type": ["integer", "string"], "description": "The ID of the Airflow credential from list_credentials" },
                    "dagId": { "type": "string" },
                    "dagRunId": { "type": "string" },
                    "taskId": { "type": "string" },
                    "connectionId": { "type": "string" },
                    "tryNumber": { "type": "integer", "minimum": 1, "default": 1 },
                    "conf": { "type": ["object", "null"] },
                    "limit": { "type": "integer", "minimum": 1, "default": 10 }
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
        let operation: AirflowOperation = parse_operation(&request)?;
        let credential = services.credential(credential_id(&request)?, CredentialFamily::Orchestrator)?;
        let url = credential.data_str("url").ok_or_else(|| ToolflowError::Config(format!("credential {} has no url", credential.id)))?;
        let conn = AirflowConnection {
            url: url.to_string(),
            username: credential.data_str("username").map(str::to_string),
            password: credential.data_str("password").map(str::to_string),
        };

        let airflow_request = build_request(operation, &request, services.config.list_limit)?;
        let result = services.clients.orchestrator().call(&conn, &airflow_request).await?;
        Ok(wrap_result(result))
    }
}
