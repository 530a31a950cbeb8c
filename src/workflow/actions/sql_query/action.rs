use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result, ToolflowError,
    clients::{ClientError, SqlConnection, SqlTarget},
    common::Vars,
    runtime::{Context, LogLevel},
    store::{self, CredentialFamily},
    workflow::{
        Envelope,
        actions::{Action, ActionType},
        node::NodeId,
        template,
    },
};

const COUNT_KEY: &str = "count";
const RESULTS_KEY: &str = "results";

/// Runs one SQL statement against the internal database or a credential's database.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SqlQueryAction {
    #[serde(default)]
    query: String,
    #[serde(rename = "credentialId", default)]
    credential_id: Option<Value>,
}

impl SqlQueryAction {
    fn target(
        &self,
        ctx: &Context,
    ) -> Result<SqlTarget> {
        match store::parse_credential_id(self.credential_id.as_ref())? {
            Some(id) => {
                let credential = ctx.credential(id, CredentialFamily::Sql)?;
                Ok(SqlTarget::External(SqlConnection::from_credential(&credential)?))
            }
            None => Ok(SqlTarget::Internal),
        }
    }
}

#[async_trait]
impl Action for SqlQueryAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&Self::schema(), &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "SQL statement, supports template variables like {{name}}"
                },
                "credentialId": {
                    "type": ["integer", "string", "null"],
                    "description": "SQL credential; the internal database is used when absent"
                }
            }
        })
    }

    fn action_type(&self) -> &'static str {
        ActionType::SqlQuery.into()
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _nid: NodeId,
    ) -> Result<Envelope> {
        let query = template::resolve_template(&self.query, ctx.vars());
        if query.trim().is_empty() {
            return Err(ToolflowError::Config("SQL query is missing".to_string()));
        }
        ctx.log(LogLevel::Info, format!("Running SQL: {}", query));

        let target = self.target(&ctx)?;
        let rows = match ctx.clients().sql().query(&target, &query).await {
            Ok(rows) => rows,
            Err(ClientError::NoResultSet) => {
                ctx.log(LogLevel::Debug, "Statement returned no result set");
                Vec::new()
            }
            Err(err) => {
                let message = format!("SQL Error: {}", err);
                ctx.log(LogLevel::Error, message.clone());
                return Err(ToolflowError::Collaborator(message));
            }
        };

        let outputs = Vars::new().with(COUNT_KEY, rows.len()).with(RESULTS_KEY, rows);
        Ok(Envelope::success(outputs))
    }
}
