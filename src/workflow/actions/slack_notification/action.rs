use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result, ToolflowError,
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

const DEFAULT_MESSAGE: &str = "Workflow notification";
const WEBHOOK_URL_KEY: &str = "webhookUrl";
const RESPONSE_KEY: &str = "response";

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

/// Posts a text message to a chat incoming webhook.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SlackNotificationAction {
    #[serde(rename = "webhookUrl", default)]
    webhook_url: String,
    #[serde(default = "default_message")]
    message: String,
    #[serde(rename = "credentialId", default)]
    credential_id: Option<Value>,
}

#[async_trait]
impl Action for SlackNotificationAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&Self::schema(), &params)?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "webhookUrl": {
                    "type": "string",
                    "description": "Incoming webhook URL, supports template variables"
                },
                "message": {
                    "type": "string",
                    "description": "Message text, supports template variables"
                },
                "credentialId": {
                    "type": ["integer", "string", "null"],
                    "description": "Chat credential whose webhookUrl overrides the one given here"
                }
            }
        })
    }

    fn action_type(&self) -> &'static str {
        ActionType::SlackNotification.into()
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _nid: NodeId,
    ) -> Result<Envelope> {
        let mut webhook_url = template::resolve_template(&self.webhook_url, ctx.vars());
        let message = template::resolve_template(&self.message, ctx.vars());

        if let Some(id) = store::parse_credential_id(self.credential_id.as_ref())? {
            let credential = ctx.credential(id, CredentialFamily::Chat)?;
            if let Some(url) = credential.data_str(WEBHOOK_URL_KEY) {
                webhook_url = url.to_string();
            }
        }

        if webhook_url.trim().is_empty() {
            return Err(ToolflowError::Config("Slack Webhook URL is missing".to_string()));
        }

        let preview: String = webhook_url.chars().take(20).collect();
        ctx.log(LogLevel::Info, format!("Sending Slack notification to {}...", preview));

        let response = ctx.clients().webhook().post_json(&webhook_url, &json!({ "text": message })).await.map_err(|err| {
            ctx.log(LogLevel::Error, format!("Slack notification failed: {}", err));
            ToolflowError::from(err)
        })?;

        Ok(Envelope::success(Vars::new().with(RESPONSE_KEY, response)))
    }
}
