use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::{Result, ToolflowError};

use super::ClientError;

#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Posts `body` as JSON to `url` and returns the response text.
    ///
    /// Any non-success status is a failure carrying the status and response body.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> std::result::Result<String, ClientError>;
}

/// Webhook client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    client: reqwest::Client,
}

impl HttpWebhookClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|err| ToolflowError::Config(format!("failed to build http client: {}", err)))?;

        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> std::result::Result<String, ClientError> {
        trace!("http_webhook_client::post_json");
        let res = self.client.post(url).json(body).send().await.map_err(|err| ClientError::Failed(format!("Http error: {}", err)))?;

        let status = res.status();
        let text = res.text().await.map_err(|err| ClientError::Failed(err.to_string()))?;
        if !status.is_success() {
            return Err(ClientError::Failed(format!("webhook responded with {}: {}", status, text)));
        }

        Ok(text)
    }
}
