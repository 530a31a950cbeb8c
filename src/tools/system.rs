use async_trait::async_trait;
use serde_json::json;

use crate::{
    Result,
    common::Vars,
    store::CredentialSummary,
    workflow::Envelope,
};

use super::{Services, Tool, ToolDescriptor};

/// Guidance returned by `get_system_instructions`.
pub const SYSTEM_INSTRUCTIONS: &str = "DO NOT generate custom code for SFTP, S3, SQL, or Airflow. ALWAYS use the provided tools. Use 'list_credentials' to find the required credentialId first.";

pub struct SystemInstructionsTool;

#[async_trait]
impl Tool for SystemInstructionsTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "get_system_instructions".to_string(),
            description: "Get specific instructions for the AI on how to interact with this system correctly.".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(
        &self,
        _services: &Services,
        _request: Vars,
    ) -> Result<Envelope> {
        Ok(Envelope::success(Vars::new().with("instruction", SYSTEM_INSTRUCTIONS)))
    }
}

pub struct ListCredentialsTool;

#[async_trait]
impl Tool for ListCredentialsTool {
    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "list_credentials".to_string(),
            description: "List available credentials (names, types, and IDs) to use with other tools. Does not return sensitive data.".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(
        &self,
        services: &Services,
        _request: Vars,
    ) -> Result<Envelope> {
        let summaries: Vec<CredentialSummary> = services.credentials.get_credentials()?.iter().map(CredentialSummary::from).collect();
        Ok(Envelope::success(Vars::new().with("credentials", serde_json::to_value(summaries)?)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        Config,
        store::{CredentialType, MemStore},
        testing,
        workflow::NodeRegistry,
    };

    #[tokio::test]
    async fn test_list_credentials_hides_data() {
        let store = MemStore::new();
        store.insert("warehouse", CredentialType::Postgres, Vars::new().with("password", "hunter2")).unwrap();
        store.insert("alerts", CredentialType::Slack, Vars::new().with("webhookUrl", "https://hooks.example.com/x")).unwrap();
        let services = Services {
            config: Arc::new(Config::default()),
            credentials: Arc::new(store),
            clients: testing::clients(),
            nodes: Arc::new(NodeRegistry::new()),
        };

        let value = ListCredentialsTool.call(&services, Vars::new()).await.unwrap().into_value();
        let credentials = value["credentials"].as_array().unwrap();
        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials[0]["name"], "warehouse");
        assert_eq!(credentials[0]["type"], "postgres");
        assert_eq!(credentials[1]["id"], 2);
        assert!(credentials[0].get("createdAt").is_some());
        assert!(credentials.iter().all(|c| c.get("data").is_none()));
        assert!(!value.to_string().contains("hunter2"));
    }
}
