use serde_json::json;
use toolflow::{Config, NodeConfig, Toolbox, Vars};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let config = Config::load_from_str(include_str!("./toolflow.toml")).unwrap();
    let toolbox = Toolbox::builder().config(config).build().unwrap();

    for tool in toolbox.list_tools() {
        println!("{}: {}", tool.name, tool.description);
    }

    let credentials = toolbox.invoke("list_credentials", json!({})).await;
    println!("Credentials: {:#}", credentials.into_value());

    let health = toolbox.invoke("airflow_check", json!({"operation": "health", "credentialId": 1})).await;
    println!("Airflow health: {:#}", health.into_value());

    let unsupported = toolbox.invoke("airflow_check", json!({"operation": "launch", "credentialId": 1})).await;
    println!("Unsupported: {:#}", unsupported.into_value());

    let notify = NodeConfig::new("notify", "slack_notification", json!({"message": "Nightly load finished for {{day}}", "credentialId": 2}).into());
    let outcome = toolbox.run_node(&notify, Vars::new().with("day", "2024-01-01")).await;
    println!("Notification: {:#}", outcome.envelope.into_value());
    for entry in outcome.logs {
        println!("[{}] {} {}", entry.timestamp, entry.level, entry.message);
    }
}
