pub mod slack_notification;
pub mod sql_query;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    runtime::Context,
    workflow::{Envelope, node::NodeId},
};

pub use slack_notification::SlackNotificationAction;
pub use sql_query::SqlQueryAction;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    SqlQuery,
    SlackNotification,
}

#[async_trait]
pub trait Action: Send + Sync {
    /// Creates a new instance of the action from the node data.
    ///
    /// # Arguments
    ///
    /// * `params` - The [`serde_json::Value`] containing the node data.
    ///
    /// # Returns
    ///
    /// Returns a [`Result`] containing the created action instance.
    fn create(params: Value) -> Result<Self>
    where
        Self: Sized;

    /// Returns the schema of the node data.
    ///
    /// # Returns
    ///
    /// Returns a [`serde_json::Value`] representing the schema of the action.
    fn schema() -> Value
    where
        Self: Sized;

    /// Returns the registry key of the action.
    fn action_type(&self) -> &'static str;

    /// Executes the action with the given context.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The [`Context`] of the execution.
    /// * `nid` - The id of the node.
    ///
    /// # Returns
    ///
    /// Returns a success [`Envelope`], or the error that stopped the action.
    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<Envelope>;
}

/// Builds a boxed action from node data.
pub type ActionFactory = fn(Value) -> Result<Box<dyn Action>>;

/// [`ActionFactory`] for any concrete action type.
pub fn create_boxed<A: Action + 'static>(params: Value) -> Result<Box<dyn Action>> {
    Ok(Box::new(A::create(params)?))
}

/// The built-in handler table loaded by registry discovery.
pub fn builtin_actions() -> Vec<(ActionType, ActionFactory)> {
    vec![
        (ActionType::SqlQuery, create_boxed::<SqlQueryAction> as ActionFactory),
        (ActionType::SlackNotification, create_boxed::<SlackNotificationAction> as ActionFactory),
    ]
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_every_action_type_is_builtin() {
        let builtins: Vec<ActionType> = builtin_actions().into_iter().map(|(t, _)| t).collect();
        for action_type in ActionType::iter() {
            assert!(builtins.contains(&action_type), "{} has no factory", action_type);
        }
    }

    #[test]
    fn test_action_type_names() {
        assert_eq!(ActionType::SqlQuery.as_ref(), "sql_query");
        assert_eq!("slack_notification".parse::<ActionType>().unwrap(), ActionType::SlackNotification);
    }
}
