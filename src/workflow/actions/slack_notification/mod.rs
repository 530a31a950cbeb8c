mod action;

pub use action::SlackNotificationAction;
