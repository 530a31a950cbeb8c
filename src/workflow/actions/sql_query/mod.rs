mod action;

pub use action::SqlQueryAction;
