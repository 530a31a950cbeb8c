mod context;
mod log;

pub use context::{Context, ExecutionId};
pub use log::{LogEntry, LogLevel, Logs};
