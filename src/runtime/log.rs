use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ShareLock, utils};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One entry of an execution's log side channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Append-only log sequence shared by everything taking part in one execution.
#[derive(Debug, Clone, Default)]
pub struct Logs {
    entries: ShareLock<Vec<LogEntry>>,
}

impl Logs {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Appends an entry. Best effort: a poisoned lock drops the entry.
    pub fn append(
        &self,
        level: LogLevel,
        message: String,
    ) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(LogEntry {
                timestamp: utils::time::now(),
                level,
                message,
            });
        }
    }

    /// Snapshot of the entries appended so far, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().map(|entries| entries.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
