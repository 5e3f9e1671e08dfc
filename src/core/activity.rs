use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl Display for ActivityLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// In-memory, append-only activity log kept newest first.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityLogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        let entry = ActivityLogEntry {
            timestamp: Local::now(),
            message: message.into(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_front(entry);
        }
    }

    /// Snapshot of all entries, newest first.
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
