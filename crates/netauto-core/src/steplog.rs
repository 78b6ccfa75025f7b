//! Per-run append-only step log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// One timestamped progress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    /// Wall-clock time the step was recorded.
    pub timestamp: DateTime<Utc>,

    /// Human-readable progress message.
    pub message: String,
}

impl fmt::Display for SessionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Append-only ordered log of session progress.
///
/// Scoped to one pipeline run; the orchestrator and the session state
/// machine share a reference and append through interior mutability.
/// Entries are never removed or reordered, so insertion order is
/// chronological order.
#[derive(Debug, Default)]
pub struct StepLogger {
    entries: Mutex<Vec<SessionLogEntry>>,
}

impl StepLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step with the current timestamp.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(step = %message, "session step");
        let entry = SessionLogEntry {
            timestamp: Utc::now(),
            message,
        };
        self.entries
            .lock()
            .expect("step log mutex poisoned")
            .push(entry);
    }

    /// Ordered snapshot of all entries recorded so far.
    pub fn entries(&self) -> Vec<SessionLogEntry> {
        self.entries
            .lock()
            .expect("step log mutex poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("step log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_preserve_insertion_order() {
        let log = StepLogger::new();
        log.record("first");
        log.record("second");
        log.record("third");

        let entries = log.entries();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_timestamps_monotonic_non_decreasing() {
        let log = StepLogger::new();
        for i in 0..20 {
            log.record(format!("step {i}"));
        }

        let entries = log.entries();
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_snapshot_is_detached() {
        let log = StepLogger::new();
        log.record("one");
        let snapshot = log.entries();
        log.record("two");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_display_has_second_precision() {
        let entry = SessionLogEntry {
            timestamp: Utc::now(),
            message: "Connecting to Dummy-RT1...".to_string(),
        };
        let rendered = entry.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("Connecting to Dummy-RT1..."));
    }
}
