//! Bounded lifecycle history.
//!
//! Every verb's terminal outcome is appended to an on-disk JSON array,
//! newest last, capped at the 50 most recent entries. A missing or
//! malformed file reads as empty history, never as an error; this is the
//! only state that survives a process restart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::STATE_DIR;

/// Maximum number of persisted events.
pub const HISTORY_CAP: usize = 50;

/// History file name inside the state directory.
const HISTORY_FILE: &str = "history.json";

/// Terminal outcome of one verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    /// Everything succeeded.
    Success,
    /// Everything failed.
    Failed,
    /// Some targets succeeded, some failed.
    Partial,
    /// Aborted before any side effect.
    Cancelled,
}

/// One persisted audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// The verb that ran (e.g. `build`, `start`, `clean`).
    pub action: String,
    /// The service concerned, when the verb targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Terminal status.
    pub status: LifecycleStatus,
    /// Free-form outcome details.
    pub details: String,
    /// Store-assigned ISO-8601 timestamp.
    pub timestamp: String,
}

/// File-backed, append-only history store.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// A store over the given history file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store over the default per-user history file.
    #[must_use]
    pub fn default_location() -> Self {
        let dir = dirs::home_dir()
            .map_or_else(|| PathBuf::from(STATE_DIR), |home| home.join(STATE_DIR));
        Self::new(dir.join(HISTORY_FILE))
    }

    /// The history file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted events, oldest first.
    ///
    /// Missing or malformed files read as empty history.
    #[must_use]
    pub fn read(&self) -> Vec<LifecycleEvent> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Appends an event with a store-assigned timestamp and persists the
    /// capped tail.
    ///
    /// # Errors
    /// Returns error when the history file cannot be written.
    pub fn record(
        &self,
        action: &str,
        service: Option<&str>,
        status: LifecycleStatus,
        details: impl Into<String>,
    ) -> io::Result<()> {
        let mut events = self.read();
        events.push(LifecycleEvent {
            action: action.to_string(),
            service: service.map(str::to_string),
            status,
            details: details.into(),
            timestamp: Utc::now().to_rfc3339(),
        });
        if events.len() > HISTORY_CAP {
            let excess = events.len() - HISTORY_CAP;
            events.drain(..excess);
        }
        self.write(&events)
    }

    fn write(&self, events: &[LifecycleEvent]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(events)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_malformed_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{broken").unwrap();
        let store = HistoryStore::new(path);
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_record_appends_newest_last() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        store
            .record("build", Some("api"), LifecycleStatus::Success, "built")
            .unwrap();
        store
            .record("clean", Some("api"), LifecycleStatus::Failed, "image in use")
            .unwrap();

        let events = store.read();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "build");
        assert_eq!(events[1].action, "clean");
        assert_eq!(events[1].status, LifecycleStatus::Failed);
        assert!(!events[1].timestamp.is_empty());
    }

    #[test]
    fn test_cap_discards_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        for i in 0..55 {
            store
                .record(
                    "build",
                    Some("api"),
                    LifecycleStatus::Success,
                    format!("run {i}"),
                )
                .unwrap();
        }

        let events = store.read();
        assert_eq!(events.len(), HISTORY_CAP);
        assert_eq!(events[0].details, "run 5");
        assert_eq!(events[HISTORY_CAP - 1].details, "run 54");
    }
}
