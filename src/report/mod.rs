//! Reporter and progress boundaries.
//!
//! The coordinator narrates every verb through a [`Reporter`] and emits
//! structured [`ProgressEvent`]s through an optional sink. UI, CLI and
//! HTTP-server collaborators consume these interfaces without touching
//! scheduler or runtime-adapter internals.

use std::sync::Arc;

use serde::Serialize;

/// Narration interface consumed by UI collaborators.
///
/// Absent a caller-supplied reporter, narration goes to [`TracingReporter`].
pub trait Reporter: Send + Sync {
    /// Informational narration.
    fn info(&self, msg: &str);
    /// Warning narration.
    fn warn(&self, msg: &str);
    /// Error narration.
    fn error(&self, msg: &str);
    /// Success narration.
    fn success(&self, msg: &str);
    /// Tabular output. `columns` is an optional header row.
    fn table(&self, rows: &[Vec<String>], columns: Option<&[&str]>);
}

/// Shared reporter handle.
pub type SharedReporter = Arc<dyn Reporter>;

/// Structured progress event emitted during verb execution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A job was accepted onto the build queue.
    Enqueue {
        /// Service the job builds.
        service: String,
    },
    /// A job left the queue and started running.
    Start {
        /// Service the job builds.
        service: String,
        /// Jobs in flight after this start.
        active: usize,
        /// Current admission limit.
        limit: usize,
    },
    /// Free-form stage update from inside a job.
    Update {
        /// Service the update concerns.
        service: String,
        /// Stage description.
        message: String,
    },
    /// A log line surfaced from a job or a container.
    Log {
        /// Originating service, when known.
        service: Option<String>,
        /// The log line.
        line: String,
    },
    /// A job or step failed.
    Error {
        /// Service the failure concerns.
        service: String,
        /// Failure description.
        message: String,
    },
    /// A job completed successfully.
    Complete {
        /// Service the job built.
        service: String,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// The scheduler became idle.
    Idle,
    /// The scheduler's admission limit changed.
    Capacity {
        /// The new limit.
        limit: usize,
    },
}

/// Callback sink for progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Callback invoked once per container log line during service start.
///
/// Arguments are `(service, line)`.
pub type ContainerLogSink = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Reporter that routes narration to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn success(&self, msg: &str) {
        tracing::info!("✓ {msg}");
    }

    fn table(&self, rows: &[Vec<String>], columns: Option<&[&str]>) {
        if let Some(cols) = columns {
            tracing::info!("{}", cols.join(" | "));
        }
        for row in rows {
            tracing::info!("{}", row.join(" | "));
        }
    }
}

/// Reporter that discards all narration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
    fn success(&self, _msg: &str) {}
    fn table(&self, _rows: &[Vec<String>], _columns: Option<&[&str]>) {}
}

/// Reporter that records narration in memory, for tests and batch capture.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: std::sync::Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// Creates an empty recording reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, prefix: &str, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{prefix}{msg}"));
        }
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, msg: &str) {
        self.push("", msg);
    }

    fn warn(&self, msg: &str) {
        self.push("warn: ", msg);
    }

    fn error(&self, msg: &str) {
        self.push("error: ", msg);
    }

    fn success(&self, msg: &str) {
        self.push("ok: ", msg);
    }

    fn table(&self, rows: &[Vec<String>], columns: Option<&[&str]>) {
        if let Some(cols) = columns {
            self.push("", &cols.join(" | "));
        }
        for row in rows {
            self.push("", &row.join(" | "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_captures_all_levels() {
        let reporter = RecordingReporter::new();
        reporter.info("starting");
        reporter.warn("slow");
        reporter.error("broken");
        reporter.success("done");

        let lines = reporter.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "starting");
        assert_eq!(lines[1], "warn: slow");
        assert_eq!(lines[2], "error: broken");
        assert_eq!(lines[3], "ok: done");
    }

    #[test]
    fn test_recording_reporter_table_with_header() {
        let reporter = RecordingReporter::new();
        reporter.table(
            &[vec!["a".to_string(), "b".to_string()]],
            Some(&["col1", "col2"]),
        );

        let lines = reporter.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "col1 | col2");
        assert_eq!(lines[1], "a | b");
    }

    #[test]
    fn test_progress_event_serializes_with_type_tag() {
        let event = ProgressEvent::Capacity { limit: 4 };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"type\":\"capacity\""));
        assert!(json.contains("\"limit\":4"));
    }

    #[test]
    fn test_null_reporter_is_silent() {
        let reporter = NullReporter;
        reporter.info("ignored");
        reporter.table(&[], None);
    }
}
