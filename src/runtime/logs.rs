//! Container log streaming.
//!
//! Attaches to a container's combined stdout/stderr stream and invokes a
//! callback once per newline-delimited line. The returned handle stops the
//! underlying stream, and stops it automatically on drop so no exit path
//! leaks a follow-mode attachment.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bollard::container::LogsOptions;
use tokio_stream::StreamExt as _;

/// Per-line callback for streamed container output.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for attaching to a container's log stream.
#[derive(Debug, Clone)]
pub struct LogStreamOptions {
    /// Keep following new output after the backlog.
    pub follow: bool,
    /// Number of backlog lines to fetch; `None` fetches all.
    pub tail: Option<u64>,
}

impl Default for LogStreamOptions {
    fn default() -> Self {
        Self {
            follow: true,
            tail: Some(50),
        }
    }
}

/// Handle over a live log stream.
///
/// Dropping the handle stops the stream.
#[derive(Debug)]
pub struct LogStreamHandle {
    stop_flag: Arc<AtomicBool>,
    container_name: String,
}

impl LogStreamHandle {
    /// Signals the streaming task to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// True while the stream has not been stopped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// The container whose logs are streamed.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }
}

impl Drop for LogStreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts streaming logs from a container.
///
/// Spawns a task that reads the runtime's log stream and forwards each
/// non-empty line to `on_line`. Returns immediately with the handle.
#[must_use]
pub fn stream_logs(
    docker: bollard::Docker,
    container_name: &str,
    options: &LogStreamOptions,
    on_line: LineSink,
) -> LogStreamHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handle = LogStreamHandle {
        stop_flag: Arc::clone(&stop_flag),
        container_name: container_name.to_string(),
    };

    let name = container_name.to_string();
    let logs_options = LogsOptions::<String> {
        follow: options.follow,
        stdout: true,
        stderr: true,
        tail: options
            .tail
            .map_or_else(|| "all".to_string(), |n| n.to_string()),
        ..Default::default()
    };

    tokio::spawn(async move {
        let mut stream = docker.logs(&name, Some(logs_options));
        let mut partial = String::new();

        while let Some(result) = stream.next().await {
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            match result {
                Ok(output) => {
                    partial.push_str(&String::from_utf8_lossy(&output.into_bytes()));
                    while let Some(pos) = partial.find('\n') {
                        let line: String = partial.drain(..=pos).collect();
                        let line = line.trim_end_matches(['\n', '\r']);
                        if !line.is_empty() {
                            on_line(line);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("log stream error for {}: {}", name, e);
                    break;
                }
            }
        }
        // Flush a trailing line without a newline terminator.
        let rest = partial.trim_end_matches(['\n', '\r']);
        if !rest.is_empty() && !stop_flag.load(Ordering::Relaxed) {
            on_line(rest);
        }
    });

    handle
}
