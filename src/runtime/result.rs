//! Normalized result envelopes for runtime operations.
//!
//! Every adapter call returns an [`OpResult`]: success carries the payload
//! plus any warnings collected along the way, failure carries an
//! [`OperationError`] with enough diagnostic context for the caller to
//! render actionable guidance without re-querying the runtime.

use serde::Serialize;
use thiserror::Error;

/// Successful operation payload with collected warnings.
#[derive(Debug, Clone, Serialize)]
pub struct OpOutcome<T> {
    /// The operation's data payload.
    pub data: T,
    /// Non-fatal warnings surfaced during the operation.
    pub warnings: Vec<String>,
}

impl<T> OpOutcome<T> {
    /// Wraps a payload with no warnings.
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    /// Wraps a payload with warnings.
    #[must_use]
    pub fn with_warnings(data: T, warnings: Vec<String>) -> Self {
        Self { data, warnings }
    }
}

/// Canonical result type of every runtime adapter call.
pub type OpResult<T> = Result<OpOutcome<T>, OperationError>;

/// Operation-specific diagnostic fields attached to a failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorContext {
    /// The target did not exist (distinguishes "not yet created" from
    /// genuine failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<bool>,
    /// Whether the container was attached to the requested network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_attached: Option<bool>,
    /// Human-oriented recovery hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Health probe attempts made before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// The most recent underlying error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// The service or resource name the failure concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The URL probed, for health failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The configured deadline in milliseconds, for health failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Bounded tail of progress records, for build failures.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub records: Vec<String>,
}

/// Normalized failure of a runtime operation.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{operation} failed: {message}")]
pub struct OperationError {
    /// The operation that failed (e.g. `buildImage`, `stopContainer`).
    pub operation: String,
    /// Human-readable failure description.
    pub message: String,
    /// HTTP status code from the runtime daemon, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Short machine-oriented reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Operation-specific diagnostics.
    pub context: ErrorContext,
}

impl OperationError {
    /// Creates an error for the named operation.
    #[must_use]
    pub fn new(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            message: message.into(),
            code: None,
            reason: None,
            context: ErrorContext::default(),
        }
    }

    /// Attaches a daemon status code.
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a short reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Replaces the diagnostic context.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Builds an error from a bollard failure, extracting the daemon
    /// status code when present.
    #[must_use]
    pub fn from_runtime(operation: &str, err: &bollard::errors::Error) -> Self {
        let code = match err {
            bollard::errors::Error::DockerResponseServerError { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        };
        let mut built = Self::new(operation, err.to_string());
        built.code = code;
        built
    }
}

/// One failed removal inside a bulk removal pass.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalError {
    /// The removal sub-operation (e.g. `removeContainer`).
    pub operation: String,
    /// The resource that could not be removed.
    pub target: String,
    /// Failure description.
    pub message: String,
    /// Daemon status code, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

/// Best-effort summary of a bulk removal across resource kinds.
///
/// Partial failure is representable: some resources removed, others
/// recorded in `errors`. The summary is always returned in full.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemovalSummary {
    /// Removed container identifiers.
    pub containers: Vec<String>,
    /// Removed image references.
    pub images: Vec<String>,
    /// Removed volume names.
    pub volumes: Vec<String>,
    /// Removed network names.
    pub networks: Vec<String>,
    /// Individual removal failures.
    pub errors: Vec<RemovalError>,
}

impl RemovalSummary {
    /// True when every targeted resource was removed.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of resources removed across all kinds.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.containers.len() + self.images.len() + self.volumes.len() + self.networks.len()
    }

    /// True when at least one resource was removed.
    #[must_use]
    pub fn any_removed(&self) -> bool {
        self.removed_count() > 0
    }
}

/// Read-only projection of runtime container metadata.
///
/// Never mutated; always re-derived from a fresh runtime query.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSnapshot {
    /// Container identifier.
    pub id: String,
    /// Container name without the leading slash.
    pub name: String,
    /// Image reference the container runs.
    pub image: String,
    /// Runtime state (e.g. `running`, `exited`).
    pub state: String,
    /// Human status line (e.g. `Up 3 minutes`).
    pub status: String,
    /// Port mappings, formatted `host->container/proto`.
    pub ports: Vec<String>,
    /// Creation time as a unix timestamp.
    pub created_at: i64,
}

/// Outcome of an idempotent stop.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StopOutcome {
    /// True when the container was already stopped or did not exist.
    pub skipped: bool,
}
