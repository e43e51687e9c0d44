//! HTTP health polling.
//!
//! A bounded polling loop against a service health endpoint: probe,
//! compare status, sleep, repeat until success or the next interval would
//! exceed the deadline. Failures carry attempt counts and a remediation
//! hint; callers that know more about the service supply their own.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::result::{ErrorContext, OperationError};

/// Health check parameters.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// The URL to probe.
    pub url: String,
    /// Pause between attempts.
    pub interval: Duration,
    /// Overall deadline measured from the first attempt.
    pub timeout: Duration,
    /// Exact status to require; any 2xx passes when unset.
    pub expected_status: Option<u16>,
    /// Recovery hint for the failure context; a generic one is derived
    /// from the service name when unset.
    pub remediation: Option<String>,
}

impl HealthCheck {
    /// A check with the given URL and default pacing.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
            expected_status: None,
            remediation: None,
        }
    }
}

/// Successful health confirmation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthReport {
    /// Probe attempts made, including the successful one.
    pub attempts: u32,
    /// HTTP status of the successful probe.
    pub status: u16,
}

/// Polls the health endpoint until success or deadline exhaustion.
///
/// Success is `expected_status` when set, otherwise any 2xx response.
/// On exhaustion the error context carries the service name, URL,
/// attempt count, deadline and the most recent probe error.
///
/// # Errors
/// Returns `HealthCheckTimeout`-flavored [`OperationError`] on exhaustion.
pub async fn wait_for_health(
    service: &str,
    check: &HealthCheck,
) -> Result<HealthReport, OperationError> {
    let client = reqwest::Client::builder()
        .timeout(check.interval.max(Duration::from_secs(1)))
        .build()
        .map_err(|e| OperationError::new("waitForHealth", e.to_string()))?;

    let deadline = Instant::now() + check.timeout;
    let mut attempts: u32 = 0;
    let mut last_error: Option<String> = None;

    loop {
        attempts += 1;
        match client.get(&check.url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let healthy = match check.expected_status {
                    Some(expected) => status == expected,
                    None => response.status().is_success(),
                };
                if healthy {
                    tracing::debug!(service, attempts, status, "health check passed");
                    return Ok(HealthReport { attempts, status });
                }
                last_error = Some(format!("unexpected status {status}"));
            }
            Err(e) => {
                last_error = Some(e.to_string());
            }
        }

        if Instant::now() + check.interval > deadline {
            break;
        }
        tokio::time::sleep(check.interval).await;
    }

    let timeout_ms = check.timeout.as_millis() as u64;
    Err(OperationError::new(
        "waitForHealth",
        format!(
            "{service} did not become healthy within {timeout_ms}ms ({attempts} attempts)"
        ),
    )
    .with_reason("HealthCheckTimeout")
    .with_context(ErrorContext {
        name: Some(service.to_string()),
        url: Some(check.url.clone()),
        attempts: Some(attempts),
        timeout_ms: Some(timeout_ms),
        remediation: Some(
            check
                .remediation
                .clone()
                .unwrap_or_else(|| generic_remediation(service)),
        ),
        last_error,
        ..Default::default()
    }))
}

fn generic_remediation(service: &str) -> String {
    format!(
        "Check the {service} container logs for startup errors and confirm \
         the health endpoint is reachable from the host."
    )
}
