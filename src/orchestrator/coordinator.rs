//! High-level deployment verbs.
//!
//! The coordinator sequences runtime-adapter calls and, for builds, the
//! scheduler into the user-facing verbs: build, start, stop-all, clean,
//! delete-all, push and pull. It owns settings and lifecycle-history
//! persistence and narrates every step through the reporter boundary.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::report::{
    ContainerLogSink, ProgressEvent, ProgressSink, SharedReporter, TracingReporter,
};
use crate::runtime::{
    BuildRequest, DockerHost, HealthCheck, LogStreamOptions, OperationError, RemovalSummary,
    RemovalTargets, RunOptions, Selector,
};

use super::history::{HistoryStore, LifecycleEvent, LifecycleStatus};
use super::scheduler::{BuildScheduler, Job, JobError, JobResult, SchedulerError};
use super::services::{
    IMAGE_NAMESPACE, ORCHESTRATOR_SERVICE, STACK_NETWORK, STACK_PREFIX, ServiceSpec,
    container_name, find_service, image_permutations, image_tag, orchestrator_health_url,
    orchestrator_remediation,
};
use super::settings::{
    BootMode, DebugLevel, DeploymentSettings, SchedulerSettings, SettingsStore, SettingsUpdate,
    effective_debug_level,
};

/// Lines of container output retained for status and failure reporting.
const LOG_RING_CAPACITY: usize = 50;

/// Log lines shown per failed build in the summary.
const FAILURE_LOG_TAIL: usize = 5;

/// Seconds a container gets to stop gracefully.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Verb-level failures.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The service is not in the catalog.
    #[error("unknown service: {0}")]
    UnknownService(String),
    /// Start was requested for a service other than the orchestrator.
    #[error("unsupported service: {0} (only {ORCHESTRATOR_SERVICE} can be started)")]
    UnsupportedService(String),
    /// Destructive delete attempted without explicit confirmation.
    #[error("delete-all is irreversible and requires explicit confirmation")]
    ConfirmationRequired,
    /// Scheduler construction or admission failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// A runtime operation failed.
    #[error(transparent)]
    Runtime(#[from] OperationError),
    /// Settings or history persistence failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Options for the build verb.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Disable the runtime's build cache.
    pub no_cache: bool,
    /// Pool shape override; persisted settings apply when unset.
    pub concurrency: Option<SchedulerSettings>,
}

/// Outcome of a build batch.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Per-job results, settlement order.
    pub results: Vec<JobResult>,
}

impl BuildSummary {
    /// True when every job fulfilled.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.results.iter().all(JobResult::is_fulfilled)
    }

    /// Count of fulfilled jobs.
    #[must_use]
    pub fn fulfilled(&self) -> usize {
        self.results.iter().filter(|r| r.is_fulfilled()).count()
    }
}

/// Options for the start verb.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Requested debug verbosity; settings default when unset. Boot mode
    /// `super` overrides this to `super` either way.
    pub debug_level: Option<DebugLevel>,
    /// Requested boot profile; settings default when unset.
    pub boot_mode: Option<BootMode>,
}

/// Per-service outcome inside a batched verb.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    /// The service concerned.
    pub service: String,
    /// Whether the service's step succeeded.
    pub ok: bool,
    /// Outcome description.
    pub detail: String,
}

/// Outcome of a batched verb; overall `ok` is the conjunction of the
/// per-service outcomes.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-service outcomes, request order.
    pub entries: Vec<ServiceOutcome>,
}

impl BatchReport {
    /// True when every entry succeeded.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.entries.iter().all(|e| e.ok)
    }

    fn push(&mut self, service: &str, ok: bool, detail: impl Into<String>) {
        self.entries.push(ServiceOutcome {
            service: service.to_string(),
            ok,
            detail: detail.into(),
        });
    }

    fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.ok).count()
    }
}

/// Outcome of the stop-all verb.
#[derive(Debug, Clone, Default)]
pub struct StopAllReport {
    /// Containers stopped by this call.
    pub stopped: Vec<String>,
    /// Containers already stopped or gone.
    pub skipped: Vec<String>,
    /// Containers that failed to stop, with the failure message.
    pub failed: Vec<(String, String)>,
}

/// Sequencer of deployment verbs over one runtime host.
pub struct Coordinator {
    host: DockerHost,
    stack_root: PathBuf,
    settings: SettingsStore,
    history: HistoryStore,
    reporter: SharedReporter,
    progress: Option<ProgressSink>,
    log_sink: Option<ContainerLogSink>,
}

impl Coordinator {
    /// A coordinator over `host` with contexts resolved under
    /// `stack_root`, using default per-user stores and tracing narration.
    #[must_use]
    pub fn new(host: DockerHost, stack_root: impl Into<PathBuf>) -> Self {
        Self {
            host,
            stack_root: stack_root.into(),
            settings: SettingsStore::default_location(),
            history: HistoryStore::default_location(),
            reporter: Arc::new(TracingReporter),
            progress: None,
            log_sink: None,
        }
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Attaches a progress-event sink.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Attaches a container log sink.
    #[must_use]
    pub fn with_log_sink(mut self, sink: ContainerLogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Replaces the settings store.
    #[must_use]
    pub fn with_settings_store(mut self, store: SettingsStore) -> Self {
        self.settings = store;
        self
    }

    /// Replaces the history store.
    #[must_use]
    pub fn with_history_store(mut self, store: HistoryStore) -> Self {
        self.history = store;
        self
    }

    /// Current settings.
    #[must_use]
    pub fn fetch_settings(&self) -> DeploymentSettings {
        self.settings.fetch()
    }

    /// Merges a settings update and persists it.
    ///
    /// # Errors
    /// Returns error when the settings file cannot be written.
    pub fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<DeploymentSettings, CoordinatorError> {
        Ok(self.settings.update(update)?)
    }

    /// The persisted lifecycle history, oldest first.
    #[must_use]
    pub fn lifecycle_history(&self) -> Vec<LifecycleEvent> {
        self.history.read()
    }

    /// Builds the requested services' images.
    ///
    /// Two-phase schedule: every non-heavy service is enqueued at the
    /// base capacity tier and drained; only then, if the heavy service
    /// was requested, the pool widens to the maximum tier and the heavy
    /// job runs. The phase barrier lives here, not in the scheduler.
    ///
    /// # Errors
    /// Fails fast on unknown services or an unusable pool shape;
    /// individual build failures land in the summary instead.
    pub async fn build(
        &self,
        services: &[String],
        options: &BuildOptions,
    ) -> Result<BuildSummary, CoordinatorError> {
        let specs = self.resolve_services(services)?;
        let pool_shape = options
            .concurrency
            .unwrap_or_else(|| self.settings.fetch().build_scheduler);
        self.reporter.info(&format!(
            "building {} service(s) with {} worker(s), up to {} slots expanded",
            specs.len(),
            pool_shape.worker_threads,
            pool_shape.worker_threads * pool_shape.subprocesses_per_worker
        ));

        let scheduler = BuildScheduler::new(&pool_shape, self.progress.clone())?;
        let (light, heavy): (Vec<&ServiceSpec>, Vec<&ServiceSpec>) =
            specs.iter().copied().partition(|s| !s.heavy);

        for spec in &light {
            scheduler.enqueue(self.build_job(spec, options.no_cache))?;
        }
        scheduler.drain().await;

        if !heavy.is_empty() {
            self.reporter.info(&format!(
                "light builds drained; expanding capacity to {} for the heavy tier",
                scheduler.max_limit()
            ));
            scheduler.expand_capacity();
            for spec in &heavy {
                scheduler.enqueue(self.build_job(spec, options.no_cache))?;
            }
            scheduler.drain().await;
        }

        let summary = BuildSummary {
            results: scheduler.results(),
        };
        self.summarize_builds(&summary);
        self.record(
            "build",
            None,
            batch_status(summary.fulfilled(), summary.results.len()),
            format!(
                "built {} of {} service(s)",
                summary.fulfilled(),
                summary.results.len()
            ),
        );
        Ok(summary)
    }

    fn build_job(&self, spec: &ServiceSpec, no_cache: bool) -> Job {
        let host = self.host.clone();
        let context = self.stack_root.join(spec.context_dir);
        let dockerfile = context.join(spec.dockerfile);
        let tag = image_tag(spec.name);

        Job::new(spec.name, move |ctx| async move {
            ctx.update(&format!("packaging context {}", context.display()));
            let request = BuildRequest {
                context,
                dockerfile,
                tag: tag.clone(),
                build_args: std::collections::HashMap::new(),
                no_cache,
            };
            match host.build_image(&request).await {
                Ok(outcome) => {
                    for warning in &outcome.warnings {
                        ctx.log(warning);
                    }
                    Ok(format!("built {tag}"))
                }
                Err(e) => Err(JobError::with_records(
                    e.to_string(),
                    e.context.records.clone(),
                )),
            }
        })
    }

    fn summarize_builds(&self, summary: &BuildSummary) {
        let rows: Vec<Vec<String>> = summary
            .results
            .iter()
            .map(|r| {
                vec![
                    r.id.clone(),
                    if r.is_fulfilled() { "ok" } else { "failed" }.to_string(),
                    format!("{}ms", r.duration_ms),
                ]
            })
            .collect();
        self.reporter
            .table(&rows, Some(&["service", "status", "duration"]));

        for result in summary.results.iter().filter(|r| !r.is_fulfilled()) {
            let tail_start = result.logs.len().saturating_sub(FAILURE_LOG_TAIL);
            self.reporter.error(&format!(
                "{} failed: {}",
                result.id,
                result.error.as_deref().unwrap_or("unknown error")
            ));
            for line in &result.logs[tail_start..] {
                self.reporter.error(&format!("  {line}"));
            }
        }
    }

    /// Starts the requested services.
    ///
    /// Only the orchestrator is startable; any other requested service
    /// fails its own entry without aborting the batch.
    ///
    /// # Errors
    /// Fails only on unknown services; per-service failures land in the
    /// report.
    pub async fn start(
        &self,
        services: &[String],
        options: &StartOptions,
    ) -> Result<BatchReport, CoordinatorError> {
        self.resolve_services(services)?;
        let mut report = BatchReport::default();

        for service in services {
            if service != ORCHESTRATOR_SERVICE {
                let err = CoordinatorError::UnsupportedService(service.clone());
                self.reporter.error(&err.to_string());
                report.push(service, false, err.to_string());
                continue;
            }
            match self.start_orchestrator(options).await {
                Ok(detail) => {
                    self.reporter.success(&detail);
                    report.push(service, true, detail);
                }
                Err(e) => {
                    self.reporter.error(&e.to_string());
                    report.push(service, false, e.to_string());
                }
            }
        }
        Ok(report)
    }

    async fn start_orchestrator(
        &self,
        options: &StartOptions,
    ) -> Result<String, OperationError> {
        let name = container_name(ORCHESTRATOR_SERVICE);

        // Shared network first: create only on a confirmed not-found. Every
        // failing step from here on lands a failed lifecycle event.
        match self.host.inspect_network(STACK_NETWORK).await {
            Ok(_) => {}
            Err(e) if e.context.not_found == Some(true) => {
                self.reporter
                    .info(&format!("creating network {STACK_NETWORK}"));
                self.host
                    .create_network(STACK_NETWORK)
                    .await
                    .inspect_err(|e| self.record_start_failure(e))?;
            }
            Err(e) => {
                self.record_start_failure(&e);
                return Err(e);
            }
        }

        let settings = self.settings.fetch();
        let boot_mode = options.boot_mode.unwrap_or(settings.defaults.boot_mode);
        let debug_level =
            effective_debug_level(options.debug_level, boot_mode, &settings.defaults);

        let mut run = RunOptions::new(&name, image_tag(ORCHESTRATOR_SERVICE));
        run.network = Some(STACK_NETWORK.to_string());
        run.env.push(("DEBUG_LEVEL".to_string(), debug_level.as_str().to_string()));
        run.env.push(("BOOT_MODE".to_string(), boot_mode.as_str().to_string()));
        if let Some(spec) = find_service(ORCHESTRATOR_SERVICE) {
            run.ports = spec.ports.to_vec();
        }
        let endpoint = self.host.endpoint().clone();
        if let Some(path) = endpoint.local_path() {
            run.binds.push(format!("{path}:/var/run/docker.sock"));
        } else if let Some(address) = endpoint.remote_address() {
            run.env.push(("DOCKER_HOST".to_string(), address));
        }

        // A stale container of the same name blocks creation.
        self.host
            .remove_container(&name)
            .await
            .inspect_err(|e| self.record_start_failure(e))?;

        self.reporter.info(&format!(
            "starting {name} (debug={}, boot={})",
            debug_level.as_str(),
            boot_mode.as_str()
        ));
        let started = self.host.start_service(&run, None).await;
        let started = match started {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_start_failure(&e);
                return Err(e);
            }
        };
        for warning in &started.warnings {
            self.reporter.warn(warning);
        }

        // Tail logs into a bounded ring while the health gate runs; the
        // handle stops the stream on every exit path when dropped.
        let ring: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(VecDeque::with_capacity(LOG_RING_CAPACITY)));
        let sink_ring = Arc::clone(&ring);
        let forward_log = self.log_sink.clone();
        let forward_progress = self.progress.clone();
        let _stream = self.host.stream_logs(
            &name,
            &LogStreamOptions::default(),
            Arc::new(move |line: &str| {
                if let Ok(mut buffer) = sink_ring.lock() {
                    if buffer.len() == LOG_RING_CAPACITY {
                        buffer.pop_front();
                    }
                    buffer.push_back(line.to_string());
                }
                if let Some(sink) = &forward_log {
                    sink(ORCHESTRATOR_SERVICE, line);
                }
                if let Some(sink) = &forward_progress {
                    sink(ProgressEvent::Log {
                        service: Some(ORCHESTRATOR_SERVICE.to_string()),
                        line: line.to_string(),
                    });
                }
            }),
        );

        let mut check = HealthCheck::new(orchestrator_health_url());
        check.remediation = Some(orchestrator_remediation());
        if boot_mode == BootMode::Super {
            // Super boot emits diagnostics early; probe faster.
            check.interval = Duration::from_secs(1);
        }
        match self.host.wait_for_health(ORCHESTRATOR_SERVICE, &check).await {
            Ok(health) => {
                self.reporter.table(
                    &[vec![
                        name.clone(),
                        "healthy".to_string(),
                        format!("{} attempt(s)", health.attempts),
                        format!("status {}", health.status),
                    ]],
                    Some(&["container", "state", "probes", "http"]),
                );
                self.record(
                    "start",
                    Some(ORCHESTRATOR_SERVICE),
                    LifecycleStatus::Success,
                    format!("healthy after {} attempt(s)", health.attempts),
                );
                Ok(format!("{name} started and healthy"))
            }
            Err(e) => {
                let tail: Vec<String> = ring
                    .lock()
                    .map(|buffer| buffer.iter().cloned().collect())
                    .unwrap_or_default();
                self.record(
                    "start",
                    Some(ORCHESTRATOR_SERVICE),
                    LifecycleStatus::Failed,
                    format!("{e}; last logs: {}", tail.join(" | ")),
                );
                Err(e)
            }
        }
    }

    /// Stops every managed container.
    ///
    /// Reports a table even when nothing matched; stopping an absent or
    /// already-stopped container counts as skipped, not failed.
    ///
    /// # Errors
    /// Fails only when the container list itself cannot be fetched.
    pub async fn stop_all(&self) -> Result<StopAllReport, CoordinatorError> {
        let listed = self.host.list_containers(Some(STACK_PREFIX)).await?;
        let mut report = StopAllReport::default();
        let mut rows = Vec::new();

        for snapshot in &listed.data {
            match self.host.stop_container(&snapshot.name, STOP_TIMEOUT).await {
                Ok(outcome) if outcome.data.skipped => {
                    report.skipped.push(snapshot.name.clone());
                    rows.push(vec![snapshot.name.clone(), "already stopped".to_string()]);
                }
                Ok(_) => {
                    report.stopped.push(snapshot.name.clone());
                    rows.push(vec![snapshot.name.clone(), "stopped".to_string()]);
                }
                Err(e) => {
                    report.failed.push((snapshot.name.clone(), e.to_string()));
                    rows.push(vec![snapshot.name.clone(), format!("failed: {e}")]);
                }
            }
        }

        self.reporter.table(&rows, Some(&["container", "result"]));
        if rows.is_empty() {
            self.reporter.info("no managed containers found");
        }
        self.record(
            "stopAll",
            None,
            if report.failed.is_empty() {
                LifecycleStatus::Success
            } else {
                LifecycleStatus::Partial
            },
            format!(
                "stopped {}, skipped {}, failed {}",
                report.stopped.len(),
                report.skipped.len(),
                report.failed.len()
            ),
        );
        Ok(report)
    }

    /// Removes each service's container and image permutations; for the
    /// orchestrator, also the shared network. One lifecycle event per
    /// service; a service's failure never stops the loop.
    ///
    /// # Errors
    /// Fails only on unknown services.
    pub async fn clean(&self, services: &[String]) -> Result<BatchReport, CoordinatorError> {
        self.resolve_services(services)?;
        let mut report = BatchReport::default();

        for service in services {
            self.emit(ProgressEvent::Update {
                service: service.clone(),
                message: "cleaning".to_string(),
            });
            let mut targets = RemovalTargets {
                containers: Some(Selector::Names(vec![container_name(service)])),
                images: Some(Selector::Names(image_permutations(service))),
                ..Default::default()
            };
            if service == ORCHESTRATOR_SERVICE {
                targets.networks = Some(Selector::Names(vec![STACK_NETWORK.to_string()]));
            }

            let summary = self.host.remove_resources(&targets).await;
            let detail = format!(
                "removed {} resource(s), {} error(s)",
                summary.removed_count(),
                summary.errors.len()
            );
            let status = removal_status(&summary);
            self.record("clean", Some(service), status, detail.clone());
            if summary.ok() {
                self.reporter.success(&format!("{service}: {detail}"));
            } else {
                for err in &summary.errors {
                    self.reporter
                        .warn(&format!("{service}: {} {}: {}", err.operation, err.target, err.message));
                }
            }
            report.push(service, summary.ok(), detail);
        }
        Ok(report)
    }

    /// Destroys every managed resource across all four kinds.
    ///
    /// Irreversible; requires `confirm`. Without it the verb aborts with
    /// a cancelled lifecycle event and no other side effect.
    ///
    /// # Errors
    /// Returns [`CoordinatorError::ConfirmationRequired`] without
    /// `confirm`.
    pub async fn delete_all(&self, confirm: bool) -> Result<RemovalSummary, CoordinatorError> {
        if !confirm {
            self.record(
                "deleteAll",
                None,
                LifecycleStatus::Cancelled,
                "confirmation not given",
            );
            return Err(CoordinatorError::ConfirmationRequired);
        }

        self.reporter
            .warn("removing all managed containers, images, volumes and networks");
        let targets = RemovalTargets {
            containers: Some(Selector::prefix(STACK_PREFIX)),
            images: Some(Selector::prefix(&format!("{IMAGE_NAMESPACE}/"))),
            volumes: Some(Selector::prefix(IMAGE_NAMESPACE)),
            networks: Some(Selector::Names(vec![STACK_NETWORK.to_string()])),
        };
        let summary = self.host.remove_resources(&targets).await;

        self.record(
            "deleteAll",
            None,
            removal_status(&summary),
            format!(
                "removed {} resource(s), {} error(s)",
                summary.removed_count(),
                summary.errors.len()
            ),
        );
        Ok(summary)
    }

    /// Pushes each service's image; continues past per-service failures.
    ///
    /// # Errors
    /// Fails only on unknown services.
    pub async fn push(&self, services: &[String]) -> Result<BatchReport, CoordinatorError> {
        self.resolve_services(services)?;
        let mut report = BatchReport::default();
        for service in services {
            let tag = image_tag(service);
            match self.host.push_image(&tag).await {
                Ok(outcome) => {
                    for warning in &outcome.warnings {
                        self.reporter.warn(warning);
                    }
                    report.push(service, true, format!("pushed {tag}"));
                }
                Err(e) => {
                    self.reporter.error(&e.to_string());
                    report.push(service, false, e.to_string());
                }
            }
        }
        self.record(
            "push",
            None,
            batch_status(report.succeeded(), report.entries.len()),
            format!(
                "pushed {} of {} image(s)",
                report.succeeded(),
                report.entries.len()
            ),
        );
        Ok(report)
    }

    /// Pulls each service's image; continues past per-service failures.
    ///
    /// # Errors
    /// Fails only on unknown services.
    pub async fn pull(&self, services: &[String]) -> Result<BatchReport, CoordinatorError> {
        self.resolve_services(services)?;
        let mut report = BatchReport::default();
        for service in services {
            let tag = image_tag(service);
            match self.host.pull_image(&tag).await {
                Ok(_) => report.push(service, true, format!("pulled {tag}")),
                Err(e) => {
                    self.reporter.error(&e.to_string());
                    report.push(service, false, e.to_string());
                }
            }
        }
        self.record(
            "pull",
            None,
            batch_status(report.succeeded(), report.entries.len()),
            format!(
                "pulled {} of {} image(s)",
                report.succeeded(),
                report.entries.len()
            ),
        );
        Ok(report)
    }

    /// Status rows for every managed container: name, image, state, ports.
    ///
    /// # Errors
    /// Fails when the container list cannot be fetched.
    pub async fn host_status(&self) -> Result<Vec<Vec<String>>, CoordinatorError> {
        let listed = self.host.list_containers(Some(STACK_PREFIX)).await?;
        Ok(listed
            .data
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.image.clone(),
                    c.state.clone(),
                    c.ports.join(", "),
                ]
            })
            .collect())
    }

    fn resolve_services(
        &self,
        services: &[String],
    ) -> Result<Vec<&'static ServiceSpec>, CoordinatorError> {
        services
            .iter()
            .map(|name| {
                find_service(name).ok_or_else(|| CoordinatorError::UnknownService(name.clone()))
            })
            .collect()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }

    fn record(
        &self,
        action: &str,
        service: Option<&str>,
        status: LifecycleStatus,
        details: impl Into<String>,
    ) {
        if let Err(e) = self.history.record(action, service, status, details) {
            tracing::warn!("failed to persist lifecycle event: {e}");
        }
    }

    fn record_start_failure(&self, error: &OperationError) {
        self.record(
            "start",
            Some(ORCHESTRATOR_SERVICE),
            LifecycleStatus::Failed,
            error.to_string(),
        );
    }
}

/// Status of a batch given its success count.
fn batch_status(ok: usize, total: usize) -> LifecycleStatus {
    if ok == total {
        LifecycleStatus::Success
    } else if ok == 0 && total > 0 {
        LifecycleStatus::Failed
    } else {
        LifecycleStatus::Partial
    }
}

/// Status of a removal pass from its summary.
fn removal_status(summary: &RemovalSummary) -> LifecycleStatus {
    if summary.ok() {
        LifecycleStatus::Success
    } else if summary.any_removed() {
        LifecycleStatus::Partial
    } else {
        LifecycleStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::result::RemovalError;

    #[test]
    fn test_batch_status_boundaries() {
        assert_eq!(batch_status(3, 3), LifecycleStatus::Success);
        assert_eq!(batch_status(1, 3), LifecycleStatus::Partial);
        assert_eq!(batch_status(0, 3), LifecycleStatus::Failed);
        assert_eq!(batch_status(0, 0), LifecycleStatus::Success);
    }

    #[test]
    fn test_removal_status_partial_when_mixed() {
        let mut summary = RemovalSummary::default();
        summary.containers.push("stackpilot-api".to_string());
        assert_eq!(removal_status(&summary), LifecycleStatus::Success);

        summary.errors.push(RemovalError {
            operation: "removeImage".to_string(),
            target: "stackpilot/api:latest".to_string(),
            message: "in use".to_string(),
            code: Some(409),
        });
        assert_eq!(removal_status(&summary), LifecycleStatus::Partial);

        let mut all_failed = RemovalSummary::default();
        all_failed.errors.push(RemovalError {
            operation: "removeContainer".to_string(),
            target: "stackpilot-api".to_string(),
            message: "denied".to_string(),
            code: None,
        });
        assert_eq!(removal_status(&all_failed), LifecycleStatus::Failed);
    }

    #[test]
    fn test_batch_report_conjunction() {
        let mut report = BatchReport::default();
        report.push("api", true, "ok");
        assert!(report.ok());
        report.push("gateway", false, "boom");
        assert!(!report.ok());
        assert_eq!(report.succeeded(), 1);
    }
}
