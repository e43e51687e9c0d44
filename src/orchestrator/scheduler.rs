//! Bounded build scheduler.
//!
//! A message-passing job pool with two capacity tiers. Jobs are admitted
//! FIFO while the number in flight stays under the current limit; the
//! limit starts at the base tier (`worker_threads`) and can be expanded to
//! the maximum tier (`worker_threads * subprocesses_per_worker`) for
//! phases whose jobs mostly wait on the runtime daemon rather than the
//! CPU. Waiters observe completion through [`BuildScheduler::drain`],
//! which resolves only when the queue is empty and nothing is in flight.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Notify, oneshot};

use crate::report::{ProgressEvent, ProgressSink};

use super::settings::SchedulerSettings;

/// Scheduler construction and admission failures.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// The pool settings are unusable.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfiguration(String),
    /// The job cannot be admitted.
    #[error("invalid job: {0}")]
    InvalidJob(String),
}

/// Future produced by a job body.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<String, JobError>> + Send>>;

/// A job body: consumes its context, yields a value or a [`JobError`].
pub type JobFn = Box<dyn FnOnce(JobContext) -> JobFuture + Send>;

/// Failure payload of a rejected job.
#[derive(Debug, Clone)]
pub struct JobError {
    /// Failure description.
    pub message: String,
    /// Trailing output records to fold into the job's log.
    pub records: Vec<String>,
}

impl JobError {
    /// An error with no trailing records.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            records: Vec::new(),
        }
    }

    /// An error carrying trailing output records.
    #[must_use]
    pub fn with_records(message: impl Into<String>, records: Vec<String>) -> Self {
        Self {
            message: message.into(),
            records,
        }
    }
}

/// A unit of work identified by the service it builds.
pub struct Job {
    id: Option<String>,
    run: JobFn,
}

impl Job {
    /// A job for `id` running the given body.
    pub fn new<F, Fut>(id: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, JobError>> + Send + 'static,
    {
        Self {
            id: Some(id.into()),
            run: Box::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    /// A job without an identity; admission assigns a sequence id.
    pub fn anonymous<F, Fut>(body: F) -> Self
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, JobError>> + Send + 'static,
    {
        Self {
            id: None,
            run: Box::new(move |ctx| Box::pin(body(ctx))),
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}

/// Terminal status of a settled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The job returned a value.
    Fulfilled,
    /// The job returned an error.
    Rejected,
}

/// Settled outcome of one job.
///
/// Every admitted job settles exactly once; rejection is recorded, never
/// propagated as a panic or a dropped promise.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    /// Service identifier the job was enqueued under.
    pub id: String,
    /// Fulfilled or rejected.
    pub status: JobStatus,
    /// Success value, for fulfilled jobs.
    pub value: Option<String>,
    /// Failure description, for rejected jobs.
    pub error: Option<String>,
    /// Log lines the job emitted, plus any trailing error records.
    pub logs: Vec<String>,
    /// When the job left the queue.
    pub started_at: DateTime<Utc>,
    /// When the job settled.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl JobResult {
    /// True when the job fulfilled.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.status == JobStatus::Fulfilled
    }
}

/// Handle returned at admission; resolves when the job settles.
#[derive(Debug)]
pub struct JobHandle {
    rx: oneshot::Receiver<JobResult>,
}

impl JobHandle {
    /// Waits for the job to settle.
    ///
    /// Returns `None` only if the scheduler was dropped with the job
    /// still queued.
    pub async fn wait(self) -> Option<JobResult> {
        self.rx.await.ok()
    }
}

/// Handed to each job body; reports stage updates and log lines.
#[derive(Clone)]
pub struct JobContext {
    service: String,
    logs: Arc<Mutex<Vec<String>>>,
    progress: Option<ProgressSink>,
}

impl JobContext {
    /// The service this job builds.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Records a stage update.
    pub fn update(&self, message: &str) {
        self.append("info", message);
        if let Some(sink) = &self.progress {
            sink(ProgressEvent::Update {
                service: self.service.clone(),
                message: message.to_string(),
            });
        }
    }

    /// Records an output line.
    pub fn log(&self, line: &str) {
        self.append("log", line);
        if let Some(sink) = &self.progress {
            sink(ProgressEvent::Log {
                service: Some(self.service.clone()),
                line: line.to_string(),
            });
        }
    }

    /// Job log lines are timestamped and leveled; progress events carry
    /// the raw text.
    fn append(&self, level: &str, line: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(format!(
                "{} [{level}] {line}",
                Utc::now().format("%H:%M:%S")
            ));
        }
    }
}

struct QueuedJob {
    id: String,
    run: JobFn,
    reply: oneshot::Sender<JobResult>,
}

struct State {
    limit: usize,
    active: usize,
    seq: u64,
    queue: VecDeque<QueuedJob>,
    completed: Vec<JobResult>,
}

struct Inner {
    base_limit: usize,
    max_limit: usize,
    state: Mutex<State>,
    idle: Notify,
    progress: Option<ProgressSink>,
}

impl Inner {
    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }
}

/// Two-tier bounded job pool.
///
/// Cloning shares the pool; all clones feed the same queue.
#[derive(Clone)]
pub struct BuildScheduler {
    inner: Arc<Inner>,
}

impl BuildScheduler {
    /// Creates a pool at its base capacity tier.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidConfiguration`] when either
    /// setting is zero.
    pub fn new(
        settings: &SchedulerSettings,
        progress: Option<ProgressSink>,
    ) -> Result<Self, SchedulerError> {
        if settings.worker_threads == 0 {
            return Err(SchedulerError::InvalidConfiguration(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if settings.subprocesses_per_worker == 0 {
            return Err(SchedulerError::InvalidConfiguration(
                "subprocesses_per_worker must be at least 1".to_string(),
            ));
        }
        let base = settings.worker_threads;
        let max = settings.worker_threads * settings.subprocesses_per_worker;
        Ok(Self {
            inner: Arc::new(Inner {
                base_limit: base,
                max_limit: max,
                state: Mutex::new(State {
                    limit: base,
                    active: 0,
                    seq: 0,
                    queue: VecDeque::new(),
                    completed: Vec::new(),
                }),
                idle: Notify::new(),
                progress,
            }),
        })
    }

    /// The base-tier admission limit.
    #[must_use]
    pub fn base_limit(&self) -> usize {
        self.inner.base_limit
    }

    /// The maximum-tier admission limit.
    #[must_use]
    pub fn max_limit(&self) -> usize {
        self.inner.max_limit
    }

    /// Current `(active, queued, limit)` counts.
    #[must_use]
    pub fn snapshot(&self) -> (usize, usize, usize) {
        match self.inner.state.lock() {
            Ok(state) => (state.active, state.queue.len(), state.limit),
            Err(_) => (0, 0, 0),
        }
    }

    /// Admits a job onto the queue.
    ///
    /// Non-blocking; the returned handle settles when the job does. A job
    /// without an identity gets a generated sequence id.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidJob`] for a blank identifier.
    pub fn enqueue(&self, job: Job) -> Result<JobHandle, SchedulerError> {
        if job.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(SchedulerError::InvalidJob(
                "job identifier must be non-empty".to_string(),
            ));
        }

        let (tx, rx) = oneshot::channel();
        let id = {
            let Ok(mut state) = self.inner.state.lock() else {
                return Err(SchedulerError::InvalidConfiguration(
                    "scheduler state poisoned".to_string(),
                ));
            };
            state.seq += 1;
            let id = match job.id {
                Some(id) => id.trim().to_string(),
                None => format!("job-{}", state.seq),
            };
            state.queue.push_back(QueuedJob {
                id: id.clone(),
                run: job.run,
                reply: tx,
            });
            id
        };
        self.inner.emit(ProgressEvent::Enqueue { service: id });
        admit(&self.inner);
        Ok(JobHandle { rx })
    }

    /// Raises the admission limit to the maximum tier and admits any
    /// queued jobs the new limit allows.
    pub fn expand_capacity(&self) {
        let limit = self.inner.max_limit;
        if let Ok(mut state) = self.inner.state.lock() {
            state.limit = limit;
        }
        self.inner.emit(ProgressEvent::Capacity { limit });
        admit(&self.inner);
    }

    /// Restores the base-tier admission limit.
    ///
    /// Jobs already in flight are unaffected; only future admissions see
    /// the lower limit.
    pub fn restore_capacity(&self) {
        let limit = self.inner.base_limit;
        if let Ok(mut state) = self.inner.state.lock() {
            state.limit = limit;
        }
        self.inner.emit(ProgressEvent::Capacity { limit });
    }

    /// Waits until the pool is idle.
    ///
    /// Resolves immediately on an already-idle pool; otherwise suspends
    /// until the last in-flight job settles with an empty queue.
    pub async fn drain(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                if let Ok(state) = self.inner.state.lock() {
                    if state.active == 0 && state.queue.is_empty() {
                        return;
                    }
                }
            }
            notified.await;
        }
    }

    /// A copy of every result settled so far, in settlement order.
    #[must_use]
    pub fn results(&self) -> Vec<JobResult> {
        self.inner
            .state
            .lock()
            .map(|state| state.completed.clone())
            .unwrap_or_default()
    }

    /// Takes the settled results, clearing the list for the next phase.
    #[must_use]
    pub fn take_results(&self) -> Vec<JobResult> {
        self.inner
            .state
            .lock()
            .map(|mut state| std::mem::take(&mut state.completed))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for BuildScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (active, queued, limit) = self.snapshot();
        f.debug_struct("BuildScheduler")
            .field("active", &active)
            .field("queued", &queued)
            .field("limit", &limit)
            .finish()
    }
}

/// Admits queued jobs while the in-flight count stays under the limit.
///
/// Admission is the only place `active` is incremented, so the
/// `active <= limit` invariant holds at every admission point.
fn admit(inner: &Arc<Inner>) {
    loop {
        let (job, active, limit) = {
            let Ok(mut state) = inner.state.lock() else {
                return;
            };
            if state.active >= state.limit {
                return;
            }
            let Some(job) = state.queue.pop_front() else {
                return;
            };
            state.active += 1;
            (job, state.active, state.limit)
        };
        inner.emit(ProgressEvent::Start {
            service: job.id.clone(),
            active,
            limit,
        });
        run_job(inner, job);
    }
}

fn run_job(inner: &Arc<Inner>, job: QueuedJob) {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        let started_at = Utc::now();
        let clock = Instant::now();
        let logs: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let ctx = JobContext {
            service: job.id.clone(),
            logs: Arc::clone(&logs),
            progress: inner.progress.clone(),
        };

        let outcome = (job.run)(ctx).await;

        let duration_ms = clock.elapsed().as_millis() as u64;
        let mut collected = logs.lock().map(|l| l.clone()).unwrap_or_default();
        let result = match outcome {
            Ok(value) => {
                inner.emit(ProgressEvent::Complete {
                    service: job.id.clone(),
                    duration_ms,
                });
                JobResult {
                    id: job.id,
                    status: JobStatus::Fulfilled,
                    value: Some(value),
                    error: None,
                    logs: collected,
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms,
                }
            }
            Err(err) => {
                collected.extend(err.records);
                inner.emit(ProgressEvent::Error {
                    service: job.id.clone(),
                    message: err.message.clone(),
                });
                JobResult {
                    id: job.id,
                    status: JobStatus::Rejected,
                    value: None,
                    error: Some(err.message),
                    logs: collected,
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms,
                }
            }
        };

        let idle = {
            match inner.state.lock() {
                Ok(mut state) => {
                    state.active -= 1;
                    state.completed.push(result.clone());
                    state.active == 0 && state.queue.is_empty()
                }
                Err(_) => false,
            }
        };
        let _ = job.reply.send(result);

        if idle {
            inner.emit(ProgressEvent::Idle);
            inner.idle.notify_waiters();
        } else {
            admit(&inner);
        }
    });
}
