//! Deployment orchestration.
//!
//! The scheduler, service catalog, settings and history stores, and the
//! coordinator that sequences them into user-facing verbs.

pub mod coordinator;
pub mod history;
pub mod scheduler;
pub mod services;
pub mod settings;

pub use coordinator::{
    BatchReport, BuildOptions, BuildSummary, Coordinator, CoordinatorError, ServiceOutcome,
    StartOptions, StopAllReport,
};
pub use history::{HISTORY_CAP, HistoryStore, LifecycleEvent, LifecycleStatus};
pub use scheduler::{
    BuildScheduler, Job, JobContext, JobError, JobHandle, JobResult, JobStatus, SchedulerError,
};
pub use services::{ORCHESTRATOR_SERVICE, SERVICES, STACK_NETWORK, STACK_PREFIX, ServiceSpec};
pub use settings::{
    BootMode, DebugLevel, DeploymentSettings, SchedulerSettings, SettingsStore, SettingsUpdate,
    effective_debug_level,
};
