//! Container-runtime integration.
//!
//! Everything that talks to the container runtime lives here: endpoint
//! resolution, the remote-API adapter, build-context packaging, health
//! polling, log streaming and the normalized result envelopes shared by
//! all of them.

pub mod adapter;
pub mod context;
pub mod endpoint;
pub mod health;
pub mod logs;
pub mod result;

pub use adapter::{
    BuildRequest, DockerHost, NetworkInfo, RemovalTargets, RunOptions, Selector,
    ServiceStartReport,
};
pub use endpoint::{Endpoint, ResolveInput, resolve};
pub use health::{HealthCheck, HealthReport, wait_for_health};
pub use logs::{LineSink, LogStreamHandle, LogStreamOptions, stream_logs};
pub use result::{
    ContainerSnapshot, ErrorContext, OpOutcome, OpResult, OperationError, RemovalError,
    RemovalSummary, StopOutcome,
};
