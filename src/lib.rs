//! Stackpilot
//!
//! A deployment orchestrator for a multi-service container stack: builds,
//! pushes, pulls, starts, cleans and tears down a fixed set of named
//! services against a container runtime.
//!
//! # Architecture
//!
//! - **Runtime Module**: socket resolution, remote-API adapter, build
//!   context packaging, health polling and log streaming
//! - **Orchestrator Module**: bounded build scheduler, service catalog,
//!   settings/history persistence and the verb coordinator
//! - **Report Module**: the reporter and progress-event boundary consumed
//!   by UI, CLI and HTTP-server collaborators
//!
//! # Usage
//!
//! ```no_run
//! use stackpilot::orchestrator::{BuildOptions, Coordinator};
//! use stackpilot::runtime::DockerHost;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let host = DockerHost::connect(None)?;
//! let coordinator = Coordinator::new(host, "./stack");
//! let summary = coordinator
//!     .build(&["api".to_string()], &BuildOptions::default())
//!     .await?;
//! assert!(summary.ok());
//! # Ok(())
//! # }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]

pub mod logging;
pub mod orchestrator;
pub mod report;
pub mod runtime;

// Re-export main types
pub use orchestrator::{BuildOptions, Coordinator, CoordinatorError, StartOptions};
pub use report::{ProgressEvent, ProgressSink, Reporter, SharedReporter};
pub use runtime::{DockerHost, Endpoint, OperationError};
