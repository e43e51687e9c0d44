//! Stackpilot - Main entry point.
//!
//! Thin command-line dispatch over the orchestration engine.
//!
//! Usage: stackpilot <verb> [SERVICES...] [OPTIONS]
//!
//! Verbs:
//!   build       Build service images (all services when none given)
//!   start       Start the orchestrator service
//!   stop-all    Stop every managed container
//!   clean       Remove per-service containers and images
//!   delete-all  Remove everything (requires --yes)
//!   push        Push service images
//!   pull        Pull service images
//!   status      List managed containers
//!   history     Show the lifecycle history
//!
//! Options:
//!   --no-cache       Build without the runtime's cache
//!   --yes            Confirm destructive operations
//!   --version, -v    Show version

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use stackpilot::logging::{self, LogConfig};
use stackpilot::orchestrator::{BuildOptions, Coordinator, StartOptions, services};
use stackpilot::report::Reporter;
use stackpilot::runtime::DockerHost;

/// Crate version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reporter printing narration to stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn warn(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }

    fn success(&self, msg: &str) {
        println!("✓ {msg}");
    }

    fn table(&self, rows: &[Vec<String>], columns: Option<&[&str]>) {
        if let Some(cols) = columns {
            println!("{}", cols.join("  |  "));
        }
        for row in rows {
            println!("{}", row.join("  |  "));
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("stackpilot v{VERSION}");
        return ExitCode::SUCCESS;
    }

    let Some(verb) = args.get(1).filter(|a| !a.starts_with('-')).cloned() else {
        eprintln!("usage: stackpilot <verb> [SERVICES...] [OPTIONS]");
        return ExitCode::FAILURE;
    };

    if let Err(e) = logging::init(&LogConfig::default()) {
        eprintln!("warning: logging unavailable: {e}");
    }

    let no_cache = args.iter().any(|a| a == "--no-cache");
    let confirm = args.iter().any(|a| a == "--yes");
    let mut requested: Vec<String> = args
        .iter()
        .skip(2)
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .collect();
    if requested.is_empty() {
        requested = services::service_names()
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    let stack_root = env::current_dir().unwrap_or_else(|_| ".".into());
    let coordinator = {
        let settings = stackpilot::orchestrator::SettingsStore::default_location();
        let socket = settings.fetch().host_docker_socket_override;
        let host = match DockerHost::connect(socket.as_deref()) {
            Ok(host) => host,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        };
        Coordinator::new(host, stack_root)
            .with_settings_store(settings)
            .with_reporter(Arc::new(ConsoleReporter))
    };

    let ok = match verb.as_str() {
        "build" => match coordinator
            .build(&requested, &BuildOptions {
                no_cache,
                concurrency: None,
            })
            .await
        {
            Ok(summary) => summary.ok(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "start" => {
            let targets = if args.len() > 2 {
                requested
            } else {
                vec![services::ORCHESTRATOR_SERVICE.to_string()]
            };
            match coordinator.start(&targets, &StartOptions::default()).await {
                Ok(report) => report.ok(),
                Err(e) => {
                    eprintln!("error: {e}");
                    false
                }
            }
        }
        "stop-all" => match coordinator.stop_all().await {
            Ok(report) => report.failed.is_empty(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "clean" => match coordinator.clean(&requested).await {
            Ok(report) => report.ok(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "delete-all" => match coordinator.delete_all(confirm).await {
            Ok(summary) => summary.ok(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "push" => match coordinator.push(&requested).await {
            Ok(report) => report.ok(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "pull" => match coordinator.pull(&requested).await {
            Ok(report) => report.ok(),
            Err(e) => {
                eprintln!("error: {e}");
                false
            }
        },
        "status" => {
            let reporter = ConsoleReporter;
            match coordinator.host_status().await {
                Ok(rows) => {
                    reporter.table(&rows, Some(&["container", "image", "state", "ports"]));
                    true
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    false
                }
            }
        }
        "history" => {
            for event in coordinator.lifecycle_history() {
                println!(
                    "{}  {:10}  {:12}  {}",
                    event.timestamp,
                    event.action,
                    event.service.as_deref().unwrap_or("-"),
                    event.details
                );
            }
            true
        }
        other => {
            eprintln!("unknown verb: {other}");
            false
        }
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
