//! Container-runtime adapter.
//!
//! [`DockerHost`] is a thin, normalized wrapper over the runtime's remote
//! API: image build/push/pull, container create/start/stop, log streaming,
//! bulk removal, and network inspect/create. Nothing throws past this
//! boundary; every failure becomes an [`OperationError`] envelope.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions,
};
use bollard::image::{
    BuildImageOptions, CreateImageOptions, ListImagesOptions, PushImageOptions,
    RemoveImageOptions,
};
use bollard::models::{HostConfig, PortBinding};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::volume::ListVolumesOptions;
use tokio_stream::StreamExt as _;

use super::endpoint::{self, Endpoint, ResolveInput};
use super::health::{HealthCheck, HealthReport, wait_for_health};
use super::logs::{LineSink, LogStreamHandle, LogStreamOptions, stream_logs};
use super::result::{
    ContainerSnapshot, ErrorContext, OpOutcome, OpResult, OperationError, RemovalError,
    RemovalSummary, StopOutcome,
};
use super::context;

/// Connection timeout for daemon clients, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Networks that bulk removal never touches.
const BUILTIN_NETWORKS: &[&str] = &["bridge", "host", "none"];

/// Maximum progress records carried in a build failure context.
const ERROR_RECORD_TAIL: usize = 20;

/// An image build request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory.
    pub context: PathBuf,
    /// Dockerfile path (inside the context).
    pub dockerfile: PathBuf,
    /// Image tag to produce.
    pub tag: String,
    /// Build arguments.
    pub build_args: HashMap<String, String>,
    /// Disable the build cache.
    pub no_cache: bool,
}

/// Options for creating and starting a container.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Container name.
    pub name: String,
    /// Image reference to run.
    pub image: String,
    /// Environment entries as `(key, value)` pairs.
    pub env: Vec<(String, String)>,
    /// Network to attach to.
    pub network: Option<String>,
    /// Host bind mounts, `host:container` form.
    pub binds: Vec<String>,
    /// TCP port mappings as `(container, host)` pairs.
    pub ports: Vec<(u16, u16)>,
    /// Remove the container automatically on exit.
    pub auto_remove: bool,
}

impl RunOptions {
    /// Options for running `image` under `name` with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            network: None,
            binds: Vec::new(),
            ports: Vec::new(),
            auto_remove: true,
        }
    }
}

/// Result of a bundled service start.
#[derive(Debug, Clone)]
pub struct ServiceStartReport {
    /// The started container's identifier.
    pub container_id: String,
    /// Health confirmation, when a health check was requested.
    pub health: Option<HealthReport>,
}

/// Selects resources of one kind for bulk removal.
#[derive(Clone)]
pub enum Selector {
    /// Exact names.
    Names(Vec<String>),
    /// Daemon-side list filters.
    Filters(HashMap<String, Vec<String>>),
    /// Client-side name predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Selector {
    /// Selector matching names with the given prefix.
    #[must_use]
    pub fn prefix(prefix: &str) -> Self {
        let prefix = prefix.to_string();
        Self::Predicate(Arc::new(move |name| name.starts_with(&prefix)))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Names(names) => names.iter().any(|n| n == name),
            // Daemon applied the filters during listing.
            Self::Filters(_) => true,
            Self::Predicate(f) => f(name),
        }
    }

    fn filters(&self) -> HashMap<String, Vec<String>> {
        match self {
            Self::Filters(filters) => filters.clone(),
            _ => HashMap::new(),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Names(names) => f.debug_tuple("Names").field(names).finish(),
            Self::Filters(filters) => f.debug_tuple("Filters").field(filters).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Per-kind selectors for a bulk removal pass.
#[derive(Debug, Clone, Default)]
pub struct RemovalTargets {
    /// Container selector.
    pub containers: Option<Selector>,
    /// Image selector, matched against repo tags.
    pub images: Option<Selector>,
    /// Volume selector.
    pub volumes: Option<Selector>,
    /// Network selector.
    pub networks: Option<Selector>,
}

/// Normalized wrapper over the container runtime's remote API.
///
/// The underlying daemon client is stateless and safe for concurrent use
/// by multiple in-flight operations; `DockerHost` is cheap to clone.
#[derive(Clone)]
pub struct DockerHost {
    docker: Docker,
    endpoint: Endpoint,
}

impl fmt::Debug for DockerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerHost")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl DockerHost {
    /// Connects to the daemon, resolving the endpoint from the explicit
    /// override, environment, detection, then platform default.
    pub fn connect(explicit_socket: Option<&str>) -> Result<Self, OperationError> {
        let env_host = std::env::var("DOCKER_HOST").ok();
        let endpoint = endpoint::resolve(&ResolveInput {
            explicit: explicit_socket,
            env_host: env_host.as_deref(),
            windows: cfg!(windows),
            detector: Some(&endpoint::default_detector),
        });
        Self::from_endpoint(endpoint)
    }

    /// Connects to a pre-resolved endpoint.
    pub fn from_endpoint(endpoint: Endpoint) -> Result<Self, OperationError> {
        let docker = match &endpoint {
            Endpoint::UnixSocket(path) => Docker::connect_with_unix(
                path,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            Endpoint::NamedPipe(path) => Self::connect_named_pipe(path),
            Endpoint::Tcp {
                host,
                port,
                protocol,
            } => Docker::connect_with_http(
                &format!("{protocol}://{host}:{port}"),
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| OperationError::from_runtime("connect", &e))?;
        Ok(Self { docker, endpoint })
    }

    #[cfg(windows)]
    fn connect_named_pipe(path: &str) -> Result<Docker, bollard::errors::Error> {
        Docker::connect_with_named_pipe(path, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
    }

    #[cfg(not(windows))]
    fn connect_named_pipe(path: &str) -> Result<Docker, bollard::errors::Error> {
        // Named pipes only exist on Windows; fall back to the default
        // local connection rather than failing outright.
        let _ = path;
        Docker::connect_with_local_defaults()
    }

    /// The endpoint this host talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The underlying daemon client, for log streaming.
    #[must_use]
    pub fn client(&self) -> &Docker {
        &self.docker
    }

    /// Pings the daemon.
    pub async fn ping(&self) -> OpResult<()> {
        self.docker
            .ping()
            .await
            .map(|_| OpOutcome::new(()))
            .map_err(|e| OperationError::from_runtime("ping", &e))
    }

    /// Builds an image from a context directory.
    ///
    /// The context is packaged into a tar stream honoring `.dockerignore`
    /// rules; the collected progress records are the data payload, and any
    /// record containing "warning" (case-insensitive) surfaces as a
    /// warning.
    pub async fn build_image(&self, request: &BuildRequest) -> OpResult<Vec<String>> {
        let tar_bytes = context::pack_context(&request.context, &request.dockerfile)
            .map_err(|e| OperationError::new("buildImage", e.to_string()))?;
        let dockerfile_rel = context::dockerfile_relative(&request.context, &request.dockerfile)
            .map_err(|e| OperationError::new("buildImage", e.to_string()))?;

        let options = BuildImageOptions::<String> {
            dockerfile: dockerfile_rel,
            t: request.tag.clone(),
            nocache: request.no_cache,
            buildargs: request.build_args.clone(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(
            options,
            None,
            Some(bollard::body_full(bytes::Bytes::from(tar_bytes))),
        );

        let mut records: Vec<String> = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(line) = info.stream {
                        let line = line.trim_end();
                        if !line.is_empty() {
                            records.push(line.to_string());
                        }
                    }
                    if let Some(status) = info.status {
                        records.push(status);
                    }
                    if let Some(error) = info.error {
                        return Err(Self::stream_failure("buildImage", &error, &records));
                    }
                }
                Err(e) => {
                    let err = OperationError::from_runtime("buildImage", &e);
                    return Err(err.with_context(ErrorContext {
                        records: record_tail(&records),
                        ..Default::default()
                    }));
                }
            }
        }

        let warnings = extract_warnings(&records);
        Ok(OpOutcome::with_warnings(records, warnings))
    }

    /// Pushes an image to its registry.
    pub async fn push_image(&self, image: &str) -> OpResult<Vec<String>> {
        let (repo, tag) = split_image_tag(image);
        let options = PushImageOptions::<String> { tag };
        let mut stream = self.docker.push_image(&repo, Some(options), None);

        let mut records = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(status) = info.status {
                        records.push(status);
                    }
                    if let Some(error) = info.error {
                        return Err(Self::stream_failure("pushImage", &error, &records));
                    }
                }
                Err(e) => {
                    let err = OperationError::from_runtime("pushImage", &e);
                    return Err(err.with_context(ErrorContext {
                        records: record_tail(&records),
                        ..Default::default()
                    }));
                }
            }
        }
        let warnings = extract_warnings(&records);
        Ok(OpOutcome::with_warnings(records, warnings))
    }

    /// Pulls an image from its registry.
    pub async fn pull_image(&self, image: &str) -> OpResult<Vec<String>> {
        let (repo, tag) = split_image_tag(image);
        let options = CreateImageOptions::<String> {
            from_image: repo,
            tag,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);

        let mut records = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(status) = info.status {
                        records.push(status);
                    }
                    if let Some(error) = info.error {
                        return Err(Self::stream_failure("pullImage", &error, &records));
                    }
                }
                Err(e) => {
                    let err = OperationError::from_runtime("pullImage", &e);
                    return Err(err.with_context(ErrorContext {
                        records: record_tail(&records),
                        ..Default::default()
                    }));
                }
            }
        }
        let warnings = extract_warnings(&records);
        Ok(OpOutcome::with_warnings(records, warnings))
    }

    /// Creates and starts a container.
    pub async fn run_container(&self, options: &RunOptions) -> OpResult<String> {
        let env: Vec<String> = options
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for (container_port, host_port) in &options.ports {
            let key = format!("{container_port}/tcp");
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                }]),
            );
        }

        let host_config = HostConfig {
            auto_remove: Some(options.auto_remove),
            network_mode: options.network.clone(),
            binds: if options.binds.is_empty() {
                None
            } else {
                Some(options.binds.clone())
            },
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            ..Default::default()
        };

        let config = Config {
            image: Some(options.image.clone()),
            env: Some(env),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: options.name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| OperationError::from_runtime("runContainer", &e))?;

        self.docker
            .start_container(
                &options.name,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(|e| OperationError::from_runtime("runContainer", &e))?;

        Ok(OpOutcome::new(created.id))
    }

    /// Runs a container and confirms it came up attached to the requested
    /// network, then optionally gates on a health check.
    ///
    /// An inspection showing the container outside the requested network
    /// fails explicitly with `network_attached: false` context; this
    /// guards against silent misconfiguration.
    pub async fn start_service(
        &self,
        options: &RunOptions,
        health: Option<&HealthCheck>,
    ) -> OpResult<ServiceStartReport> {
        let run = self.run_container(options).await?;
        let container_id = run.data;
        let mut warnings = run.warnings;

        if let Some(network) = &options.network {
            let attached = self.is_attached(&options.name, network).await?;
            if !attached {
                return Err(OperationError::new(
                    "startService",
                    format!(
                        "container {} is not attached to network {network}",
                        options.name
                    ),
                )
                .with_reason("network_missing")
                .with_context(ErrorContext {
                    name: Some(options.name.clone()),
                    network_attached: Some(false),
                    remediation: Some(format!(
                        "Recreate the {network} network and restart the service."
                    )),
                    ..Default::default()
                }));
            }
        }

        let health_report = match health {
            Some(check) => Some(wait_for_health(&options.name, check).await?),
            None => None,
        };

        if let Some(report) = &health_report {
            if report.attempts > 1 {
                warnings.push(format!(
                    "{} needed {} health probes before responding",
                    options.name, report.attempts
                ));
            }
        }

        Ok(OpOutcome::with_warnings(
            ServiceStartReport {
                container_id,
                health: health_report,
            },
            warnings,
        ))
    }

    /// True when the container's inspection lists the network.
    async fn is_attached(&self, name: &str, network: &str) -> Result<bool, OperationError> {
        let inspection = self
            .docker
            .inspect_container(
                name,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
            .map_err(|e| OperationError::from_runtime("startService", &e))?;
        Ok(inspection
            .network_settings
            .and_then(|s| s.networks)
            .is_some_and(|networks| networks.contains_key(network)))
    }

    /// Attaches to a container's log stream; see [`stream_logs`].
    #[must_use]
    pub fn stream_logs(
        &self,
        name: &str,
        options: &LogStreamOptions,
        on_line: LineSink,
    ) -> LogStreamHandle {
        stream_logs(self.docker.clone(), name, options, on_line)
    }

    /// Polls a health endpoint; see [`wait_for_health`].
    pub async fn wait_for_health(
        &self,
        service: &str,
        check: &HealthCheck,
    ) -> Result<HealthReport, OperationError> {
        wait_for_health(service, check).await
    }

    /// Stops a container, idempotently.
    ///
    /// A 404 (not found) or 304 (already stopped) from the daemon is
    /// success with `skipped: true`, not an error.
    pub async fn stop_container(&self, name: &str, timeout: Duration) -> OpResult<StopOutcome> {
        let options = bollard::query_parameters::StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => Ok(OpOutcome::new(StopOutcome { skipped: false })),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404 | 304,
                ..
            }) => Ok(OpOutcome::new(StopOutcome { skipped: true })),
            Err(e) => Err(OperationError::from_runtime("stopContainer", &e)),
        }
    }

    /// Force-removes a container, idempotently (404 is skipped success).
    pub async fn remove_container(&self, name: &str) -> OpResult<StopOutcome> {
        let options = bollard::query_parameters::RemoveContainerOptions {
            force: true,
            v: false,
            link: false,
        };
        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => Ok(OpOutcome::new(StopOutcome { skipped: false })),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(OpOutcome::new(StopOutcome { skipped: true })),
            Err(e) => Err(OperationError::from_runtime("removeContainer", &e)),
        }
    }

    /// Best-effort bulk removal across resource kinds.
    ///
    /// For each kind with a selector: list candidates, filter, and attempt
    /// removal of each. Individual failures are appended to the summary's
    /// error list; the pass never aborts early and the full summary is
    /// always returned. Removal is exhaustive, not atomic.
    pub async fn remove_resources(&self, targets: &RemovalTargets) -> RemovalSummary {
        let mut summary = RemovalSummary::default();

        if let Some(selector) = &targets.containers {
            self.remove_matching_containers(selector, &mut summary).await;
        }
        if let Some(selector) = &targets.images {
            self.remove_matching_images(selector, &mut summary).await;
        }
        if let Some(selector) = &targets.volumes {
            self.remove_matching_volumes(selector, &mut summary).await;
        }
        if let Some(selector) = &targets.networks {
            self.remove_matching_networks(selector, &mut summary).await;
        }

        summary
    }

    async fn remove_matching_containers(
        &self,
        selector: &Selector,
        summary: &mut RemovalSummary,
    ) {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: selector.filters(),
            ..Default::default()
        };
        let listed = match self.docker.list_containers(Some(options)).await {
            Ok(listed) => listed,
            Err(e) => {
                summary.errors.push(removal_error("listContainers", "*", &e));
                return;
            }
        };

        for container in listed {
            let name = container
                .names
                .as_deref()
                .and_then(|names| names.first())
                .map(|n| n.trim_start_matches('/').to_string())
                .or(container.id.clone())
                .unwrap_or_default();
            if name.is_empty() || !selector.matches(&name) {
                continue;
            }
            // Stop first so force-removal does not race auto-remove.
            let _ = self.stop_container(&name, Duration::from_secs(5)).await;
            match self.remove_container(&name).await {
                Ok(_) => summary.containers.push(name),
                Err(e) => summary.errors.push(RemovalError {
                    operation: "removeContainer".to_string(),
                    target: name,
                    message: e.message,
                    code: e.code,
                }),
            }
        }
    }

    async fn remove_matching_images(&self, selector: &Selector, summary: &mut RemovalSummary) {
        let options = ListImagesOptions::<String> {
            all: false,
            filters: selector.filters(),
            ..Default::default()
        };
        let listed = match self.docker.list_images(Some(options)).await {
            Ok(listed) => listed,
            Err(e) => {
                summary.errors.push(removal_error("listImages", "*", &e));
                return;
            }
        };

        for image in listed {
            let matched: Vec<String> = image
                .repo_tags
                .iter()
                .filter(|tag| selector.matches(tag) || selector.matches(trim_tag(tag)))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            for reference in matched {
                let remove_options = RemoveImageOptions {
                    force: true,
                    noprune: false,
                };
                match self
                    .docker
                    .remove_image(&reference, Some(remove_options), None)
                    .await
                {
                    Ok(_) => summary.images.push(reference),
                    Err(e) => summary.errors.push(removal_error(
                        "removeImage",
                        &reference,
                        &e,
                    )),
                }
            }
        }
    }

    async fn remove_matching_volumes(&self, selector: &Selector, summary: &mut RemovalSummary) {
        let options = ListVolumesOptions::<String> {
            filters: selector.filters(),
        };
        let listed = match self.docker.list_volumes(Some(options)).await {
            Ok(listed) => listed,
            Err(e) => {
                summary.errors.push(removal_error("listVolumes", "*", &e));
                return;
            }
        };

        for volume in listed.volumes.unwrap_or_default() {
            let name = volume.name;
            if !selector.matches(&name) {
                continue;
            }
            let remove_options = bollard::query_parameters::RemoveVolumeOptions { force: true };
            match self.docker.remove_volume(&name, Some(remove_options)).await {
                Ok(()) => summary.volumes.push(name),
                Err(e) => summary.errors.push(removal_error("removeVolume", &name, &e)),
            }
        }
    }

    async fn remove_matching_networks(&self, selector: &Selector, summary: &mut RemovalSummary) {
        let options = ListNetworksOptions::<String> {
            filters: selector.filters(),
        };
        let listed = match self.docker.list_networks(Some(options)).await {
            Ok(listed) => listed,
            Err(e) => {
                summary.errors.push(removal_error("listNetworks", "*", &e));
                return;
            }
        };

        for network in listed {
            let Some(name) = network.name else { continue };
            if BUILTIN_NETWORKS.contains(&name.as_str()) || !selector.matches(&name) {
                continue;
            }
            match self.docker.remove_network(&name).await {
                Ok(()) => summary.networks.push(name),
                Err(e) => summary.errors.push(removal_error("removeNetwork", &name, &e)),
            }
        }
    }

    /// Inspects a network.
    ///
    /// A missing network is reported with `not_found: true` context so
    /// callers can distinguish "doesn't exist yet" from genuine failure.
    pub async fn inspect_network(&self, name: &str) -> OpResult<NetworkInfo> {
        match self
            .docker
            .inspect_network(
                name,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
        {
            Ok(network) => Ok(OpOutcome::new(NetworkInfo {
                name: network.name.unwrap_or_else(|| name.to_string()),
                id: network.id.unwrap_or_default(),
                driver: network.driver.unwrap_or_default(),
                containers: network.containers.map_or(0, |c| c.len()),
            })),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            }) => Err(OperationError::new("inspectNetwork", message)
                .with_code(404)
                .with_reason("not_found")
                .with_context(ErrorContext {
                    not_found: Some(true),
                    name: Some(name.to_string()),
                    ..Default::default()
                })),
            Err(e) => Err(OperationError::from_runtime("inspectNetwork", &e)),
        }
    }

    /// Creates a bridge network.
    pub async fn create_network(&self, name: &str) -> OpResult<String> {
        let options = CreateNetworkOptions::<String> {
            name: name.to_string(),
            driver: "bridge".to_string(),
            ..Default::default()
        };
        self.docker
            .create_network(options)
            .await
            .map(|_| OpOutcome::new(name.to_string()))
            .map_err(|e| OperationError::from_runtime("createNetwork", &e))
    }

    /// Lists containers as read-only snapshots, optionally restricted to
    /// names with the given prefix.
    pub async fn list_containers(&self, prefix: Option<&str>) -> OpResult<Vec<ContainerSnapshot>> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let listed = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| OperationError::from_runtime("listContainers", &e))?;

        let mut snapshots = Vec::new();
        for container in listed {
            let name = container
                .names
                .as_deref()
                .and_then(|names| names.first())
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default();
            if let Some(prefix) = prefix {
                if !name.starts_with(prefix) {
                    continue;
                }
            }
            let ports = container
                .ports
                .unwrap_or_default()
                .iter()
                .map(|p| {
                    let proto = p
                        .typ
                        .map_or_else(|| "tcp".to_string(), |t| format!("{t:?}").to_lowercase());
                    match p.public_port {
                        Some(public) => format!("{public}->{}/{proto}", p.private_port),
                        None => format!("{}/{proto}", p.private_port),
                    }
                })
                .collect();
            snapshots.push(ContainerSnapshot {
                id: container.id.unwrap_or_default(),
                name,
                image: container.image.unwrap_or_default(),
                state: container
                    .state
                    .map(|s| format!("{s:?}").to_lowercase())
                    .unwrap_or_default(),
                status: container.status.unwrap_or_default(),
                ports,
                created_at: container.created.unwrap_or_default(),
            });
        }
        Ok(OpOutcome::new(snapshots))
    }

    fn stream_failure(operation: &str, error: &str, records: &[String]) -> OperationError {
        OperationError::new(operation, error.to_string())
            .with_reason("daemon_error")
            .with_context(ErrorContext {
                records: record_tail(records),
                ..Default::default()
            })
    }
}

/// Summary of an inspected network.
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    /// Network name.
    pub name: String,
    /// Network identifier.
    pub id: String,
    /// Driver name.
    pub driver: String,
    /// Number of attached containers.
    pub containers: usize,
}

fn removal_error(operation: &str, target: &str, err: &bollard::errors::Error) -> RemovalError {
    let normalized = OperationError::from_runtime(operation, err);
    RemovalError {
        operation: operation.to_string(),
        target: target.to_string(),
        message: normalized.message,
        code: normalized.code,
    }
}

/// Splits `repo:tag` into its parts, defaulting the tag to `latest`.
fn split_image_tag(image: &str) -> (String, String) {
    match image.rsplit_once(':') {
        // A colon inside a registry host:port is not a tag separator.
        Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
        _ => (image.to_string(), "latest".to_string()),
    }
}

fn trim_tag(reference: &str) -> &str {
    match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => repo,
        _ => reference,
    }
}

fn extract_warnings(records: &[String]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.to_lowercase().contains("warning"))
        .cloned()
        .collect()
}

fn record_tail(records: &[String]) -> Vec<String> {
    let start = records.len().saturating_sub(ERROR_RECORD_TAIL);
    records[start..].to_vec()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image_tag() {
        assert_eq!(
            split_image_tag("stackpilot/api:latest"),
            ("stackpilot/api".to_string(), "latest".to_string())
        );
        assert_eq!(
            split_image_tag("stackpilot/api"),
            ("stackpilot/api".to_string(), "latest".to_string())
        );
        assert_eq!(
            split_image_tag("registry:5000/api"),
            ("registry:5000/api".to_string(), "latest".to_string())
        );
    }

    #[test]
    fn test_trim_tag() {
        assert_eq!(trim_tag("api:1.2"), "api");
        assert_eq!(trim_tag("api"), "api");
        assert_eq!(trim_tag("registry:5000/api"), "registry:5000/api");
    }

    #[test]
    fn test_extract_warnings_case_insensitive() {
        let records = vec![
            "Step 1/4 : FROM scratch".to_string(),
            "WARNING: no default user".to_string(),
            "warning: legacy builder".to_string(),
            "Successfully built".to_string(),
        ];
        let warnings = extract_warnings(&records);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_record_tail_bounded() {
        let records: Vec<String> = (0..40).map(|i| format!("line {i}")).collect();
        let tail = record_tail(&records);
        assert_eq!(tail.len(), ERROR_RECORD_TAIL);
        assert_eq!(tail[0], "line 20");
        assert_eq!(tail[ERROR_RECORD_TAIL - 1], "line 39");
    }

    #[test]
    fn test_selector_prefix() {
        let selector = Selector::prefix("stack-");
        assert!(selector.matches("stack-api"));
        assert!(!selector.matches("other-api"));
    }

    #[test]
    fn test_selector_names_exact() {
        let selector = Selector::Names(vec!["stack-api".to_string()]);
        assert!(selector.matches("stack-api"));
        assert!(!selector.matches("stack-api-2"));
    }

    #[test]
    fn test_selector_filters_match_everything_listed() {
        let selector = Selector::Filters(HashMap::new());
        assert!(selector.matches("anything"));
    }

    #[test]
    fn test_run_options_defaults() {
        let options = RunOptions::new("stack-api", "stackpilot/api:latest");
        assert!(options.auto_remove);
        assert!(options.env.is_empty());
        assert!(options.network.is_none());
    }

    #[test]
    #[ignore] // Requires a running Docker daemon.
    fn test_connect_and_ping_requires_docker() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            if let Ok(host) = DockerHost::connect(None) {
                let _ = host.ping().await;
            }
        });
    }
}
