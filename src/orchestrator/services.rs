//! The fixed service catalog.
//!
//! Every verb operates over this closed set of named services. Naming is
//! uniform: containers are `stackpilot-<service>`, images are
//! `stackpilot/<service>:latest`, and everything shares one bridge
//! network.

/// Prefix of every managed container name.
pub const STACK_PREFIX: &str = "stackpilot-";

/// Shared bridge network all services attach to.
pub const STACK_NETWORK: &str = "stackpilot-net";

/// Image namespace for locally built images.
pub const IMAGE_NAMESPACE: &str = "stackpilot";

/// The single service this engine is allowed to start.
pub const ORCHESTRATOR_SERVICE: &str = "orchestrator";

/// Host port the orchestrator's API is bound to.
pub const ORCHESTRATOR_API_PORT: u16 = 7070;

/// One entry in the service catalog.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    /// Service name, unique within the catalog.
    pub name: &'static str,
    /// Build context directory, relative to the stack root.
    pub context_dir: &'static str,
    /// Dockerfile path, relative to the context directory.
    pub dockerfile: &'static str,
    /// Deferred to the expanded-capacity build phase.
    pub heavy: bool,
    /// TCP port mappings as `(container, host)` pairs.
    pub ports: &'static [(u16, u16)],
}

/// The stack's services.
///
/// `analytics` is the heavy build: a JVM image whose compile dominates
/// the whole batch, so it runs after the others drain, at the expanded
/// capacity tier.
pub const SERVICES: &[ServiceSpec] = &[
    ServiceSpec {
        name: ORCHESTRATOR_SERVICE,
        context_dir: "orchestrator",
        dockerfile: "Dockerfile",
        heavy: false,
        ports: &[(ORCHESTRATOR_API_PORT, ORCHESTRATOR_API_PORT)],
    },
    ServiceSpec {
        name: "gateway",
        context_dir: "gateway",
        dockerfile: "Dockerfile",
        heavy: false,
        ports: &[(8080, 8080)],
    },
    ServiceSpec {
        name: "api",
        context_dir: "api",
        dockerfile: "Dockerfile",
        heavy: false,
        ports: &[(3000, 3000)],
    },
    ServiceSpec {
        name: "worker",
        context_dir: "worker",
        dockerfile: "Dockerfile",
        heavy: false,
        ports: &[],
    },
    ServiceSpec {
        name: "analytics",
        context_dir: "analytics",
        dockerfile: "Dockerfile",
        heavy: true,
        ports: &[(9090, 9090)],
    },
];

/// Looks up a service by name.
#[must_use]
pub fn find_service(name: &str) -> Option<&'static ServiceSpec> {
    SERVICES.iter().find(|s| s.name == name)
}

/// All service names, catalog order.
#[must_use]
pub fn service_names() -> Vec<&'static str> {
    SERVICES.iter().map(|s| s.name).collect()
}

/// The managed container name for a service.
#[must_use]
pub fn container_name(service: &str) -> String {
    format!("{STACK_PREFIX}{service}")
}

/// The canonical image tag for a service.
#[must_use]
pub fn image_tag(service: &str) -> String {
    format!("{IMAGE_NAMESPACE}/{service}:latest")
}

/// Every plausible local reference for a service's image.
///
/// Cleanup removes all four permutations so stale references from older
/// naming schemes do not linger: namespaced tagged and untagged, local
/// tagged and untagged.
#[must_use]
pub fn image_permutations(service: &str) -> Vec<String> {
    vec![
        format!("{IMAGE_NAMESPACE}/{service}:latest"),
        format!("{IMAGE_NAMESPACE}/{service}"),
        format!("{service}:latest"),
        service.to_string(),
    ]
}

/// The orchestrator's health endpoint on the host.
#[must_use]
pub fn orchestrator_health_url() -> String {
    format!("http://127.0.0.1:{ORCHESTRATOR_API_PORT}/health")
}

/// Recovery hint for a failed orchestrator health gate.
///
/// The orchestrator needs the runtime socket mounted and its API port
/// bound on the host; the hint calls out both.
#[must_use]
pub fn orchestrator_remediation() -> String {
    format!(
        "Verify the runtime socket is mounted into the {ORCHESTRATOR_SERVICE} container \
         and that port {ORCHESTRATOR_API_PORT} is bound on the host; \
         then inspect the container logs for startup errors."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_unique() {
        let mut names = service_names();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SERVICES.len());
    }

    #[test]
    fn test_exactly_one_heavy_service() {
        let heavy: Vec<_> = SERVICES.iter().filter(|s| s.heavy).collect();
        assert_eq!(heavy.len(), 1);
        assert_eq!(heavy[0].name, "analytics");
    }

    #[test]
    fn test_orchestrator_present_with_api_port() {
        let orchestrator = find_service(ORCHESTRATOR_SERVICE).expect("in catalog");
        assert!(
            orchestrator
                .ports
                .contains(&(ORCHESTRATOR_API_PORT, ORCHESTRATOR_API_PORT))
        );
    }

    #[test]
    fn test_naming_scheme() {
        assert_eq!(container_name("api"), "stackpilot-api");
        assert_eq!(image_tag("api"), "stackpilot/api:latest");
    }

    #[test]
    fn test_image_permutations_cover_all_four() {
        let perms = image_permutations("api");
        assert_eq!(
            perms,
            vec![
                "stackpilot/api:latest".to_string(),
                "stackpilot/api".to_string(),
                "api:latest".to_string(),
                "api".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_service_not_found() {
        assert!(find_service("database").is_none());
    }

    #[test]
    fn test_orchestrator_remediation_mentions_socket_and_port() {
        let hint = orchestrator_remediation();
        assert!(hint.contains("socket"));
        assert!(hint.contains(&ORCHESTRATOR_API_PORT.to_string()));
    }
}
