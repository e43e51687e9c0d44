//! Runtime socket resolution.
//!
//! Decides which local or remote endpoint to use to reach the container
//! runtime daemon when no explicit configuration is given. Resolution is a
//! pure function of its inputs; candidate probing is delegated to an
//! injected detector so platform I/O never leaks into the decision logic.

use std::path::Path;

/// Default POSIX daemon socket.
pub const DEFAULT_UNIX_SOCKET: &str = "/var/run/docker.sock";

/// Default Windows daemon named pipe.
pub const DEFAULT_NAMED_PIPE: &str = "//./pipe/docker_engine";

/// Default daemon TCP port when none is given.
pub const DEFAULT_TCP_PORT: u16 = 2375;

/// A resolved way to reach the runtime daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem socket (POSIX).
    UnixSocket(String),
    /// Named pipe (Windows).
    NamedPipe(String),
    /// Remote daemon over TCP.
    Tcp {
        /// Daemon hostname or address.
        host: String,
        /// Daemon port.
        port: u16,
        /// `http` or `https`.
        protocol: String,
    },
}

impl Endpoint {
    /// True for filesystem-socket and named-pipe endpoints.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::UnixSocket(_) | Self::NamedPipe(_))
    }

    /// The local socket or pipe path, when the endpoint is local.
    #[must_use]
    pub fn local_path(&self) -> Option<&str> {
        match self {
            Self::UnixSocket(path) | Self::NamedPipe(path) => Some(path),
            Self::Tcp { .. } => None,
        }
    }

    /// `DOCKER_HOST`-style address for remote endpoints.
    #[must_use]
    pub fn remote_address(&self) -> Option<String> {
        match self {
            Self::Tcp {
                host,
                port,
                protocol,
            } => Some(format!("{protocol}://{host}:{port}")),
            _ => None,
        }
    }
}

/// Detector returning ranked candidate socket/pipe paths.
pub type SocketDetector = dyn Fn() -> Vec<String> + Send + Sync;

/// Inputs to endpoint resolution.
///
/// Environment and platform are passed in rather than read, keeping the
/// resolver deterministic under test.
pub struct ResolveInput<'a> {
    /// Explicit socket path handed to adapter construction.
    pub explicit: Option<&'a str>,
    /// Value of the remote-daemon-host environment variable, if set.
    pub env_host: Option<&'a str>,
    /// Whether resolution targets the Windows platform.
    pub windows: bool,
    /// Candidate detector; failures yield an empty candidate list.
    pub detector: Option<&'a SocketDetector>,
}

/// Resolves the daemon endpoint.
///
/// Precedence, highest to lowest: explicit path, environment host,
/// detector candidates, platform default. Never fails; a usable default
/// is always returned.
#[must_use]
pub fn resolve(input: &ResolveInput<'_>) -> Endpoint {
    if let Some(explicit) = input.explicit {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            return parse_address(explicit, input.windows);
        }
    }

    if let Some(env_host) = input.env_host {
        let env_host = env_host.trim();
        if !env_host.is_empty() {
            return parse_address(env_host, input.windows);
        }
    }

    if let Some(detector) = input.detector {
        let candidates = detector();
        if let Some(path) = pick_candidate(&candidates, input.windows) {
            return if input.windows {
                Endpoint::NamedPipe(path)
            } else {
                Endpoint::UnixSocket(path)
            };
        }
    }

    platform_default(input.windows)
}

/// The hard-coded platform default endpoint.
#[must_use]
pub fn platform_default(windows: bool) -> Endpoint {
    if windows {
        Endpoint::NamedPipe(DEFAULT_NAMED_PIPE.to_string())
    } else {
        Endpoint::UnixSocket(DEFAULT_UNIX_SOCKET.to_string())
    }
}

/// Default detector: probes well-known daemon socket locations.
#[must_use]
pub fn default_detector() -> Vec<String> {
    let mut candidates = Vec::new();
    if cfg!(windows) {
        candidates.push(DEFAULT_NAMED_PIPE.to_string());
    } else {
        let mut paths = vec![DEFAULT_UNIX_SOCKET.to_string()];
        if let Some(home) = dirs::home_dir() {
            // Rootless and Docker Desktop socket locations.
            paths.push(home.join(".docker/run/docker.sock").display().to_string());
            paths.push(home.join(".docker/desktop/docker.sock").display().to_string());
        }
        for path in paths {
            if Path::new(&path).exists() {
                candidates.push(path);
            }
        }
    }
    candidates
}

/// Parses an explicit or environment-provided daemon address.
///
/// Socket-style values resolve to local endpoints; anything else is read
/// as a TCP host/port/protocol triple.
fn parse_address(value: &str, windows: bool) -> Endpoint {
    if let Some(path) = value.strip_prefix("unix://") {
        return Endpoint::UnixSocket(path.to_string());
    }
    if let Some(path) = value.strip_prefix("npipe://") {
        return Endpoint::NamedPipe(path.to_string());
    }
    if looks_like_path(value, windows) {
        return if windows && is_pipe_path(value) {
            Endpoint::NamedPipe(value.to_string())
        } else {
            Endpoint::UnixSocket(value.to_string())
        };
    }

    let (protocol, rest) = if let Some(rest) = value.strip_prefix("tcp://") {
        ("http", rest)
    } else if let Some(rest) = value.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = value.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("http", value)
    };

    let rest = rest.trim_end_matches('/');
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port_str)) => match port_str.parse::<u16>() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (rest.to_string(), DEFAULT_TCP_PORT),
        },
        None => (rest.to_string(), DEFAULT_TCP_PORT),
    };

    Endpoint::Tcp {
        host,
        port,
        protocol: protocol.to_string(),
    }
}

fn looks_like_path(value: &str, windows: bool) -> bool {
    value.starts_with('/') && !windows || is_pipe_path(value) || value.starts_with("\\\\")
}

fn is_pipe_path(value: &str) -> bool {
    value.starts_with("//./pipe/") || value.starts_with("\\\\.\\pipe\\")
}

/// Picks the best detector candidate for the platform.
///
/// Prefers a named-pipe-style path on Windows and a filesystem-socket
/// path elsewhere, falling back to the first candidate either way.
fn pick_candidate(candidates: &[String], windows: bool) -> Option<String> {
    let preferred = candidates.iter().find(|c| is_pipe_path(c) == windows);
    preferred.or_else(|| candidates.first()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_with(
        explicit: Option<&str>,
        env_host: Option<&str>,
        windows: bool,
        detector: Option<&SocketDetector>,
    ) -> Endpoint {
        resolve(&ResolveInput {
            explicit,
            env_host,
            windows,
            detector,
        })
    }

    #[test]
    fn test_explicit_socket_wins_over_env() {
        let endpoint = resolve_with(
            Some("/custom/docker.sock"),
            Some("tcp://10.0.0.5:2376"),
            false,
            None,
        );
        assert_eq!(
            endpoint,
            Endpoint::UnixSocket("/custom/docker.sock".to_string())
        );
    }

    #[test]
    fn test_env_unix_scheme() {
        let endpoint = resolve_with(None, Some("unix:///run/user/1000/docker.sock"), false, None);
        assert_eq!(
            endpoint,
            Endpoint::UnixSocket("/run/user/1000/docker.sock".to_string())
        );
    }

    #[test]
    fn test_env_tcp_triple() {
        let endpoint = resolve_with(None, Some("tcp://build-host:2376"), false, None);
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: "build-host".to_string(),
                port: 2376,
                protocol: "http".to_string(),
            }
        );
    }

    #[test]
    fn test_env_https_protocol_kept() {
        let endpoint = resolve_with(None, Some("https://daemon.example.com:2376"), false, None);
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: "daemon.example.com".to_string(),
                port: 2376,
                protocol: "https".to_string(),
            }
        );
    }

    #[test]
    fn test_env_host_without_port_gets_default() {
        let endpoint = resolve_with(None, Some("tcp://10.1.2.3"), false, None);
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: "10.1.2.3".to_string(),
                port: DEFAULT_TCP_PORT,
                protocol: "http".to_string(),
            }
        );
    }

    #[test]
    fn test_env_npipe_scheme() {
        let endpoint = resolve_with(None, Some("npipe:////./pipe/docker_engine"), true, None);
        assert_eq!(
            endpoint,
            Endpoint::NamedPipe("//./pipe/docker_engine".to_string())
        );
    }

    #[test]
    fn test_detector_candidate_used_when_no_config() {
        let detector: Box<SocketDetector> =
            Box::new(|| vec!["/run/custom/docker.sock".to_string()]);
        let endpoint = resolve_with(None, None, false, Some(detector.as_ref()));
        assert_eq!(
            endpoint,
            Endpoint::UnixSocket("/run/custom/docker.sock".to_string())
        );
    }

    #[test]
    fn test_detector_prefers_pipe_on_windows() {
        let detector: Box<SocketDetector> = Box::new(|| {
            vec![
                "/var/run/docker.sock".to_string(),
                "//./pipe/docker_engine".to_string(),
            ]
        });
        let endpoint = resolve_with(None, None, true, Some(detector.as_ref()));
        assert_eq!(
            endpoint,
            Endpoint::NamedPipe("//./pipe/docker_engine".to_string())
        );
    }

    #[test]
    fn test_empty_detector_falls_back_to_platform_default() {
        let detector: Box<SocketDetector> = Box::new(Vec::new);
        let endpoint = resolve_with(None, None, false, Some(detector.as_ref()));
        assert_eq!(
            endpoint,
            Endpoint::UnixSocket(DEFAULT_UNIX_SOCKET.to_string())
        );
    }

    #[test]
    fn test_platform_default_windows() {
        assert_eq!(
            platform_default(true),
            Endpoint::NamedPipe(DEFAULT_NAMED_PIPE.to_string())
        );
    }

    #[test]
    fn test_blank_explicit_ignored() {
        let endpoint = resolve_with(Some("   "), None, false, None);
        assert_eq!(
            endpoint,
            Endpoint::UnixSocket(DEFAULT_UNIX_SOCKET.to_string())
        );
    }

    #[test]
    fn test_is_local_and_remote_address() {
        let local = Endpoint::UnixSocket("/var/run/docker.sock".to_string());
        assert!(local.is_local());
        assert_eq!(local.local_path(), Some("/var/run/docker.sock"));
        assert_eq!(local.remote_address(), None);

        let remote = Endpoint::Tcp {
            host: "h".to_string(),
            port: 2375,
            protocol: "http".to_string(),
        };
        assert!(!remote.is_local());
        assert_eq!(remote.remote_address().as_deref(), Some("http://h:2375"));
    }
}
