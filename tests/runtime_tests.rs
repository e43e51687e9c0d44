//! Adapter tests against a local daemon stub.
//!
//! A minimal HTTP/1.1 responder stands in for the runtime daemon, so the
//! idempotent-stop and partial-removal contracts run against the real
//! wire path without a live Docker installation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stackpilot::runtime::{DockerHost, Endpoint, RemovalTargets, Selector};

/// Maps a request's method and target to a canned status and JSON body.
type StubResponder = Arc<dyn Fn(&str, &str) -> (u16, String) + Send + Sync>;

/// Serves canned daemon responses on an ephemeral local port.
///
/// Handles sequential keep-alive requests per connection; the accept loop
/// dies with the test runtime.
async fn spawn_daemon_stub(respond: StubResponder) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let mut buffer: Vec<u8> = Vec::new();
                loop {
                    let head_end = loop {
                        if let Some(pos) =
                            buffer.windows(4).position(|w| w == b"\r\n\r\n")
                        {
                            break pos;
                        }
                        let mut chunk = [0u8; 1024];
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                        }
                    };

                    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
                    let mut lines = head.lines();
                    let request_line = lines.next().unwrap_or_default().to_string();
                    let content_length = lines
                        .filter_map(|line| line.split_once(':'))
                        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    let body_end = head_end + 4 + content_length;
                    while buffer.len() < body_end {
                        let mut chunk = [0u8; 1024];
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                        }
                    }
                    buffer.drain(..body_end);

                    let mut parts = request_line.split_whitespace();
                    let method = parts.next().unwrap_or_default();
                    let target = parts.next().unwrap_or_default();
                    let (status, body) = respond(method, target);
                    let reason = match status {
                        200 => "OK",
                        204 => "No Content",
                        304 => "Not Modified",
                        404 => "Not Found",
                        _ => "Internal Server Error",
                    };
                    // 204/304 responses carry no body and no length.
                    let response = if status == 204 || status == 304 {
                        format!("HTTP/1.1 {status} {reason}\r\n\r\n")
                    } else {
                        format!(
                            "HTTP/1.1 {status} {reason}\r\n\
                             Content-Type: application/json\r\n\
                             Content-Length: {}\r\n\r\n{body}",
                            body.len()
                        )
                    };
                    if socket.write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    addr
}

fn stub_host(addr: SocketAddr) -> DockerHost {
    DockerHost::from_endpoint(Endpoint::Tcp {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        protocol: "http".to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_stop_is_idempotent_for_absent_and_stopped_containers() {
    let addr = spawn_daemon_stub(Arc::new(|method, target| {
        match (method, target) {
            ("POST", t) if t.contains("/containers/absent/stop") => {
                (404, r#"{"message":"No such container: absent"}"#.to_string())
            }
            ("POST", t) if t.contains("/containers/stopped/stop") => (304, String::new()),
            ("POST", t) if t.contains("/containers/running/stop") => (204, String::new()),
            _ => (500, r#"{"message":"unexpected request"}"#.to_string()),
        }
    }))
    .await;
    let host = stub_host(addr);

    let absent = host
        .stop_container("absent", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(absent.data.skipped, "a missing container is skipped success");

    let stopped = host
        .stop_container("stopped", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(stopped.data.skipped, "an already-stopped container is skipped");

    let running = host
        .stop_container("running", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!running.data.skipped);
}

#[tokio::test]
async fn test_removal_reports_partial_failure_with_full_summary() {
    // Three containers listed; the last one refuses to go away.
    let addr = spawn_daemon_stub(Arc::new(|method, target| {
        match (method, target) {
            ("GET", t) if t.contains("/containers/json") => (
                200,
                r#"[{"Id":"aaa","Names":["/stackpilot-a"],"State":"exited"},
                    {"Id":"bbb","Names":["/stackpilot-b"],"State":"exited"},
                    {"Id":"ccc","Names":["/stackpilot-c"],"State":"running"}]"#
                    .to_string(),
            ),
            ("POST", t) if t.contains("/stop") => (304, String::new()),
            ("DELETE", t) if t.contains("/containers/stackpilot-c") => (
                500,
                r#"{"message":"driver busy: cannot remove stackpilot-c"}"#.to_string(),
            ),
            ("DELETE", t) if t.contains("/containers/") => (204, String::new()),
            _ => (500, r#"{"message":"unexpected request"}"#.to_string()),
        }
    }))
    .await;
    let host = stub_host(addr);

    let targets = RemovalTargets {
        containers: Some(Selector::Names(vec![
            "stackpilot-a".to_string(),
            "stackpilot-b".to_string(),
            "stackpilot-c".to_string(),
        ])),
        ..Default::default()
    };
    let summary = host.remove_resources(&targets).await;

    assert!(!summary.ok());
    assert_eq!(summary.containers, vec!["stackpilot-a", "stackpilot-b"]);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].operation, "removeContainer");
    assert_eq!(summary.errors[0].target, "stackpilot-c");
    assert_eq!(summary.errors[0].code, Some(500));
    assert!(summary.errors[0].message.contains("driver busy"));
}

#[tokio::test]
async fn test_removal_selector_skips_unmatched_names() {
    let addr = spawn_daemon_stub(Arc::new(|method, target| {
        match (method, target) {
            ("GET", t) if t.contains("/containers/json") => (
                200,
                r#"[{"Id":"aaa","Names":["/stackpilot-a"],"State":"exited"},
                    {"Id":"xxx","Names":["/unrelated"],"State":"exited"}]"#
                    .to_string(),
            ),
            ("POST", t) if t.contains("/stop") => (304, String::new()),
            ("DELETE", t) if t.contains("/containers/stackpilot-") => (204, String::new()),
            _ => (500, r#"{"message":"unexpected request"}"#.to_string()),
        }
    }))
    .await;
    let host = stub_host(addr);

    let targets = RemovalTargets {
        containers: Some(Selector::prefix("stackpilot-")),
        ..Default::default()
    };
    let summary = host.remove_resources(&targets).await;

    assert!(summary.ok());
    assert_eq!(summary.containers, vec!["stackpilot-a"]);
}
