//! Shared utilities for launcher integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use trigger_launcher::LauncherConfig;

/// Package id used by every test configuration.
pub const PACKAGE_ID: &str = "pkg123";

/// Status that makes the mock service close the connection without answering.
pub const DROP_CONNECTION: u16 = 0;

/// A request received by the mock trigger service.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Handle to a running mock trigger service.
pub struct MockService {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Successful `POST /v1/triggers` response for the `index`-th request.
pub fn trigger_started(index: usize) -> (u16, String) {
    let body = serde_json::json!({
        "status": 200,
        "result": { "triggerId": format!("trigger-{index}") }
    });
    (200, body.to_string())
}

/// Start a programmable mock trigger service on `addr`.
///
/// `respond` gets the zero-based request index and the request and returns
/// the status code and JSON body to send back, or [`DROP_CONNECTION`].
pub async fn start_mock_service<F>(addr: SocketAddr, respond: F) -> MockService
where
    F: Fn(usize, &RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let recorded = recorded.clone();
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let index = {
                            let mut recorded = recorded.lock().unwrap();
                            recorded.push(request.clone());
                            recorded.len() - 1
                        };
                        let (status, body) = respond(index, &request);
                        if status == DROP_CONNECTION {
                            return;
                        }
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockService { addr, requests }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = buf.len().min(header_end + content_length);
    Some(RecordedRequest {
        method,
        path,
        body: String::from_utf8_lossy(&buf[header_end..end]).into_owned(),
    })
}

/// A localhost port with nothing listening on it.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn local_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Configuration whose "trigger service" is `sh -c script`.
pub fn test_config(sandbox_port: u16, service_port: u16, script: &str) -> LauncherConfig {
    let mut config = LauncherConfig::default();
    config.sandbox_host = "127.0.0.1".into();
    config.sandbox_port = sandbox_port;
    config.service_host = "127.0.0.1".into();
    config.service_port = service_port;
    config.service.program = "sh".into();
    config.service.args = vec!["-c".into(), script.into()];
    config.package.package_id = Some(PACKAGE_ID.into());
    config.timeouts.sandbox_secs = 2;
    config.timeouts.service_secs = 5;
    config.timeouts.poll_interval_ms = 50;
    config.timeouts.connect_ms = 200;
    config.timeouts.request_secs = 2;
    config.timeouts.settle_secs = 0;
    config.timeouts.shutdown_grace_secs = 5;
    config
}

/// Script prefix that records the shell's pid in `pidfile`.
pub fn write_pid(pidfile: &Path) -> String {
    format!("echo $$ > '{}'", pidfile.display())
}

/// Wait until `path` exists and has content, returning it.
pub async fn wait_for_file(path: &Path) -> String {
    for _ in 0..100 {
        if let Ok(content) = std::fs::read_to_string(path) {
            if !content.trim().is_empty() {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} was never written", path.display());
}

/// Whether a process with `pid` still exists.
pub fn process_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn temp_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
