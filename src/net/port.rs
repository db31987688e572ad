//! Waiting for a TCP port to accept connections.
//!
//! # Responsibilities
//! - Probe `host:port` with a TCP connect
//! - Repeat at a fixed interval until success or deadline
//! - Report a timeout naming the port and the limit
//!
//! # Design Decisions
//! - Never fails before the full timeout has elapsed
//! - Sleeps are clamped to the remaining time
//! - No retry policy beyond the single deadline

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time;

use crate::config::TimeoutConfig;
use crate::error::{LauncherError, LauncherResult};

/// Polls a port until it opens.
#[derive(Debug, Clone)]
pub struct PortWaiter {
    host: String,
    poll_interval: Duration,
    connect_timeout: Duration,
}

impl PortWaiter {
    pub fn new(host: impl Into<String>, poll_interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            poll_interval,
            connect_timeout,
        }
    }

    /// Waiter for `host` using the configured probe timings.
    pub fn from_config(host: impl Into<String>, timeouts: &TimeoutConfig) -> Self {
        Self::new(host, timeouts.poll_interval(), timeouts.connect())
    }

    /// Single connection attempt.
    pub async fn is_open(&self, port: u16) -> bool {
        let attempt = TcpStream::connect((self.host.as_str(), port));
        match time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::trace!(host = %self.host, port, error = %e, "Port probe refused");
                false
            }
            Err(_) => {
                tracing::trace!(host = %self.host, port, "Port probe timed out");
                false
            }
        }
    }

    /// Wait until `port` accepts a connection, returning the time it took.
    pub async fn wait_for_port(&self, port: u16, timeout: Duration) -> LauncherResult<Duration> {
        if timeout.is_zero() {
            return Err(LauncherError::Usage("port wait timeout must be positive".into()));
        }

        tracing::info!(host = %self.host, port, timeout_secs = timeout.as_secs_f64(), "Waiting for port");
        let start = Instant::now();

        loop {
            if self.is_open(port).await {
                let elapsed = start.elapsed();
                tracing::info!(host = %self.host, port, elapsed_ms = elapsed.as_millis() as u64, "Port is open");
                return Ok(elapsed);
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::error!(host = %self.host, port, timeout_secs = timeout.as_secs_f64(), "Port did not open in time");
                return Err(LauncherError::Timeout { port, timeout });
            }

            let remaining = timeout - elapsed;
            time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}
