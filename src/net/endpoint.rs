//! Host/port pair of a local service.

use std::fmt;

use url::Url;

use crate::error::{LauncherError, LauncherResult};

/// Address of a service the launcher talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint; the port must be non-zero.
    pub fn new(host: impl Into<String>, port: u16) -> LauncherResult<Self> {
        let host = host.into();
        if port == 0 {
            return Err(LauncherError::Usage(format!(
                "port for '{}' must be a positive integer",
                host
            )));
        }
        Ok(Self { host, port })
    }

    /// Endpoint on `localhost`.
    pub fn localhost(port: u16) -> LauncherResult<Self> {
        Self::new("localhost", port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port/` base URL for HTTP clients.
    pub fn base_url(&self) -> LauncherResult<Url> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port)).map_err(|e| {
            LauncherError::Usage(format!("invalid endpoint {}: {}", self, e))
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
