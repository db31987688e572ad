//! Error types shared by every subsystem.

use std::time::Duration;
use thiserror::Error;

use crate::config::validation::ValidationError;

/// Errors that abort a launcher run.
///
/// An unexpected child exit and an operator interrupt are not errors; they
/// are reported through [`crate::lifecycle::Outcome`].
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Bad command line invocation.
    #[error("usage: {0}")]
    Usage(String),

    /// Configuration file could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A watched port never accepted a connection.
    #[error("port {port} did not open within {}s", .timeout.as_secs_f64())]
    Timeout { port: u16, timeout: Duration },

    /// The child process could not be launched.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Package id lookup failed.
    #[error("package id lookup failed: {0}")]
    Package(String),

    /// A single trigger registration was rejected or never reached the service.
    #[error("failed to register trigger '{trigger}' for party '{party}': {reason}")]
    Registration {
        party: String,
        trigger: String,
        reason: String,
    },

    /// Trigger service API call failed outside of registration.
    #[error("trigger service error: {0}")]
    Service(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for launcher operations.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl LauncherError {
    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_port_and_duration() {
        let err = LauncherError::Timeout {
            port: 6865,
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("6865"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn registration_message_names_party_and_trigger() {
        let err = LauncherError::Registration {
            party: "Seller".into(),
            trigger: "Mod:trigger".into(),
            reason: "status 500".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Seller"));
        assert!(msg.contains("Mod:trigger"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::new("sandbox_port", "must be non-zero"),
            ValidationError::new("triggers", "at least one trigger is required"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("sandbox_port: must be non-zero, triggers:"));
    }
}
