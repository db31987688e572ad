//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the launcher.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults that reproduce the supply-chain reference setup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port of a locally started ledger sandbox.
pub const DEFAULT_SANDBOX_PORT: u16 = 6865;

/// Default HTTP port of the trigger service.
pub const DEFAULT_TRIGGER_SERVICE_PORT: u16 = 8088;

/// Root configuration for the launcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Path of the DAR holding the trigger definitions.
    pub dar: PathBuf,

    /// Host the sandbox listens on.
    pub sandbox_host: String,

    /// Ledger API port of the sandbox.
    pub sandbox_port: u16,

    /// Host the trigger service listens on.
    pub service_host: String,

    /// HTTP port of the trigger service.
    pub service_port: u16,

    /// How to launch the trigger service.
    pub service: ServiceConfig,

    /// How to obtain the package id of the DAR.
    pub package: PackageConfig,

    /// Timeouts and delays.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Triggers to register, in order.
    pub triggers: Vec<TriggerConfig>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            dar: PathBuf::from("target/supplychain-triggers.dar"),
            sandbox_host: "localhost".to_string(),
            sandbox_port: DEFAULT_SANDBOX_PORT,
            service_host: "localhost".to_string(),
            service_port: DEFAULT_TRIGGER_SERVICE_PORT,
            service: ServiceConfig::default(),
            package: PackageConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            triggers: default_triggers(),
        }
    }
}

impl LauncherConfig {
    /// Values available to `{name}` placeholders in command arguments.
    pub fn placeholders(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("dar", self.dar.display().to_string()),
            ("sandbox_host", self.sandbox_host.clone()),
            ("sandbox_port", self.sandbox_port.to_string()),
            ("service_host", self.service_host.clone()),
            ("service_port", self.service_port.to_string()),
        ])
    }
}

/// Trigger service process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Executable to run.
    pub program: String,

    /// Argument template; `{dar}`, `{sandbox_host}`, `{sandbox_port}`,
    /// `{service_host}` and `{service_port}` are substituted.
    pub args: Vec<String>,

    /// Working directory of the child, defaults to the launcher's own.
    pub working_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            program: "daml".to_string(),
            args: [
                "trigger-service",
                "--ledger-host",
                "{sandbox_host}",
                "--ledger-port",
                "{sandbox_port}",
                "--http-port",
                "{service_port}",
                "--wall-clock-time",
                "--dar",
                "{dar}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            working_dir: None,
        }
    }
}

/// Package id lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Fixed package id; when set, no lookup command is run.
    pub package_id: Option<String>,

    /// Lookup executable.
    pub program: String,

    /// Lookup argument template (same placeholders as the service).
    pub args: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            package_id: None,
            program: "daml".to_string(),
            args: ["damlc", "inspect-dar", "--json", "{dar}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long to wait for the sandbox port.
    pub sandbox_secs: u64,

    /// How long to wait for the trigger service port.
    pub service_secs: u64,

    /// Delay between port probes.
    pub poll_interval_ms: u64,

    /// Upper bound of a single connection attempt.
    pub connect_ms: u64,

    /// Registration request timeout.
    pub request_secs: u64,

    /// Pause after registration before reporting readiness.
    pub settle_secs: u64,

    /// Time given to the child to exit after termination is requested.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            sandbox_secs: 30,
            service_secs: 30,
            poll_interval_ms: 500,
            connect_ms: 1000,
            request_secs: 10,
            settle_secs: 3,
            shutdown_grace_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn sandbox(&self) -> Duration {
        Duration::from_secs(self.sandbox_secs)
    }

    pub fn service(&self) -> Duration {
        Duration::from_secs(self.service_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for the launcher's own events (overridden by `RUST_LOG`).
    pub log_level: String,

    /// Emit JSON lines instead of the compact text format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// A (party, trigger) pair to register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Party the trigger acts for.
    pub party: String,

    /// Qualified trigger name, `Module.Path:entity`.
    pub name: String,
}

impl TriggerConfig {
    pub fn new(party: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            party: party.into(),
            name: name.into(),
        }
    }
}

fn default_triggers() -> Vec<TriggerConfig> {
    const MODULE: &str = "DA.RefApps.SupplyChain.Triggers";
    vec![
        TriggerConfig::new("Seller", format!("{MODULE}.AggregatedQuoteTrigger:trigger")),
        TriggerConfig::new("Seller", format!("{MODULE}.DeliveryCompleteTrigger:trigger")),
        TriggerConfig::new("Warehouse1", format!("{MODULE}.InventoryQuoteRequestTrigger:trigger")),
        TriggerConfig::new("Warehouse2", format!("{MODULE}.InventoryQuoteRequestTrigger:trigger")),
        TriggerConfig::new("Supplier", format!("{MODULE}.CalculateAggregatedQuoteTrigger:trigger")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = LauncherConfig::default();
        assert_eq!(config.sandbox_port, 6865);
        assert_eq!(config.service_port, 8088);
        assert_eq!(config.triggers.len(), 5);
        assert_eq!(config.triggers[2].party, "Warehouse1");
        assert_eq!(config.timeouts.sandbox(), Duration::from_secs(30));
    }

    #[test]
    fn minimal_toml_keeps_defaults() {
        let config: LauncherConfig = toml::from_str("service_port = 9000").unwrap();
        assert_eq!(config.service_port, 9000);
        assert_eq!(config.sandbox_port, DEFAULT_SANDBOX_PORT);
        assert_eq!(config.service.program, "daml");
    }

    #[test]
    fn trigger_list_replaces_defaults() {
        let config: LauncherConfig = toml::from_str(
            r#"
            [[triggers]]
            party = "Alice"
            name = "Main:trigger"
            "#,
        )
        .unwrap();
        assert_eq!(config.triggers, vec![TriggerConfig::new("Alice", "Main:trigger")]);
    }
}
