//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check trigger names are qualified (`Module:entity`)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LauncherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::LauncherConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &LauncherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dar.as_os_str().is_empty() {
        errors.push(ValidationError::new("dar", "path cannot be empty"));
    }

    for (field, host) in [
        ("sandbox_host", &config.sandbox_host),
        ("service_host", &config.service_host),
    ] {
        if host.trim().is_empty() {
            errors.push(ValidationError::new(field, "host cannot be empty"));
        }
    }

    for (field, port) in [
        ("sandbox_port", config.sandbox_port),
        ("service_port", config.service_port),
    ] {
        if port == 0 {
            errors.push(ValidationError::new(field, "must be non-zero"));
        }
    }

    if config.service.program.trim().is_empty() {
        errors.push(ValidationError::new("service.program", "cannot be empty"));
    }

    if config.package.package_id.is_none() && config.package.program.trim().is_empty() {
        errors.push(ValidationError::new(
            "package.program",
            "required unless package.package_id is set",
        ));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.sandbox_secs", timeouts.sandbox_secs),
        ("timeouts.service_secs", timeouts.service_secs),
        ("timeouts.poll_interval_ms", timeouts.poll_interval_ms),
        ("timeouts.connect_ms", timeouts.connect_ms),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.triggers.is_empty() {
        errors.push(ValidationError::new("triggers", "at least one trigger is required"));
    }

    for (i, trigger) in config.triggers.iter().enumerate() {
        if trigger.party.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("triggers[{i}].party"),
                "cannot be empty",
            ));
        }
        if !is_qualified_name(&trigger.name) {
            errors.push(ValidationError::new(
                format!("triggers[{i}].name"),
                format!("'{}' is not of the form Module:entity", trigger.name),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_qualified_name(name: &str) -> bool {
    match name.split_once(':') {
        Some((module, entity)) => {
            !module.is_empty() && !entity.is_empty() && !entity.contains(':')
        }
        None => false,
    }
}
