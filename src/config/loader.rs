//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::LauncherConfig;
use crate::config::validation::validate_config;
use crate::error::ConfigError;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LauncherConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::debug!(path = %path.display(), "Configuration file loaded");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LauncherConfig, ConfigError> {
    let config: LauncherConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the file when one is given, otherwise fall back to the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<LauncherConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(LauncherConfig::default()),
    }
}
