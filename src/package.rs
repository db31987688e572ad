//! Package id resolution for the trigger DAR.
//!
//! # Responsibilities
//! - Return a configured package id as is
//! - Otherwise run the DAR inspection command and read `main_package_id`
//!   from its JSON output

use std::fmt;

use serde::Deserialize;
use tokio::process::Command;

use crate::config::template::render_all;
use crate::config::LauncherConfig;
use crate::error::{LauncherError, LauncherResult};

/// Opaque identifier of a deployed package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subset of `damlc inspect-dar --json` output.
#[derive(Debug, Deserialize)]
struct InspectDarOutput {
    main_package_id: String,
}

/// Resolve the package id of the configured DAR.
pub async fn resolve_package_id(config: &LauncherConfig) -> LauncherResult<PackageId> {
    if let Some(id) = &config.package.package_id {
        tracing::debug!(package_id = %id, "Using configured package id");
        return Ok(PackageId::new(id.clone()));
    }

    let program = &config.package.program;
    let args = render_all(&config.package.args, &config.placeholders());
    tracing::debug!(program = %program, args = ?args, "Inspecting DAR");

    let output = Command::new(program)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| LauncherError::Package(format!("failed to run '{}': {}", program, e)))?;

    if !output.status.success() {
        return Err(LauncherError::Package(format!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let id = parse_inspect_output(&output.stdout)?;
    tracing::info!(dar = %config.dar.display(), package_id = %id, "Resolved package id");
    Ok(id)
}

fn parse_inspect_output(stdout: &[u8]) -> LauncherResult<PackageId> {
    let parsed: InspectDarOutput = serde_json::from_slice(stdout)
        .map_err(|e| LauncherError::Package(format!("unexpected inspect-dar output: {}", e)))?;

    if parsed.main_package_id.trim().is_empty() {
        return Err(LauncherError::Package("empty main_package_id".into()));
    }
    Ok(PackageId(parsed.main_package_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_main_package_id() {
        let json = br#"{"main_package_id": "abc123", "packages": {}}"#;
        assert_eq!(parse_inspect_output(json).unwrap().as_str(), "abc123");
    }

    #[test]
    fn rejects_unexpected_output() {
        assert!(parse_inspect_output(b"not json").is_err());
        assert!(parse_inspect_output(br#"{"main_package_id": " "}"#).is_err());
    }

    #[tokio::test]
    async fn configured_id_skips_lookup() {
        let mut config = LauncherConfig::default();
        config.package.package_id = Some("fixed".into());
        config.package.program = "definitely-not-a-real-binary-xyz".into();
        assert_eq!(resolve_package_id(&config).await.unwrap().as_str(), "fixed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_lookup_command() {
        let mut config = LauncherConfig::default();
        config.dar = "some.dar".into();
        config.package.program = "sh".into();
        config.package.args = vec![
            "-c".into(),
            r#"echo "{\"main_package_id\": \"id-for-$0\"}""#.into(),
            "{dar}".into(),
        ];
        assert_eq!(resolve_package_id(&config).await.unwrap().as_str(), "id-for-some.dar");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_lookup_kills_command() {
        use crate::process::testing::{exits_within, read_pid};
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let mut config = LauncherConfig::default();
        config.package.program = "sh".into();
        config.package.args = vec![
            "-c".into(),
            format!("echo $$ > '{}'; exec sleep 30", pidfile.display()),
        ];

        let pid = tokio::select! {
            result = resolve_package_id(&config) => panic!("lookup finished early: {result:?}"),
            pid = read_pid(&pidfile) => pid,
        };

        assert!(
            exits_within(pid, Duration::from_secs(2)).await,
            "lookup command kept running after the lookup was dropped"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_lookup_is_package_error() {
        let mut config = LauncherConfig::default();
        config.package.program = "sh".into();
        config.package.args = vec!["-c".into(), "echo nope >&2; exit 2".into()];
        let err = resolve_package_id(&config).await.unwrap_err();
        assert!(matches!(err, LauncherError::Package(ref msg) if msg.contains("nope")));
    }
}
