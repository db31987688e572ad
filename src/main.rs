//! Trigger service launcher for local development.
//!
//! # Architecture Overview
//!
//! ```text
//!   start-triggers SANDBOX_PORT
//!          │
//!          ▼
//!   ┌──────────────┐   ┌────────────┐   ┌──────────────────┐
//!   │    config    │──▶│  lifecycle │──▶│ net::PortWaiter  │──▶ sandbox :6865
//!   └──────────────┘   │orchestrator│   └──────────────────┘
//!                      │            │   ┌──────────────────┐
//!   SIGINT/SIGTERM ───▶│            │──▶│ process (child)  │──▶ trigger service
//!   (SignalGuard)      │            │   └──────────────────┘
//!                      │            │   ┌──────────────────┐
//!                      │            │──▶│  registration    │──▶ POST /v1/triggers
//!                      └────────────┘   └──────────────────┘
//! ```

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use trigger_launcher::config::loader::load_or_default;
use trigger_launcher::observability::logging;
use trigger_launcher::{Orchestrator, Shutdown, SignalGuard};

const USAGE: &str = "Usage: start-triggers SANDBOX_PORT";

#[derive(Parser, Debug)]
#[command(name = "start-triggers")]
#[command(version, about = "Start the trigger service and register triggers against a running sandbox")]
struct Cli {
    /// Ledger API port of the running sandbox
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    sandbox_port: u16,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            println!("{USAGE}");
            std::process::exit(1);
        }
    };

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    config.sandbox_port = cli.sandbox_port;
    if cli.json_logs {
        config.observability.json = true;
    }

    logging::init_logging(&config.observability, cli.verbose);

    tracing::info!(
        dar = %config.dar.display(),
        sandbox = %format!("{}:{}", config.sandbox_host, config.sandbox_port),
        service = %format!("{}:{}", config.service_host, config.service_port),
        triggers = config.triggers.len(),
        "start-triggers v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = Shutdown::new();
    let on_interrupt = shutdown.clone();
    let _signals = match SignalGuard::install(move || {
        on_interrupt.trigger();
    }) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(config, shutdown);
    let code = match orchestrator.run().await {
        Ok(report) => report.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "Launcher failed");
            e.exit_code()
        }
    };

    std::process::exit(code);
}
