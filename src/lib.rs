//! Local trigger service launcher.
//!
//! Waits for a ledger sandbox, starts the trigger service against it,
//! registers the configured (party, trigger) pairs and supervises the
//! service until it exits or the operator interrupts.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod package;
pub mod process;
pub mod registration;

pub use config::LauncherConfig;
pub use error::{LauncherError, LauncherResult};
pub use lifecycle::{Orchestrator, Outcome, Phase, RunReport, Shutdown, SignalGuard};
