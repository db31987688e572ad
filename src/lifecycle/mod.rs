//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator (orchestrator.rs):
//!     Wait for sandbox → Start service → Wait for service
//!     → Register triggers → Run → Shut down
//!
//! Shutdown (shutdown.rs):
//!     Trigger (once) → every waiting phase wakes up
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown (first signal only)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: sandbox first, then the service, then registrations
//! - Cleanup is unconditional once the service process exists
//! - Shutdown has a grace period for the child to exit

pub mod orchestrator;
pub mod shutdown;
pub mod signals;

pub use orchestrator::{Orchestrator, Outcome, Phase, RunReport};
pub use shutdown::Shutdown;
pub use signals::SignalGuard;
