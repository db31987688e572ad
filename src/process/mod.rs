//! Child process supervision subsystem.
//!
//! # Data Flow
//! ```text
//! CommandSpec (program, rendered args, working dir)
//!     → supervisor::start (spawn, stdin detached, stderr piped)
//!     → ChildHandle (single owner)
//!         → wait()       blocks until exit
//!         → terminate()  SIGTERM to the child's process group, idempotent
//!         → reap()       bounded wait, then SIGKILL to the group
//!         → stderr_output() captured diagnostics
//! ```
//!
//! # Design Decisions
//! - The handle has exactly one owner; termination state lives in it
//! - Each child leads its own process group so wrapper scripts and the
//!   servers they start are stopped together
//! - Children are kill-on-drop as a last line of cleanup
//! - Captured stderr is bounded

pub mod supervisor;

pub use supervisor::{exit_code, start, ChildHandle, CommandSpec, Termination};
