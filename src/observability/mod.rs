//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → Operator terminal (compact text)
//!     → Log collectors (JSON lines)
//! ```

pub mod logging;
