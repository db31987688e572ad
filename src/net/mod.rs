//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured host/port
//!     → endpoint.rs (validated Endpoint, base URL)
//!     → port.rs (TCP probe loop until open or deadline)
//!     → Hand off to registration client
//! ```
//!
//! # Design Decisions
//! - Probes are plain TCP connects, the socket is dropped at once
//! - A single deadline per wait, no backoff
//! - Every connect attempt has its own short timeout

pub mod endpoint;
pub mod port;

pub use endpoint::Endpoint;
pub use port::PortWaiter;
