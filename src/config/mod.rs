//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LauncherConfig (validated, immutable)
//!     → CLI overrides (sandbox port)
//!     → template.rs renders command arguments
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod template;
pub mod validation;

pub use schema::LauncherConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
pub use schema::TriggerConfig;
