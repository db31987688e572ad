//! Trigger registration subsystem.
//!
//! # Data Flow
//! ```text
//! TriggerConfig list + PackageId
//!     → Registration (party, package id, trigger)
//!     → client.rs POST /v1/triggers, one at a time, in order
//!     → RegisteredTrigger (service-assigned trigger id)
//! ```
//!
//! # Design Decisions
//! - Sequential, in configured order, for deterministic logs
//! - Fail fast: the first rejected registration stops the batch
//! - No retries

pub mod client;

pub use client::{RegisteredTrigger, Registration, RegistrationClient};
