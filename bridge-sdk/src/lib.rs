//! # Bridge SDK
//!
//! Typed clients for the two remote systems the status bridge connects.
//!
//! This crate provides:
//!
//! - `CachetClient`: the downstream status page (ping, components, incidents,
//!   incident updates, schedules)
//! - `PagerDutyClient`: the upstream alerting system (maintenance windows)
//! - The `StatusPage` and `MaintenanceSource` traits both clients implement
//! - `ServiceError`, a normalized error type with the remote response attached

pub mod core;
pub use core::{MaintenanceSource, StatusPage};

pub mod services;
pub use services::{cachet, pagerduty};
pub use services::cachet::CachetClient;
pub use services::pagerduty::PagerDutyClient;

pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

#[cfg(test)]
mod tests;
