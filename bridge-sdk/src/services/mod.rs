//! Service-specific clients
//!
//! This module contains the typed clients for the two remote systems.

pub mod cachet;
pub mod common;
pub mod pagerduty;
