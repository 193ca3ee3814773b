//! PagerDuty data models
//!
//! Only the maintenance-window listing is modelled; timestamps are kept as
//! the raw strings PagerDuty sends so that a single malformed window cannot
//! fail the decode of a whole page.

use serde::{Deserialize, Serialize};

/// Reference to another PagerDuty object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceReference {
    pub id: String,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Display name of the referenced service
    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// A maintenance window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub description: Option<String>,

    /// ISO-8601 with a fixed UTC offset, e.g. `2015-11-09T20:00:00-05:00`
    #[serde(default)]
    pub start_time: String,

    #[serde(default)]
    pub end_time: String,

    #[serde(default)]
    pub services: Vec<ServiceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// One page of `GET /maintenance_windows`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MaintenanceWindowPage {
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindow>,

    #[serde(default)]
    pub limit: u32,

    #[serde(default)]
    pub offset: u32,

    /// Whether further pages exist
    #[serde(default)]
    pub more: bool,

    #[serde(default)]
    pub total: Option<u32>,
}
