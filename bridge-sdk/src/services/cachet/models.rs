//! Cachet data models
//!
//! Request and response shapes for the Cachet v1 API. Cachet serialises its
//! status codes as integers on some endpoints and numeric strings on others,
//! so every status enum accepts both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapping every Cachet response body
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,

    /// Pagination and other metadata
    #[serde(default)]
    pub meta: Option<Value>,
}

/// Raw status code as found on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Number(u8),
    Text(String),
}

impl RawStatus {
    fn code(&self) -> Result<u8, String> {
        match self {
            RawStatus::Number(code) => Ok(*code),
            RawStatus::Text(text) => text
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid status code '{}'", text)),
        }
    }
}

/// Status of a component as shown on the status page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u8")]
pub enum ComponentStatus {
    #[default]
    Unknown,
    Operational,
    PerformanceIssues,
    PartialOutage,
    MajorOutage,
}

impl From<ComponentStatus> for u8 {
    fn from(status: ComponentStatus) -> u8 {
        match status {
            ComponentStatus::Unknown => 0,
            ComponentStatus::Operational => 1,
            ComponentStatus::PerformanceIssues => 2,
            ComponentStatus::PartialOutage => 3,
            ComponentStatus::MajorOutage => 4,
        }
    }
}

impl TryFrom<RawStatus> for ComponentStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw.code()? {
            0 => Ok(ComponentStatus::Unknown),
            1 => Ok(ComponentStatus::Operational),
            2 => Ok(ComponentStatus::PerformanceIssues),
            3 => Ok(ComponentStatus::PartialOutage),
            4 => Ok(ComponentStatus::MajorOutage),
            other => Err(format!("unknown component status {}", other)),
        }
    }
}

/// Lifecycle status of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u8")]
pub enum IncidentStatus {
    Scheduled,
    Investigating,
    Identified,
    Watching,
    Fixed,
}

impl IncidentStatus {
    /// Label Cachet shows next to an update
    pub fn human_status(self) -> &'static str {
        match self {
            IncidentStatus::Scheduled => "Scheduled",
            IncidentStatus::Investigating => "Investigating",
            IncidentStatus::Identified => "Identified",
            IncidentStatus::Watching => "Watching",
            IncidentStatus::Fixed => "Fixed",
        }
    }
}

impl From<IncidentStatus> for u8 {
    fn from(status: IncidentStatus) -> u8 {
        match status {
            IncidentStatus::Scheduled => 0,
            IncidentStatus::Investigating => 1,
            IncidentStatus::Identified => 2,
            IncidentStatus::Watching => 3,
            IncidentStatus::Fixed => 4,
        }
    }
}

impl TryFrom<RawStatus> for IncidentStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw.code()? {
            0 => Ok(IncidentStatus::Scheduled),
            1 => Ok(IncidentStatus::Investigating),
            2 => Ok(IncidentStatus::Identified),
            3 => Ok(IncidentStatus::Watching),
            4 => Ok(IncidentStatus::Fixed),
            other => Err(format!("unknown incident status {}", other)),
        }
    }
}

/// Status of a scheduled maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u8")]
pub enum ScheduleStatus {
    #[default]
    Upcoming,
    InProgress,
    Complete,
}

impl From<ScheduleStatus> for u8 {
    fn from(status: ScheduleStatus) -> u8 {
        match status {
            ScheduleStatus::Upcoming => 0,
            ScheduleStatus::InProgress => 1,
            ScheduleStatus::Complete => 2,
        }
    }
}

impl TryFrom<RawStatus> for ScheduleStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw.code()? {
            0 => Ok(ScheduleStatus::Upcoming),
            1 => Ok(ScheduleStatus::InProgress),
            2 => Ok(ScheduleStatus::Complete),
            other => Err(format!("unknown schedule status {}", other)),
        }
    }
}

/// Status-page component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: u64,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Component creation request
#[derive(Debug, Clone, Serialize)]
pub struct NewComponent {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: ComponentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    pub enabled: bool,
}

/// Incident as returned by Cachet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Incident {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub message: String,

    pub status: IncidentStatus,

    /// Zero when the incident is not linked to a component
    #[serde(default)]
    pub component_id: u64,

    /// Free-form metadata bag
    #[serde(default)]
    pub meta: Option<Value>,
}

/// Incident creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIncident {
    pub name: String,
    pub message: String,
    pub status: IncidentStatus,
    pub visible: bool,
    pub component_id: u64,
    pub component_status: ComponentStatus,
    pub notify: bool,
    pub meta: Value,
}

/// Update appended to an existing incident
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIncidentUpdate {
    pub status: IncidentStatus,
    pub human_status: String,
    pub message: String,
    pub component_id: u64,
    pub component_status: ComponentStatus,
}

/// Incident update as returned by Cachet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncidentUpdate {
    pub id: u64,

    pub incident_id: u64,

    pub status: IncidentStatus,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub human_status: Option<String>,
}

/// Scheduled maintenance as returned by Cachet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Schedule {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: ScheduleStatus,

    #[serde(default)]
    pub scheduled_at: Option<String>,

    #[serde(default)]
    pub completed_at: Option<String>,

    #[serde(default)]
    pub components: Vec<Component>,
}

/// Schedule creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSchedule {
    pub name: String,
    pub message: String,
    pub status: ScheduleStatus,
    pub scheduled_at: String,
    pub completed_at: String,
    pub components: Vec<Component>,
}

fn default_true() -> bool {
    true
}
