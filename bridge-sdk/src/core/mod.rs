//! Core abstractions for the bridge SDK
//!
//! The bridge talks to each remote system through one trait, so the engine
//! can be exercised against in-memory fakes:
//!
//! - `StatusPage`: the downstream status page (Cachet)
//! - `MaintenanceSource`: the upstream alerting system's maintenance windows (PagerDuty)

use async_trait::async_trait;

use crate::error::Result;
use crate::services::cachet::{
    Component, Incident, IncidentUpdate, NewComponent, NewIncident, NewIncidentUpdate, NewSchedule,
    Schedule,
};
use crate::services::pagerduty::MaintenanceWindowPage;

/// Downstream status-page operations
#[async_trait]
pub trait StatusPage: Send + Sync {
    /// Health check; `Ok` only when the status page answered successfully
    async fn ping(&self) -> Result<()>;

    /// First page of components
    async fn list_components(&self, per_page: u32) -> Result<Vec<Component>>;

    async fn create_component(&self, component: &NewComponent) -> Result<Component>;

    /// First page of incidents
    async fn list_incidents(&self, per_page: u32) -> Result<Vec<Incident>>;

    async fn create_incident(&self, incident: &NewIncident) -> Result<Incident>;

    /// Append an update to an existing incident
    async fn create_incident_update(
        &self,
        incident_id: u64,
        update: &NewIncidentUpdate,
    ) -> Result<IncidentUpdate>;

    /// First page of scheduled maintenances
    async fn list_schedules(&self, per_page: u32) -> Result<Vec<Schedule>>;

    async fn create_schedule(&self, schedule: &NewSchedule) -> Result<Schedule>;
}

/// Upstream maintenance-window listing
#[async_trait]
pub trait MaintenanceSource: Send + Sync {
    /// One page of maintenance windows starting at `offset`
    async fn list_maintenance_windows(&self, offset: u32, limit: u32) -> Result<MaintenanceWindowPage>;
}
