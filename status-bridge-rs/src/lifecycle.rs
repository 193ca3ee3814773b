//! Incident lifecycle mapping
//!
//! Turns upstream incident events into status-page mutations. A triggered
//! incident creates a status-page incident tagged with the upstream id;
//! acknowledgements and resolutions find that incident again through the
//! `CorrelationStore` and append an update. Only forward transitions are
//! modelled: a late acknowledgement after a resolution still overwrites the
//! component status with "performance issues".

use std::sync::Arc;

use bridge_sdk::cachet::{ComponentStatus, Incident, IncidentStatus, NewIncident, NewIncidentUpdate};
use bridge_sdk::{ServiceError, StatusPage};
use thiserror::Error;
use tracing::{error, info};

use crate::event::{IncidentEvent, UpstreamEvent, Urgency};
use crate::lookup::{correlation_meta, CorrelationStore};

/// Component attached to every incident the bridge creates
pub const DEFAULT_COMPONENT_ID: u64 = 1;

pub const TRIGGERED_MESSAGE: &str =
    "This incident has been triggered automatically. Please stand by for updates.";
pub const ACKNOWLEDGED_MESSAGE: &str = "This incident has been acknowledged. We are currently investigating the issue. Thank you for your patience.";
pub const RESOLVED_MESSAGE: &str = "This incident has been resolved. Thank you for your patience.";

/// Result of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A status-page incident was created with this id
    Created(u64),
    /// An update was appended to this status-page incident
    Updated(u64),
    /// No status-page incident references the upstream incident
    NotCorrelated,
    /// Event type the mapper does not act on
    Ignored,
}

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("failed to create incident for {upstream_id}: {source}")]
    Create {
        upstream_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to correlate incident {upstream_id}: {source}")]
    Lookup {
        upstream_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to update incident {incident_id}: {source}")]
    Update {
        incident_id: u64,
        #[source]
        source: ServiceError,
    },
}

/// Incident created for a triggered upstream incident
pub fn triggered_incident(event: &IncidentEvent) -> NewIncident {
    let component_status = match event.urgency {
        Urgency::High => ComponentStatus::PerformanceIssues,
        Urgency::Low => ComponentStatus::Operational,
    };

    NewIncident {
        name: event.title.clone(),
        message: TRIGGERED_MESSAGE.to_string(),
        status: IncidentStatus::Investigating,
        visible: true,
        component_id: DEFAULT_COMPONENT_ID,
        component_status,
        notify: false,
        meta: correlation_meta(&event.incident_id),
    }
}

pub fn acknowledged_update(found: &Incident) -> NewIncidentUpdate {
    update(
        found,
        IncidentStatus::Watching,
        ACKNOWLEDGED_MESSAGE,
        ComponentStatus::PerformanceIssues,
    )
}

pub fn resolved_update(found: &Incident) -> NewIncidentUpdate {
    update(found, IncidentStatus::Fixed, RESOLVED_MESSAGE, ComponentStatus::Operational)
}

fn update(
    found: &Incident,
    status: IncidentStatus,
    message: &str,
    component_status: ComponentStatus,
) -> NewIncidentUpdate {
    NewIncidentUpdate {
        status,
        human_status: status.human_status().to_string(),
        message: message.to_string(),
        component_id: found.component_id,
        component_status,
    }
}

fn log_remote_failure(action: &str, err: &ServiceError) {
    error!(
        error = %err,
        status = ?err.status_code(),
        response_body = err.response_body().unwrap_or_default(),
        "Status page rejected {}",
        action
    );
}

pub struct IncidentMapper {
    status_page: Arc<dyn StatusPage>,
    correlation: Arc<dyn CorrelationStore>,
}

impl IncidentMapper {
    pub fn new(status_page: Arc<dyn StatusPage>, correlation: Arc<dyn CorrelationStore>) -> Self {
        Self {
            status_page,
            correlation,
        }
    }

    /// Apply one upstream event to the status page
    pub async fn handle(&self, event: &UpstreamEvent) -> Result<Outcome, MapperError> {
        match event {
            UpstreamEvent::Triggered(incident) => self.on_triggered(incident).await,
            UpstreamEvent::Acknowledged(incident) => {
                self.on_transition(incident, acknowledged_update).await
            }
            UpstreamEvent::Resolved(incident) => self.on_transition(incident, resolved_update).await,
            UpstreamEvent::Unknown { event_type } => {
                info!(event_type = %event_type, "Ignoring event type");
                Ok(Outcome::Ignored)
            }
        }
    }

    async fn on_triggered(&self, event: &IncidentEvent) -> Result<Outcome, MapperError> {
        let new_incident = triggered_incident(event);

        let created = self
            .status_page
            .create_incident(&new_incident)
            .await
            .map_err(|source| {
                log_remote_failure("incident creation", &source);
                MapperError::Create {
                    upstream_id: event.incident_id.clone(),
                    source,
                }
            })?;

        info!(
            upstream_id = %event.incident_id,
            incident_id = created.id,
            component_status = ?new_incident.component_status,
            "Created status-page incident"
        );
        Ok(Outcome::Created(created.id))
    }

    async fn on_transition(
        &self,
        event: &IncidentEvent,
        build: fn(&Incident) -> NewIncidentUpdate,
    ) -> Result<Outcome, MapperError> {
        let found = self
            .correlation
            .find_incident(&event.incident_id)
            .await
            .map_err(|source| MapperError::Lookup {
                upstream_id: event.incident_id.clone(),
                source,
            })?;

        let Some(found) = found else {
            info!(upstream_id = %event.incident_id, "Incident not found, nothing to update");
            return Ok(Outcome::NotCorrelated);
        };

        let update = build(&found);
        self.status_page
            .create_incident_update(found.id, &update)
            .await
            .map_err(|source| {
                log_remote_failure("incident update", &source);
                MapperError::Update {
                    incident_id: found.id,
                    source,
                }
            })?;

        info!(
            upstream_id = %event.incident_id,
            incident_id = found.id,
            status = update.human_status.as_str(),
            "Updated status-page incident"
        );
        Ok(Outcome::Updated(found.id))
    }
}
