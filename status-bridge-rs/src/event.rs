//! Inbound webhook payloads
//!
//! Decoding happens in two passes over the same buffered body: a minimal
//! envelope that only exposes `event_type` for routing, then the typed
//! incident payload for the recognised types.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::debug;

pub const INCIDENT_TRIGGERED: &str = "incident.triggered";
pub const INCIDENT_ACKNOWLEDGED: &str = "incident.acknowledged";
pub const INCIDENT_RESOLVED: &str = "incident.resolved";

/// Routing header of every delivery
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventEnvelope {
    pub event: EnvelopeHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(default)]
    pub event_type: String,

    #[serde(default)]
    pub resource_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    #[default]
    Low,
    High,
}

impl From<&str> for Urgency {
    /// Only the exact value `high` is high urgency
    fn from(value: &str) -> Self {
        if value == "high" {
            Urgency::High
        } else {
            Urgency::Low
        }
    }
}

/// Incident details carried by lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentEvent {
    /// Delivery id assigned by the sender
    pub event_id: String,
    /// Stable upstream incident id, the correlation key
    pub incident_id: String,
    pub incident_number: Option<u64>,
    pub title: String,
    pub urgency: Urgency,
    /// Display names of the affected services
    pub services: Vec<String>,
    pub occurred_at: Option<DateTime<FixedOffset>>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    Triggered(IncidentEvent),
    Acknowledged(IncidentEvent),
    Resolved(IncidentEvent),
    Unknown { event_type: String },
}

impl UpstreamEvent {
    pub fn event_type(&self) -> &str {
        match self {
            UpstreamEvent::Triggered(_) => INCIDENT_TRIGGERED,
            UpstreamEvent::Acknowledged(_) => INCIDENT_ACKNOWLEDGED,
            UpstreamEvent::Resolved(_) => INCIDENT_RESOLVED,
            UpstreamEvent::Unknown { event_type } => event_type,
        }
    }
}

#[derive(Deserialize)]
struct IncidentPayload {
    event: IncidentEventBody,
}

#[derive(Deserialize)]
struct IncidentEventBody {
    #[serde(default)]
    id: String,

    /// Kept raw; a bad timestamp must not reject the delivery
    #[serde(default)]
    occurred_at: Option<String>,

    data: IncidentData,
}

#[derive(Deserialize)]
struct IncidentData {
    id: String,

    #[serde(default)]
    number: Option<u64>,

    #[serde(default)]
    title: String,

    #[serde(default)]
    html_url: Option<String>,

    #[serde(default)]
    urgency: Option<String>,

    #[serde(default)]
    service: Option<ServiceSummary>,
}

#[derive(Deserialize)]
struct ServiceSummary {
    #[serde(default)]
    summary: String,
}

impl From<IncidentPayload> for IncidentEvent {
    fn from(payload: IncidentPayload) -> Self {
        let IncidentEventBody { id, occurred_at, data } = payload.event;
        IncidentEvent {
            event_id: id,
            incident_id: data.id,
            incident_number: data.number,
            title: data.title,
            urgency: data.urgency.as_deref().map(Urgency::from).unwrap_or_default(),
            services: data
                .service
                .map(|service| service.summary)
                .filter(|summary| !summary.is_empty())
                .into_iter()
                .collect(),
            occurred_at: occurred_at.as_deref().and_then(parse_occurred_at),
            html_url: data.html_url,
        }
    }
}

fn parse_occurred_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Some(at),
        Err(e) => {
            debug!(occurred_at = raw, error = %e, "ignoring unparseable occurred_at");
            None
        }
    }
}

pub fn decode_envelope(body: &[u8]) -> Result<EventEnvelope, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Typed decode of a body whose envelope has already been read
pub fn decode_event(envelope: &EventEnvelope, body: &[u8]) -> Result<UpstreamEvent, serde_json::Error> {
    let incident = || serde_json::from_slice::<IncidentPayload>(body).map(IncidentEvent::from);

    Ok(match envelope.event.event_type.as_str() {
        INCIDENT_TRIGGERED => UpstreamEvent::Triggered(incident()?),
        INCIDENT_ACKNOWLEDGED => UpstreamEvent::Acknowledged(incident()?),
        INCIDENT_RESOLVED => UpstreamEvent::Resolved(incident()?),
        other => UpstreamEvent::Unknown {
            event_type: other.to_string(),
        },
    })
}
