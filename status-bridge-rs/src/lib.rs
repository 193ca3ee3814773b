//! Status bridge
//!
//! Mirrors alerting-system incidents and maintenance windows onto a public
//! status page:
//! - `POST /webhook` receives signed incident lifecycle events and applies
//!   them through the `IncidentMapper`
//! - `MaintenanceReconciler` periodically copies upcoming maintenance
//!   windows into status-page schedules

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bridge_sdk::{CachetClient, PagerDutyClient, StatusPage};
use config_rs::BridgeConfig;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub mod error;
pub mod event;
pub mod lifecycle;
pub mod lookup;
pub mod maintenance;
pub mod normalizer;
pub mod signature;

#[cfg(test)]
mod testing;

use error::{BootError, WebhookError};
use event::{decode_envelope, decode_event, UpstreamEvent};
use lifecycle::IncidentMapper;
use lookup::StatusPageLookup;
use maintenance::MaintenanceReconciler;
use normalizer::TimeNormalizer;
use signature::{verify_signature, SignatureError, MAX_BODY_BYTES};

pub const SERVICE_NAME: &str = "status-bridge";

/// Body of a successfully handled delivery
pub const RECEIVED: &str = "received signed webhook";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: i64,
    pub status: String,
}

/// Webhook ingress state shared by all requests
pub struct StatusBridge {
    status_page: Arc<dyn StatusPage>,
    mapper: IncidentMapper,
    webhook_secret: String,
    started_at: Instant,
}

impl StatusBridge {
    pub fn new(
        status_page: Arc<dyn StatusPage>,
        mapper: IncidentMapper,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            status_page,
            mapper,
            webhook_secret: webhook_secret.into(),
            started_at: Instant::now(),
        }
    }

    /// Wire clients, ingress and reconciler from configuration
    pub fn from_config(config: &BridgeConfig) -> Result<(Self, MaintenanceReconciler), BootError> {
        let timeout_secs = config.http_timeout.as_secs();

        let cachet = CachetClient::builder()
            .base_url(&config.cachet_url)
            .api_token(&config.cachet_key)
            .timeout(timeout_secs)
            .build()
            .map_err(|source| BootError::Client {
                service: "cachet",
                source,
            })?;

        let pagerduty = PagerDutyClient::builder()
            .base_url(&config.pagerduty_url)
            .api_token(&config.pagerduty_key)
            .timeout(timeout_secs)
            .build()
            .map_err(|source| BootError::Client {
                service: "pagerduty",
                source,
            })?;

        let normalizer = TimeNormalizer::from_name(&config.timezone)?;
        let status_page: Arc<dyn StatusPage> = Arc::new(cachet);
        let lookup = Arc::new(StatusPageLookup::with_page_size(
            status_page.clone(),
            config.page_size,
        ));

        let reconciler = MaintenanceReconciler::new(
            Arc::new(pagerduty),
            status_page.clone(),
            lookup.clone(),
            normalizer,
        )
        .with_interval(config.sync_interval)
        .with_page_size(config.page_size);

        let mapper = IncidentMapper::new(status_page.clone(), lookup);
        let bridge = Self::new(status_page, mapper, config.webhook_secret.clone());

        Ok((bridge, reconciler))
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/webhook", post(Self::webhook_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        let healthy = match state.status_page.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Status page health check failed");
                false
            }
        };

        let code = if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        (
            code,
            Json(HealthResponse {
                healthy,
                service_name: SERVICE_NAME.to_string(),
                uptime_seconds: state.started_at.elapsed().as_secs() as i64,
                status: if healthy { "SERVING" } else { "DEGRADED" }.to_string(),
            }),
        )
    }

    /// Gates, in order: status page reachable, signature valid, envelope
    /// decodes, event type known and decodes, mapping succeeds
    async fn webhook_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        body: Body,
    ) -> Result<(StatusCode, &'static str), WebhookError> {
        if let Err(e) = state.status_page.ping().await {
            error!(error = %e, "Status page unreachable, rejecting webhook");
            return Err(WebhookError::StatusPageUnavailable(e));
        }

        let body = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
            warn!(error = %e, "Failed to read webhook body");
            SignatureError::MalformedBody(e.to_string())
        })?;

        if let Err(e) = verify_signature(&headers, &body, &state.webhook_secret) {
            warn!(error = %e, "Webhook signature rejected");
            return Err(e.into());
        }

        let envelope = decode_envelope(&body).map_err(|e| {
            warn!(error = %e, "error decoding json");
            WebhookError::MalformedEnvelope(e)
        })?;

        let event = decode_event(&envelope, &body).map_err(|e| {
            warn!(event_type = %envelope.event.event_type, error = %e, "error decoding json");
            WebhookError::MalformedEvent(e)
        })?;

        if let UpstreamEvent::Unknown { event_type } = &event {
            warn!(
                event_type = %event_type,
                body = %String::from_utf8_lossy(&body),
                "unknown event type"
            );
            return Err(WebhookError::UnknownEventType(event_type.clone()));
        }

        let outcome = state.mapper.handle(&event).await.map_err(|e| {
            error!(event_type = event.event_type(), error = %e, "Failed to apply webhook event");
            WebhookError::from(e)
        })?;

        info!(event_type = event.event_type(), outcome = ?outcome, "Webhook handled");
        Ok((StatusCode::OK, RECEIVED))
    }
}
