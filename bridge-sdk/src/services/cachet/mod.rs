//! Cachet client implementation
//!
//! This module provides a client for the Cachet status-page API (v1),
//! covering the endpoints the bridge needs: ping, components, incidents,
//! incident updates and schedules.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderName};

use crate::core::StatusPage;
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, normalize_base_url, secret_header, JsonTransport, UserAgent};

/// Header carrying the Cachet API token
pub const TOKEN_HEADER: &str = "X-Cachet-Token";

const SERVICE: &str = "cachet";

/// Cachet client
#[derive(Debug, Clone)]
pub struct CachetClient {
    transport: JsonTransport,
}

impl CachetClient {
    /// Create a new builder for the Cachet client
    pub fn builder() -> CachetClientBuilder {
        CachetClientBuilder::default()
    }

    /// Base URL of the Cachet installation
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

#[async_trait]
impl StatusPage for CachetClient {
    async fn ping(&self) -> Result<()> {
        let pong: DataEnvelope<serde_json::Value> = self.transport.get("api/v1/ping", &[]).await?;
        debug!("Cachet ping answered: {}", pong.data);
        Ok(())
    }

    async fn list_components(&self, per_page: u32) -> Result<Vec<Component>> {
        let page: DataEnvelope<Vec<Component>> = self
            .transport
            .get("api/v1/components", &[("per_page", per_page.to_string())])
            .await?;
        Ok(page.data)
    }

    async fn create_component(&self, component: &NewComponent) -> Result<Component> {
        let created: DataEnvelope<Component> =
            self.transport.post("api/v1/components", component).await?;
        info!("Created Cachet component {} ({})", created.data.id, created.data.name);
        Ok(created.data)
    }

    async fn list_incidents(&self, per_page: u32) -> Result<Vec<Incident>> {
        let page: DataEnvelope<Vec<Incident>> = self
            .transport
            .get("api/v1/incidents", &[("per_page", per_page.to_string())])
            .await?;
        Ok(page.data)
    }

    async fn create_incident(&self, incident: &NewIncident) -> Result<Incident> {
        let created: DataEnvelope<Incident> = self.transport.post("api/v1/incidents", incident).await?;
        info!("Created Cachet incident {} ({})", created.data.id, created.data.name);
        Ok(created.data)
    }

    async fn create_incident_update(
        &self,
        incident_id: u64,
        update: &NewIncidentUpdate,
    ) -> Result<IncidentUpdate> {
        let endpoint = format!("api/v1/incidents/{}/updates", incident_id);
        let created: DataEnvelope<IncidentUpdate> = self.transport.post(&endpoint, update).await?;
        info!(
            "Appended update {} to Cachet incident {}",
            created.data.id, incident_id
        );
        Ok(created.data)
    }

    async fn list_schedules(&self, per_page: u32) -> Result<Vec<Schedule>> {
        let page: DataEnvelope<Vec<Schedule>> = self
            .transport
            .get("api/v1/schedules", &[("per_page", per_page.to_string())])
            .await?;
        Ok(page.data)
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> Result<Schedule> {
        let created: DataEnvelope<Schedule> = self.transport.post("api/v1/schedules", schedule).await?;
        info!("Created Cachet schedule {} ({})", created.data.id, created.data.name);
        Ok(created.data)
    }
}

/// Builder for the Cachet client
#[derive(Debug, Default)]
pub struct CachetClientBuilder {
    /// Root URL of the Cachet installation
    base_url: Option<String>,

    /// API token
    api_token: Option<String>,

    /// Request timeout
    timeout_seconds: Option<u64>,
}

impl CachetClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the API token
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Build the Cachet client
    ///
    /// An empty token is accepted; Cachet rejects the first authenticated
    /// call instead.
    pub fn build(self) -> Result<CachetClient> {
        let base_url = normalize_base_url(self.base_url.as_deref().unwrap_or_default());

        let mut headers = HeaderMap::new();
        let token_header = HeaderName::from_bytes(TOKEN_HEADER.as_bytes())
            .map_err(|e| ServiceError::configuration(format!("Invalid token header: {}", e)))?;
        headers.insert(
            token_header,
            secret_header(self.api_token.as_deref().unwrap_or_default())?,
        );

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("Cachet-Client".to_string()),
                ..UserAgent::default()
            }),
            self.timeout_seconds.map(Duration::from_secs),
            headers,
        )?;

        Ok(CachetClient {
            transport: JsonTransport::new(http_client, base_url, SERVICE),
        })
    }
}
