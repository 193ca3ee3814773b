//! PagerDuty client implementation
//!
//! Read-only client for the PagerDuty REST API (v2). The bridge only lists
//! maintenance windows.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::core::MaintenanceSource;
use crate::error::Result;
use crate::services::common::{build_http_client, normalize_base_url, secret_header, JsonTransport, UserAgent};

/// Public PagerDuty API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.pagerduty.com";

/// Media type selecting version 2 of the REST API
pub const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

const SERVICE: &str = "pagerduty";

/// PagerDuty client
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    transport: JsonTransport,
}

impl PagerDutyClient {
    /// Create a new builder for the PagerDuty client
    pub fn builder() -> PagerDutyClientBuilder {
        PagerDutyClientBuilder::default()
    }
}

#[async_trait]
impl MaintenanceSource for PagerDutyClient {
    async fn list_maintenance_windows(&self, offset: u32, limit: u32) -> Result<MaintenanceWindowPage> {
        let page: MaintenanceWindowPage = self
            .transport
            .get(
                "maintenance_windows",
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        debug!(
            "PagerDuty returned {} maintenance windows at offset {} (more: {})",
            page.maintenance_windows.len(),
            offset,
            page.more
        );
        Ok(page)
    }
}

/// Builder for the PagerDuty client
#[derive(Debug, Default)]
pub struct PagerDutyClientBuilder {
    /// API base URL
    base_url: Option<String>,

    /// REST API access token
    api_token: Option<String>,

    /// Request timeout
    timeout_seconds: Option<u64>,
}

impl PagerDutyClientBuilder {
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

    /// Build the PagerDuty client
    pub fn build(self) -> Result<PagerDutyClient> {
        let base_url = normalize_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            secret_header(&format!(
                "Token token={}",
                self.api_token.as_deref().unwrap_or_default()
            ))?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_V2));

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("PagerDuty-Client".to_string()),
                ..UserAgent::default()
            }),
            self.timeout_seconds.map(Duration::from_secs),
            headers,
        )?;

        Ok(PagerDutyClient {
            transport: JsonTransport::new(http_client, base_url, SERVICE),
        })
    }
}
