//! Cross-system lookups on the status page
//!
//! Neither system stores the other's identifiers natively. Incidents carry
//! the upstream id inside their metadata bag (`{"pagerduty": {"incident_id": ..}}`)
//! and components are matched by display name. Both lookups scan a single
//! page of records; anything beyond `page_size` is invisible to them.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_sdk::cachet::{Component, Incident};
use bridge_sdk::{Result, StatusPage};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Metadata key holding the upstream cross-reference
pub const META_NAMESPACE: &str = "pagerduty";

/// Finds status-page records that correspond to upstream entities
///
/// A miss is `Ok(None)`, not an error.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Incident whose metadata references `upstream_id`
    async fn find_incident(&self, upstream_id: &str) -> Result<Option<Incident>>;

    /// Component whose display name equals `name` exactly
    async fn find_component(&self, name: &str) -> Result<Option<Component>>;
}

/// Metadata bag stored on incidents created by the bridge
pub fn correlation_meta(upstream_id: &str) -> Value {
    json!({ META_NAMESPACE: { "incident_id": upstream_id } })
}

/// Whether `incident` was created for `upstream_id`
pub fn incident_matches(incident: &Incident, upstream_id: &str) -> bool {
    incident
        .meta
        .as_ref()
        .and_then(|meta| meta.get(META_NAMESPACE))
        .and_then(|reference| reference.get("incident_id"))
        .and_then(Value::as_str)
        == Some(upstream_id)
}

/// `CorrelationStore` backed by single-page listings of a `StatusPage`
#[derive(Clone)]
pub struct StatusPageLookup {
    status_page: Arc<dyn StatusPage>,
    page_size: u32,
}

impl StatusPageLookup {
    pub fn new(status_page: Arc<dyn StatusPage>) -> Self {
        Self::with_page_size(status_page, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(status_page: Arc<dyn StatusPage>, page_size: u32) -> Self {
        Self {
            status_page,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

#[async_trait]
impl CorrelationStore for StatusPageLookup {
    async fn find_incident(&self, upstream_id: &str) -> Result<Option<Incident>> {
        let incidents = self.status_page.list_incidents(self.page_size).await?;
        debug!(scanned = incidents.len(), upstream_id, "Scanning incidents for correlation");

        let found = incidents
            .into_iter()
            .find(|incident| incident_matches(incident, upstream_id));

        if found.is_none() {
            info!(upstream_id, "No status-page incident references this upstream incident");
        }
        Ok(found)
    }

    async fn find_component(&self, name: &str) -> Result<Option<Component>> {
        let components = self.status_page.list_components(self.page_size).await?;

        let found = components.into_iter().find(|component| component.name == name);

        if found.is_none() {
            info!(component = name, "No status-page component with this name");
        }
        Ok(found)
    }
}
