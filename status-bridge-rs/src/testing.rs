//! In-memory stand-ins for the remote systems, used by unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use bridge_sdk::cachet::{
    Component, ComponentStatus, Incident, IncidentStatus, IncidentUpdate, NewComponent, NewIncident,
    NewIncidentUpdate, NewSchedule, Schedule,
};
use bridge_sdk::pagerduty::{MaintenanceWindow, MaintenanceWindowPage, ServiceReference};
use bridge_sdk::{ErrorContext, MaintenanceSource, Result, ServiceError, StatusPage};
use serde_json::Value;

fn remote_failure(endpoint: &str) -> ServiceError {
    ServiceError::service("fake failure").with_context(
        ErrorContext::for_service("cachet")
            .status_code(500)
            .endpoint(endpoint)
            .response_body(r#"{"errors":[{"detail":"fake failure"}]}"#),
    )
}

pub fn component(id: u64, name: &str) -> Component {
    Component {
        id,
        name: name.to_string(),
        description: None,
        status: ComponentStatus::Operational,
        link: None,
        group_id: None,
        enabled: true,
    }
}

pub fn incident(id: u64, name: &str, meta: Option<Value>, component_id: u64) -> Incident {
    Incident {
        id,
        name: name.to_string(),
        message: String::new(),
        status: IncidentStatus::Investigating,
        component_id,
        meta,
    }
}

pub fn schedule(id: u64, name: &str, scheduled_at: &str, completed_at: &str) -> Schedule {
    Schedule {
        id,
        name: name.to_string(),
        message: String::new(),
        status: Default::default(),
        scheduled_at: Some(scheduled_at.to_string()),
        completed_at: Some(completed_at.to_string()),
        components: Vec::new(),
    }
}

pub fn window(id: &str, summary: &str, start: &str, end: &str, services: &[&str]) -> MaintenanceWindow {
    MaintenanceWindow {
        id: id.to_string(),
        summary: summary.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        services: services
            .iter()
            .map(|name| ServiceReference {
                id: format!("S{}", name),
                summary: name.to_string(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

#[derive(Default)]
struct StatusPageState {
    components: Vec<Component>,
    incidents: Vec<Incident>,
    schedules: Vec<Schedule>,

    ping_fails: bool,
    listings_fail: bool,
    creations_fail: bool,
    rejected_schedules: Vec<String>,

    component_list_sizes: Vec<u32>,
    incident_list_sizes: Vec<u32>,
    schedule_list_sizes: Vec<u32>,
    created_incidents: Vec<NewIncident>,
    updates: Vec<(u64, NewIncidentUpdate)>,
    created_schedules: Vec<NewSchedule>,
}

/// Status page held in memory, recording every call
#[derive(Default)]
pub struct FakeStatusPage {
    state: Mutex<StatusPageState>,
}

impl FakeStatusPage {
    fn with<T>(&self, f: impl FnOnce(&mut StatusPageState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_components(&self, components: Vec<Component>) {
        self.with(|s| s.components = components);
    }

    pub fn set_incidents(&self, incidents: Vec<Incident>) {
        self.with(|s| s.incidents = incidents);
    }

    pub fn set_schedules(&self, schedules: Vec<Schedule>) {
        self.with(|s| s.schedules = schedules);
    }

    pub fn fail_ping(&self) {
        self.with(|s| s.ping_fails = true);
    }

    pub fn fail_listings(&self) {
        self.with(|s| s.listings_fail = true);
    }

    pub fn fail_creations(&self) {
        self.with(|s| s.creations_fail = true);
    }

    /// Reject schedule creation for one schedule name
    pub fn reject_schedule(&self, name: &str) {
        self.with(|s| s.rejected_schedules.push(name.to_string()));
    }

    pub fn component_list_sizes(&self) -> Vec<u32> {
        self.with(|s| s.component_list_sizes.clone())
    }

    pub fn incident_list_sizes(&self) -> Vec<u32> {
        self.with(|s| s.incident_list_sizes.clone())
    }

    pub fn schedule_list_sizes(&self) -> Vec<u32> {
        self.with(|s| s.schedule_list_sizes.clone())
    }

    pub fn created_incidents(&self) -> Vec<NewIncident> {
        self.with(|s| s.created_incidents.clone())
    }

    pub fn updates(&self) -> Vec<(u64, NewIncidentUpdate)> {
        self.with(|s| s.updates.clone())
    }

    pub fn created_schedules(&self) -> Vec<NewSchedule> {
        self.with(|s| s.created_schedules.clone())
    }

    /// Number of create calls of any kind
    pub fn mutation_count(&self) -> usize {
        self.with(|s| s.created_incidents.len() + s.updates.len() + s.created_schedules.len())
    }
}

fn first_page<T: Clone>(items: &[T], per_page: u32) -> Vec<T> {
    items.iter().take(per_page as usize).cloned().collect()
}

#[async_trait]
impl StatusPage for FakeStatusPage {
    async fn ping(&self) -> Result<()> {
        if self.with(|s| s.ping_fails) {
            return Err(ServiceError::network("Connection error: status page unreachable"));
        }
        Ok(())
    }

    async fn list_components(&self, per_page: u32) -> Result<Vec<Component>> {
        self.with(|s| {
            s.component_list_sizes.push(per_page);
            if s.listings_fail {
                return Err(remote_failure("api/v1/components"));
            }
            Ok(first_page(&s.components, per_page))
        })
    }

    async fn create_component(&self, new: &NewComponent) -> Result<Component> {
        self.with(|s| {
            let created = component(s.components.len() as u64 + 1, &new.name);
            s.components.push(created.clone());
            Ok(created)
        })
    }

    async fn list_incidents(&self, per_page: u32) -> Result<Vec<Incident>> {
        self.with(|s| {
            s.incident_list_sizes.push(per_page);
            if s.listings_fail {
                return Err(remote_failure("api/v1/incidents"));
            }
            Ok(first_page(&s.incidents, per_page))
        })
    }

    async fn create_incident(&self, new: &NewIncident) -> Result<Incident> {
        self.with(|s| {
            s.created_incidents.push(new.clone());
            if s.creations_fail {
                return Err(remote_failure("api/v1/incidents"));
            }
            let created = Incident {
                id: 100 + s.incidents.len() as u64,
                name: new.name.clone(),
                message: new.message.clone(),
                status: new.status,
                component_id: new.component_id,
                meta: Some(new.meta.clone()),
            };
            s.incidents.insert(0, created.clone());
            Ok(created)
        })
    }

    async fn create_incident_update(
        &self,
        incident_id: u64,
        update: &NewIncidentUpdate,
    ) -> Result<IncidentUpdate> {
        self.with(|s| {
            s.updates.push((incident_id, update.clone()));
            if s.creations_fail {
                return Err(remote_failure("api/v1/incidents/updates"));
            }
            Ok(IncidentUpdate {
                id: s.updates.len() as u64,
                incident_id,
                status: update.status,
                message: update.message.clone(),
                human_status: Some(update.human_status.clone()),
            })
        })
    }

    async fn list_schedules(&self, per_page: u32) -> Result<Vec<Schedule>> {
        self.with(|s| {
            s.schedule_list_sizes.push(per_page);
            if s.listings_fail {
                return Err(remote_failure("api/v1/schedules"));
            }
            Ok(first_page(&s.schedules, per_page))
        })
    }

    async fn create_schedule(&self, new: &NewSchedule) -> Result<Schedule> {
        self.with(|s| {
            s.created_schedules.push(new.clone());
            if s.creations_fail || s.rejected_schedules.contains(&new.name) {
                return Err(remote_failure("api/v1/schedules"));
            }
            let created = Schedule {
                id: s.schedules.len() as u64 + 1,
                name: new.name.clone(),
                message: new.message.clone(),
                status: new.status,
                scheduled_at: Some(format!("{}:00", new.scheduled_at)),
                completed_at: Some(format!("{}:00", new.completed_at)),
                components: new.components.clone(),
            };
            s.schedules.push(created.clone());
            Ok(created)
        })
    }
}

#[derive(Default)]
struct MaintenanceState {
    windows: Vec<MaintenanceWindow>,
    max_per_page: Option<usize>,
    always_more: bool,
    fails: bool,
    requests: Vec<(u32, u32)>,
}

/// Upstream maintenance listing held in memory
#[derive(Default)]
pub struct FakeMaintenanceSource {
    state: Mutex<MaintenanceState>,
}

impl FakeMaintenanceSource {
    pub fn new(windows: Vec<MaintenanceWindow>) -> Self {
        let source = Self::default();
        source.state.lock().unwrap().windows = windows;
        source
    }

    /// Serve at most `max` windows per page regardless of the requested limit
    pub fn paged(self, max: usize) -> Self {
        self.state.lock().unwrap().max_per_page = Some(max);
        self
    }

    /// Report `more` on every page, including empty ones
    pub fn always_more(self) -> Self {
        self.state.lock().unwrap().always_more = true;
        self
    }

    pub fn fail(&self) {
        self.state.lock().unwrap().fails = true;
    }

    /// `(offset, limit)` of every request made
    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl MaintenanceSource for FakeMaintenanceSource {
    async fn list_maintenance_windows(&self, offset: u32, limit: u32) -> Result<MaintenanceWindowPage> {
        let mut s = self.state.lock().unwrap();
        s.requests.push((offset, limit));
        if s.fails {
            return Err(ServiceError::authentication("Invalid token"));
        }

        let per_page = s.max_per_page.unwrap_or(limit as usize).min(limit as usize);
        let start = (offset as usize).min(s.windows.len());
        let end = (start + per_page).min(s.windows.len());

        Ok(MaintenanceWindowPage {
            maintenance_windows: s.windows[start..end].to_vec(),
            limit,
            offset,
            more: s.always_more || end < s.windows.len(),
            total: Some(s.windows.len() as u32),
        })
    }
}
