//! Maintenance window reconciliation
//!
//! Copies upcoming upstream maintenance windows onto the status page as
//! schedules. There is no shared identifier between the two systems, so a
//! window's identity is its start/end pair rendered in the status page's
//! timezone at second precision. A schedule is created once per pair and
//! never updated afterwards.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bridge_sdk::cachet::{Component, NewSchedule, Schedule, ScheduleStatus};
use bridge_sdk::pagerduty::MaintenanceWindow;
use bridge_sdk::{MaintenanceSource, ServiceError, StatusPage};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::lookup::{CorrelationStore, DEFAULT_PAGE_SIZE};
use crate::normalizer::{dedup_key, TimeNormalizer};

/// Name and message used when a window has no description
pub const PLACEHOLDER_DESCRIPTION: &str = "Maintenance";

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Windows requested per upstream page
pub const UPSTREAM_PAGE_LIMIT: u32 = 100;

/// Failures that abandon a whole iteration
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to fetch maintenance windows: {0}")]
    FetchWindows(#[source] ServiceError),

    #[error("failed to list schedules: {0}")]
    ListSchedules(#[source] ServiceError),
}

/// Per-window tallies for one iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub fetched: usize,
    pub created: usize,
    pub already_present: usize,
    /// Windows that ended before the iteration started
    pub expired: usize,
    /// Windows with an unparseable start or end
    pub invalid: usize,
    /// Windows the status page refused to create
    pub failed: usize,
}

enum WindowOutcome {
    Created,
    AlreadyPresent,
    Expired,
    Invalid,
    Failed,
}

pub struct MaintenanceReconciler {
    source: Arc<dyn MaintenanceSource>,
    status_page: Arc<dyn StatusPage>,
    correlation: Arc<dyn CorrelationStore>,
    normalizer: TimeNormalizer,
    interval: Duration,
    page_size: u32,
}

impl MaintenanceReconciler {
    pub fn new(
        source: Arc<dyn MaintenanceSource>,
        status_page: Arc<dyn StatusPage>,
        correlation: Arc<dyn CorrelationStore>,
        normalizer: TimeNormalizer,
    ) -> Self {
        Self {
            source,
            status_page,
            correlation,
            normalizer,
            interval: DEFAULT_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Pause between iterations
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of existing schedules read per iteration
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Run iterations until a shutdown signal arrives
    ///
    /// The interval is measured from the end of one iteration to the start
    /// of the next, so a slow iteration delays the schedule but never skips
    /// a pause. Iteration errors are logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Maintenance reconciliation started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                result = self.run_iteration(Utc::now()) => {
                    if let Err(e) = result {
                        error!(error = %e, "Maintenance reconciliation iteration skipped");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Maintenance reconciliation shutting down");
    }

    /// One full pass: fetch, index, create what is missing
    ///
    /// `now` decides which windows are already over.
    pub async fn run_iteration(&self, now: DateTime<Utc>) -> Result<IterationReport, ReconcileError> {
        let windows = self
            .fetch_all_windows()
            .await
            .map_err(ReconcileError::FetchWindows)?;

        let schedules = self
            .status_page
            .list_schedules(self.page_size)
            .await
            .map_err(ReconcileError::ListSchedules)?;
        let mut index = existing_keys(&schedules);

        let mut report = IterationReport {
            fetched: windows.len(),
            ..IterationReport::default()
        };

        for window in &windows {
            match self.reconcile_window(window, now, &mut index).await {
                WindowOutcome::Created => report.created += 1,
                WindowOutcome::AlreadyPresent => report.already_present += 1,
                WindowOutcome::Expired => report.expired += 1,
                WindowOutcome::Invalid => report.invalid += 1,
                WindowOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            fetched = report.fetched,
            created = report.created,
            already_present = report.already_present,
            expired = report.expired,
            invalid = report.invalid,
            failed = report.failed,
            "Maintenance reconciliation iteration finished"
        );
        Ok(report)
    }

    /// Every upstream window, following `offset` pagination
    pub async fn fetch_all_windows(&self) -> Result<Vec<MaintenanceWindow>, ServiceError> {
        let mut windows = Vec::new();
        let mut offset = 0u32;

        loop {
            let page = self
                .source
                .list_maintenance_windows(offset, UPSTREAM_PAGE_LIMIT)
                .await?;
            let received = page.maintenance_windows.len();
            windows.extend(page.maintenance_windows);

            if !page.more {
                break;
            }
            if received == 0 {
                warn!(offset, "Upstream reported more windows but sent an empty page");
                break;
            }
            offset += received as u32;
        }

        debug!(count = windows.len(), "Fetched maintenance windows");
        Ok(windows)
    }

    async fn reconcile_window(
        &self,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
        index: &mut HashSet<String>,
    ) -> WindowOutcome {
        let parsed = TimeNormalizer::parse(&window.start_time)
            .and_then(|start| TimeNormalizer::parse(&window.end_time).map(|end| (start, end)));
        let (start, end) = match parsed {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!(window_id = %window.id, error = %e, "Skipping maintenance window");
                return WindowOutcome::Invalid;
            }
        };

        if end.with_timezone(&Utc) < now {
            return WindowOutcome::Expired;
        }

        let start = self.normalizer.normalize(start);
        let end = self.normalizer.normalize(end);
        let key = dedup_key(&start.lookup, &end.lookup);

        // Checked before component resolution so known windows cost no lookups.
        if index.contains(&key) {
            debug!(window_id = %window.id, key = %key, "Schedule already present");
            return WindowOutcome::AlreadyPresent;
        }

        let (name, message) = schedule_text(window);
        info!(
            window_id = %window.id,
            name = %name,
            scheduled_at = %start.storage,
            completed_at = %end.storage,
            "Creating maintenance schedule"
        );

        let schedule = NewSchedule {
            name,
            message,
            status: ScheduleStatus::Upcoming,
            scheduled_at: start.storage,
            completed_at: end.storage,
            components: self.resolve_components(window).await,
        };

        match self.status_page.create_schedule(&schedule).await {
            Ok(created) => {
                debug!(schedule_id = created.id, "Schedule created");
                index.insert(key);
                WindowOutcome::Created
            }
            Err(e) => {
                error!(
                    window_id = %window.id,
                    error = %e,
                    response_body = e.response_body().unwrap_or_default(),
                    "Failed to create schedule"
                );
                WindowOutcome::Failed
            }
        }
    }

    /// Status-page components for the window's services; misses are dropped
    async fn resolve_components(&self, window: &MaintenanceWindow) -> Vec<Component> {
        let mut components = Vec::new();

        for service in &window.services {
            match self.correlation.find_component(&service.summary).await {
                Ok(Some(component)) => components.push(component),
                Ok(None) => {
                    info!(window_id = %window.id, service = %service.summary, "Service has no matching component");
                }
                Err(e) => {
                    warn!(window_id = %window.id, service = %service.summary, error = %e, "Component lookup failed");
                }
            }
        }

        components
    }
}

/// Dedup keys of schedules already on the status page
fn existing_keys(schedules: &[Schedule]) -> HashSet<String> {
    schedules
        .iter()
        .map(|schedule| {
            dedup_key(
                schedule.scheduled_at.as_deref().unwrap_or_default(),
                schedule.completed_at.as_deref().unwrap_or_default(),
            )
        })
        .collect()
}

/// Schedule name and message for a window
fn schedule_text(window: &MaintenanceWindow) -> (String, String) {
    let description = window
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(PLACEHOLDER_DESCRIPTION);

    let summary = window.summary.trim();
    let name = if summary.is_empty() { description } else { summary };

    (name.to_string(), description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StatusPageLookup;
    use crate::testing::{component, schedule, window, FakeMaintenanceSource, FakeStatusPage};
    use chrono::TimeZone;

    fn before_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap()
    }

    fn reconciler(source: &Arc<FakeMaintenanceSource>, page: &Arc<FakeStatusPage>) -> MaintenanceReconciler {
        MaintenanceReconciler::new(
            source.clone(),
            page.clone(),
            Arc::new(StatusPageLookup::new(page.clone())),
            TimeNormalizer::from_name("Europe/Berlin").unwrap(),
        )
    }

    fn db_upgrade() -> MaintenanceWindow {
        window(
            "PW1",
            "DB upgrade",
            "2024-01-01T10:00:00-05:00",
            "2024-01-01T12:00:00-05:00",
            &["API"],
        )
    }

    #[tokio::test]
    async fn test_creates_schedule_in_target_timezone() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]));
        let page = Arc::new(FakeStatusPage::default());
        page.set_components(vec![component(1, "Web"), component(2, "API")]);

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.created, 1);
        let created = page.created_schedules();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "DB upgrade");
        assert_eq!(created[0].message, PLACEHOLDER_DESCRIPTION);
        assert_eq!(created[0].status, ScheduleStatus::Upcoming);
        assert_eq!(created[0].scheduled_at, "2024-01-01 16:00");
        assert_eq!(created[0].completed_at, "2024-01-01 18:00");
        assert_eq!(created[0].components, vec![component(2, "API")]);
    }

    #[tokio::test]
    async fn test_second_iteration_is_idempotent() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]));
        let page = Arc::new(FakeStatusPage::default());
        let reconciler = reconciler(&source, &page);

        reconciler.run_iteration(before_2024()).await.unwrap();
        let report = reconciler.run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.already_present, 1);
        assert_eq!(report.created, 0);
        assert_eq!(page.created_schedules().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_schedule_matches_on_second_precision() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]));
        let page = Arc::new(FakeStatusPage::default());
        page.set_schedules(vec![schedule(
            9,
            "Something else",
            "2024-01-01 16:00:00",
            "2024-01-01 18:00:00",
        )]);

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.already_present, 1);
        assert!(page.created_schedules().is_empty());
        assert!(page.component_list_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_identical_windows_collide() {
        let mut other = db_upgrade();
        other.id = "PW2".to_string();
        other.summary = "Different summary".to_string();
        other.description = Some("Different description".to_string());
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade(), other]));
        let page = Arc::new(FakeStatusPage::default());

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.already_present, 1);
        assert_eq!(page.created_schedules().len(), 1);
    }

    #[tokio::test]
    async fn test_past_window_makes_no_calls() {
        let past = window(
            "POLD",
            "Old",
            "2020-01-01T10:00:00Z",
            "2020-01-01T12:00:00Z",
            &["API"],
        );
        let source = Arc::new(FakeMaintenanceSource::new(vec![past]));
        let page = Arc::new(FakeStatusPage::default());

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(page.mutation_count(), 0);
        assert!(page.component_list_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_window_does_not_abort_batch() {
        let broken = window("PBAD", "Broken", "tomorrow-ish", "2024-01-01T12:00:00Z", &[]);
        let source = Arc::new(FakeMaintenanceSource::new(vec![broken, db_upgrade()]));
        let page = Arc::new(FakeStatusPage::default());

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.invalid, 1);
        assert_eq!(report.created, 1);
        assert_eq!(page.created_schedules()[0].name, "DB upgrade");
    }

    #[tokio::test]
    async fn test_creation_failure_is_isolated() {
        let later = window(
            "PW3",
            "Cache flush",
            "2024-02-01T10:00:00Z",
            "2024-02-01T11:00:00Z",
            &[],
        );
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade(), later]));
        let page = Arc::new(FakeStatusPage::default());
        page.reject_schedule("DB upgrade");

        let report = reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert_eq!(page.created_schedules().len(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_services_are_dropped() {
        let mut maintenance = db_upgrade();
        maintenance.services = window("x", "x", "", "", &["API", "Billing"]).services;
        let source = Arc::new(FakeMaintenanceSource::new(vec![maintenance]));
        let page = Arc::new(FakeStatusPage::default());
        page.set_components(vec![component(2, "API")]);

        reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        assert_eq!(page.created_schedules()[0].components, vec![component(2, "API")]);
    }

    #[tokio::test]
    async fn test_description_used_for_message_and_missing_summary() {
        let mut maintenance = db_upgrade();
        maintenance.summary = String::new();
        maintenance.description = Some("Planned failover".to_string());
        let source = Arc::new(FakeMaintenanceSource::new(vec![maintenance]));
        let page = Arc::new(FakeStatusPage::default());

        reconciler(&source, &page).run_iteration(before_2024()).await.unwrap();

        let created = page.created_schedules();
        assert_eq!(created[0].name, "Planned failover");
        assert_eq!(created[0].message, "Planned failover");
    }

    #[tokio::test]
    async fn test_pagination_follows_offsets() {
        let windows = (0..5)
            .map(|i| {
                window(
                    &format!("PW{}", i),
                    "Patch",
                    &format!("2024-03-0{}T10:00:00Z", i + 1),
                    &format!("2024-03-0{}T11:00:00Z", i + 1),
                    &[],
                )
            })
            .collect();
        let source = Arc::new(FakeMaintenanceSource::new(windows).paged(2));
        let page = Arc::new(FakeStatusPage::default());

        let fetched = reconciler(&source, &page).fetch_all_windows().await.unwrap();

        assert_eq!(fetched.len(), 5);
        let offsets: Vec<u32> = source.requests().iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_empty_page_ends_pagination() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]).always_more());
        let page = Arc::new(FakeStatusPage::default());

        let fetched = reconciler(&source, &page).fetch_all_windows().await.unwrap();

        assert_eq!(fetched.len(), 1);
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_iteration() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]));
        source.fail();
        let page = Arc::new(FakeStatusPage::default());

        let err = reconciler(&source, &page)
            .run_iteration(before_2024())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::FetchWindows(_)));
        assert!(page.schedule_list_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_listing_failure_skips_iteration() {
        let source = Arc::new(FakeMaintenanceSource::new(vec![db_upgrade()]));
        let page = Arc::new(FakeStatusPage::default());
        page.fail_listings();

        let err = reconciler(&source, &page)
            .run_iteration(before_2024())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::ListSchedules(_)));
        assert_eq!(page.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = Arc::new(FakeMaintenanceSource::new(Vec::new()));
        let page = Arc::new(FakeStatusPage::default());
        let reconciler = reconciler(&source, &page).with_interval(Duration::from_millis(5));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

        for _ in 0..200 {
            if source.requests().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(source.requests().len() >= 2);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
