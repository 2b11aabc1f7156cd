//! StatusRetriever - polls every configured status page and publishes project status
//!
//! ## Cycle
//!
//! ```text
//! settings ─► fetch all pages (bounded, concurrent) ─► classify per server ─► alerts
//!                                                                   │
//!                     published map ◄── swap ◄── assemble per project
//! ```
//!
//! A cycle never touches published state until it is complete: it works on a copy of
//! the alert tracker and a fresh status map, then swaps both in. Readers always see a
//! whole snapshot, either the previous one or the new one.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use crate::alerts::{Alert, AlertTracker};
use crate::config::{ProjectConfig, SettingsProvider};
use crate::error::RetrieveError;
use crate::extract::MetricExtractor;
use crate::fetch::{PageFetcher, StatusPage};
use crate::{HealthColor, ProjectKey, ProjectStatus, ServerMetrics, ServerStatus};

/// Published status of every project, keyed by project
pub type StatusSnapshot = Arc<HashMap<ProjectKey, Arc<ProjectStatus>>>;

/// Default number of status pages fetched at the same time
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Result of checking a single server
#[derive(Debug)]
pub enum ServerOutcome {
    Healthy(ServerMetrics),
    Offline,
    Failed(RetrieveError),
}

impl ServerOutcome {
    pub fn color(&self) -> HealthColor {
        match self {
            ServerOutcome::Healthy(_) => HealthColor::Green,
            ServerOutcome::Offline => HealthColor::Red,
            ServerOutcome::Failed(_) => HealthColor::Yellow,
        }
    }
}

pub struct StatusRetriever {
    settings: Arc<dyn SettingsProvider>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: MetricExtractor,
    max_concurrent_fetches: usize,

    /// Last published status per project, replaced wholesale
    statuses: RwLock<StatusSnapshot>,

    /// Alert continuity carried from cycle to cycle
    alerts: RwLock<Arc<AlertTracker>>,

    /// Serializes refresh cycles
    cycle: Mutex<()>,
}

impl StatusRetriever {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: MetricExtractor,
    ) -> Self {
        Self {
            settings,
            fetcher,
            extractor,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            statuses: RwLock::new(Arc::new(HashMap::new())),
            alerts: RwLock::new(Arc::new(AlertTracker::new())),
            cycle: Mutex::new(()),
        }
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Latest published status of `project`, if it completed a cycle
    pub async fn get_status(&self, project: &ProjectKey) -> Option<Arc<ProjectStatus>> {
        self.statuses.read().await.get(project).cloned()
    }

    /// Every published project status at once
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.statuses.read().await.clone()
    }

    /// Latest unresolved alert for a server URL
    pub async fn latest_alert(&self, url: &str) -> Option<Arc<Alert>> {
        self.alerts.read().await.latest(url)
    }

    /// Run one polling cycle over all configured projects and publish the results.
    ///
    /// Concurrent calls are serialized.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let _cycle = self.cycle.lock().await;

        let projects = self.settings.projects();
        debug!("refreshing {} projects", projects.len());

        let urls: Vec<String> = projects
            .iter()
            .flat_map(|project| project.urls.iter().flatten())
            .cloned()
            .collect();

        let mut outcomes = stream::iter(urls)
            .map(|url| async move { self.check_server(&url).await })
            .buffered(self.max_concurrent_fetches)
            .collect::<Vec<_>>()
            .await
            .into_iter();

        let mut tracker = AlertTracker::clone(&**self.alerts.read().await);
        let mut statuses = HashMap::with_capacity(projects.len());

        for project in &projects {
            let urls = project.urls.as_deref().unwrap_or_default();
            let project_outcomes = outcomes.by_ref().take(urls.len()).collect();
            let status = assemble_project(project, project_outcomes, &mut tracker);

            info!(
                "application status: {} -> {} servers, {} offline, {} alerts",
                project.key,
                status.server_count(),
                status.offline_count(),
                status.alerts.len()
            );

            if statuses.insert(project.key.clone(), Arc::new(status)).is_some() {
                warn!("project {} configured more than once, keeping the last", project.key);
            }
        }

        *self.alerts.write().await = Arc::new(tracker);
        *self.statuses.write().await = Arc::new(statuses);
        trace!("published new status snapshot");
    }

    /// Fetch and parse one status page. Never fails; every problem is an outcome.
    #[instrument(skip(self))]
    pub async fn check_server(&self, url: &str) -> ServerOutcome {
        let page = match self.fetcher.fetch(url).await {
            Ok(StatusPage::Offline) => return ServerOutcome::Offline,
            Ok(StatusPage::Online(page)) => page,
            Err(e) => return ServerOutcome::Failed(e.into()),
        };

        match self.extractor.extract(&page) {
            Ok(metrics) => ServerOutcome::Healthy(metrics),
            Err(e) => ServerOutcome::Failed(e.into()),
        }
    }
}

/// Turn the outcomes of one project's servers into its status, updating `tracker`.
///
/// `outcomes` are in the same order as the project's URLs.
pub fn assemble_project(
    project: &ProjectConfig,
    outcomes: Vec<ServerOutcome>,
    tracker: &mut AlertTracker,
) -> ProjectStatus {
    let urls = project.urls.as_deref().unwrap_or_default();
    let mut servers = Vec::with_capacity(urls.len());
    let mut alerts = Vec::new();

    for (index, (url, outcome)) in urls.iter().zip(outcomes).enumerate() {
        let position = index + 1;
        let server = ServerStatus::new(url.as_str()).with_color(outcome.color());

        let (server, message) = match outcome {
            ServerOutcome::Healthy(metrics) => (server.with_metrics(metrics), String::new()),
            ServerOutcome::Offline => (server, format!("Server {position} offline")),
            ServerOutcome::Failed(e) => {
                warn!("could not retrieve status for '{url}': {} - {e}", e.kind());
                (server, e.to_string())
            }
        };

        if let Some(alert) = tracker.observe(&project.key, url, server.color, message) {
            alerts.push(alert);
        }
        servers.push(server);
    }

    ProjectStatus::new(servers, alerts)
}
