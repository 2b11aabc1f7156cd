pub mod actors;
pub mod alerts;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod retriever;
pub mod util;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alerts::Alert;

/// Identifier of a monitored project/application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ProjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Health of a single server as shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthColor {
    /// Not evaluated yet
    #[default]
    Unset,

    /// Status page fetched and parsed
    Green,

    /// Fetching or parsing the status page failed
    Yellow,

    /// Server reported offline
    Red,
}

impl HealthColor {
    pub fn is_healthy(self) -> bool {
        self == HealthColor::Green
    }
}

impl fmt::Display for HealthColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthColor::Unset => "unset",
            HealthColor::Green => "green",
            HealthColor::Yellow => "yellow",
            HealthColor::Red => "red",
        };
        f.write_str(name)
    }
}

/// Metrics recovered from one status page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub sessions: Option<i32>,

    /// Milliseconds since the server was started
    pub uptime_ms: Option<i64>,

    pub average_request_ms: Option<u64>,
    pub requests_per_minute: Option<i32>,
}

/// Status of one monitored server for a single polling cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub url: String,
    pub color: HealthColor,
    #[serde(flatten)]
    pub metrics: ServerMetrics,
}

impl ServerStatus {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            color: HealthColor::Unset,
            metrics: ServerMetrics::default(),
        }
    }

    pub fn with_color(mut self, color: HealthColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_metrics(mut self, metrics: ServerMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// All servers of one project plus the alerts raised during the cycle that produced it
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectStatus {
    pub servers: Vec<ServerStatus>,
    pub alerts: Vec<Arc<Alert>>,
}

impl ProjectStatus {
    pub fn new(servers: Vec<ServerStatus>, alerts: Vec<Arc<Alert>>) -> Self {
        Self { servers, alerts }
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Number of servers that reported themselves offline
    pub fn offline_count(&self) -> usize {
        self.servers
            .iter()
            .filter(|server| server.color == HealthColor::Red)
            .count()
    }

    pub fn total_sessions(&self) -> Option<i32> {
        sum_reported(self.servers.iter().map(|s| s.metrics.sessions))
    }

    pub fn total_requests_per_minute(&self) -> Option<i32> {
        sum_reported(self.servers.iter().map(|s| s.metrics.requests_per_minute))
    }

    /// Mean of the average request times of all servers reporting one
    pub fn average_request_time(&self) -> Option<u64> {
        let reported: Vec<u64> = self
            .servers
            .iter()
            .filter_map(|s| s.metrics.average_request_ms)
            .collect();

        if reported.is_empty() {
            return None;
        }

        // page values can be anything up to u64::MAX, sum wide
        let total: u128 = reported.iter().map(|&ms| u128::from(ms)).sum();
        let mean = total / reported.len() as u128;
        Some(mean as u64)
    }

    /// Longest uptime of any server, in milliseconds
    pub fn uptime(&self) -> Option<i64> {
        self.servers.iter().filter_map(|s| s.metrics.uptime_ms).max()
    }
}

fn sum_reported(values: impl Iterator<Item = Option<i32>>) -> Option<i32> {
    values
        .flatten()
        .fold(None, |acc, value| Some(acc.unwrap_or(0i32).saturating_add(value)))
}
