//! Alert continuity across polling cycles
//!
//! Every unhealthy observation of a server produces an [`Alert`] that points back at
//! the previous alert for the same URL, so consecutive failures form a chain instead
//! of unrelated duplicates. A healthy observation clears the URL and breaks the chain.
//!
//! ```text
//! cycle:    1         2         3        4
//! color:    YELLOW    RED       GREEN    YELLOW
//! tracked:  A1 <----- A2        -        A4
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;

use crate::{HealthColor, ProjectKey};

/// Health event for a single server
#[derive(Debug)]
pub struct Alert {
    /// The last alert raised for the same URL before this one
    previous: Option<Arc<Alert>>,
    color: HealthColor,
    project: ProjectKey,
    url: String,
    message: String,
    raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        previous: Option<Arc<Alert>>,
        color: HealthColor,
        project: ProjectKey,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            previous,
            color,
            project,
            url: url.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn previous(&self) -> Option<&Arc<Alert>> {
        self.previous.as_ref()
    }

    pub fn color(&self) -> HealthColor {
        self.color
    }

    pub fn project(&self) -> &ProjectKey {
        &self.project
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raised_at(&self) -> DateTime<Utc> {
        self.raised_at
    }

    /// Walk the chain from this alert back to the first one after the last clearance
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        std::iter::successors(Some(self), |alert| alert.previous.as_deref())
    }

    /// Number of consecutive unhealthy cycles this alert represents
    pub fn chain_len(&self) -> usize {
        self.history().count()
    }
}

// `previous` is reduced to the chain length
impl Serialize for Alert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Alert", 6)?;
        state.serialize_field("color", &self.color)?;
        state.serialize_field("project", &self.project)?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("raised_at", &self.raised_at)?;
        state.serialize_field("chain_len", &self.chain_len())?;
        state.end()
    }
}

impl Drop for Alert {
    // unlink iteratively, long outages build long chains
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(alert) = next {
            match Arc::try_unwrap(alert) {
                Ok(mut alert) => next = alert.previous.take(),
                Err(_) => break,
            }
        }
    }
}

/// Latest alert per server URL.
///
/// A URL that has been observed healthy maps to `None`.
#[derive(Debug, Clone, Default)]
pub struct AlertTracker {
    latest: HashMap<String, Option<Arc<Alert>>>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest unresolved alert for `url`
    pub fn latest(&self, url: &str) -> Option<Arc<Alert>> {
        self.latest.get(url).cloned().flatten()
    }

    /// Whether `url` has been observed at least once
    pub fn is_tracked(&self, url: &str) -> bool {
        self.latest.contains_key(url)
    }

    pub fn tracked_urls(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    /// Record an observation of `url`.
    ///
    /// A green observation clears the URL and returns `None`. Yellow and red raise a
    /// new alert chained to the previous one, which the caller appends to the cycle's
    /// alert list. An unset color leaves the URL untouched.
    pub fn observe(
        &mut self,
        project: &ProjectKey,
        url: &str,
        color: HealthColor,
        message: impl Into<String>,
    ) -> Option<Arc<Alert>> {
        match color {
            HealthColor::Green => {
                self.clear(url);
                return None;
            }
            HealthColor::Unset => return None,
            HealthColor::Yellow | HealthColor::Red => {}
        }

        let previous = self.latest(url);
        let alert = Arc::new(Alert::new(previous, color, project.clone(), url, message));
        debug!(
            "{url}: {color} alert raised (continues previous: {})",
            alert.previous.is_some()
        );

        self.latest.insert(url.to_string(), Some(alert.clone()));
        Some(alert)
    }

    pub fn clear(&mut self, url: &str) {
        if self.latest(url).is_some() {
            debug!("{url}: alert cleared");
        }
        self.latest.insert(url.to_string(), None);
    }
}
