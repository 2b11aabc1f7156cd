//! Metric extraction from HTML status pages
//!
//! A status page lays out its metrics as two-cell rows: a label cell carrying the
//! marker class, followed by a value cell.
//!
//! ```text
//! <tr><td class="main_label">Actieve sessies:</td><td>17</td></tr>
//! ```
//!
//! The extractor walks every marker-tagged element, looks its text up in the
//! [`LabelTable`], and hands the text of the sibling value cell to the matching
//! [`MetricKind`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::{error, trace};

use crate::ServerMetrics;
use crate::config::LabelConfig;
use crate::error::ExtractError;

/// Format of the "started at" value after its leading weekday.
///
/// Pages render `Tue Jan 14 10:22:31 +0100 2024`; the weekday is not checked against
/// the date.
pub const START_TIME_FORMAT: &str = "%b %d %H:%M:%S %z %Y";

/// The metrics a status page can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Sessions,
    StartedAt,
    AverageRequestTime,
    RequestsPerMinute,
}

impl MetricKind {
    /// Parse `value` and store it in `metrics`.
    ///
    /// Only numeric failures are returned; an unparseable start time leaves the
    /// uptime unset.
    fn apply(
        self,
        label: &str,
        value: &str,
        metrics: &mut ServerMetrics,
        now: DateTime<Utc>,
    ) -> Result<(), ExtractError> {
        match self {
            MetricKind::Sessions => metrics.sessions = Some(parse_number(label, value)?),
            MetricKind::RequestsPerMinute => {
                metrics.requests_per_minute = Some(parse_number(label, value)?)
            }
            MetricKind::AverageRequestTime => {
                // "123 ms": only the leading token is numeric
                let number = value.split(' ').next().unwrap_or(value);
                metrics.average_request_ms = Some(parse_number(label, number)?);
            }
            MetricKind::StartedAt => match parse_start_time(value) {
                Ok(started) => {
                    let uptime = now.signed_duration_since(started.with_timezone(&Utc));
                    metrics.uptime_ms = Some(uptime.num_milliseconds());
                }
                Err(e) => {
                    error!("unable to parse start time '{value}' as '{START_TIME_FORMAT}': {e}");
                }
            },
        }

        Ok(())
    }
}

fn parse_start_time(value: &str) -> chrono::ParseResult<DateTime<chrono::FixedOffset>> {
    let without_weekday = value.split_once(' ').map_or(value, |(_, rest)| rest);
    DateTime::parse_from_str(without_weekday, START_TIME_FORMAT)
}

fn parse_number<T>(label: &str, value: &str) -> Result<T, ExtractError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value.parse().map_err(|source| ExtractError::InvalidNumber {
        label: label.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Mapping from label text to the metric it introduces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: HashMap<String, MetricKind>,
}

impl LabelTable {
    pub fn new(labels: impl IntoIterator<Item = (String, MetricKind)>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn lookup(&self, label: &str) -> Option<MetricKind> {
        self.labels.get(label).copied()
    }
}

impl From<&LabelConfig> for LabelTable {
    fn from(config: &LabelConfig) -> Self {
        Self::new([
            (config.sessions.clone(), MetricKind::Sessions),
            (config.started_at.clone(), MetricKind::StartedAt),
            (
                config.average_request_time.clone(),
                MetricKind::AverageRequestTime,
            ),
            (
                config.requests_per_minute.clone(),
                MetricKind::RequestsPerMinute,
            ),
        ])
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::from(&LabelConfig::default())
    }
}

/// Recovers [`ServerMetrics`] from the HTML of a status page
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    marker: Selector,
    labels: LabelTable,
}

impl MetricExtractor {
    pub fn new(marker_class: &str, labels: LabelTable) -> Result<Self, ExtractError> {
        let class = marker_class.trim();
        if class.is_empty() || class.contains(char::is_whitespace) {
            return Err(ExtractError::InvalidMarker(format!(
                "'{marker_class}' is not a single class name"
            )));
        }

        let marker = Selector::parse(&format!(".{class}"))
            .map_err(|e| ExtractError::InvalidMarker(format!("'{marker_class}': {e}")))?;

        Ok(Self { marker, labels })
    }

    pub fn from_config(config: &LabelConfig) -> Result<Self, ExtractError> {
        Self::new(&config.marker_class, LabelTable::from(config))
    }

    /// Extract metrics, computing uptime against the current time
    pub fn extract(&self, page: &str) -> Result<ServerMetrics, ExtractError> {
        self.extract_at(page, Utc::now())
    }

    /// Extract metrics, computing uptime against `now`
    pub fn extract_at(&self, page: &str, now: DateTime<Utc>) -> Result<ServerMetrics, ExtractError> {
        let document = Html::parse_document(page);
        let mut metrics = ServerMetrics::default();

        for label_cell in document.select(&self.marker) {
            let label = label_cell.text().collect::<String>();
            let label = label.trim();

            let Some(kind) = self.labels.lookup(label) else {
                trace!("ignoring unknown label '{label}'");
                continue;
            };

            let value = value_cell(label_cell)
                .map(cell_text)
                .ok_or_else(|| ExtractError::MissingValue {
                    label: label.to_string(),
                })?;

            trace!("{label} {value}");
            kind.apply(label, &value, &mut metrics, now)?;
        }

        Ok(metrics)
    }
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self {
            marker: Selector::parse(".main_label").expect("plain class selector"),
            labels: LabelTable::default(),
        }
    }
}

/// Second element child of the label cell's parent
fn value_cell(label_cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    label_cell
        .parent()?
        .children()
        .filter_map(ElementRef::wrap)
        .nth(1)
}

/// Text of a cell with runs of whitespace collapsed to single spaces
fn cell_text(cell: ElementRef<'_>) -> String {
    let text = cell.text().collect::<String>();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
