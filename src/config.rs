use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use tracing::{trace, warn};

use crate::ProjectKey;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds between two refresh cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Request timeout for a single status page, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Label table override (defaults to the Dutch status page labels)
    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ProjectConfig {
    pub key: ProjectKey,

    /// Status page URLs in display order
    pub urls: Option<Vec<String>>,
}

/// Marker class and label texts identifying metric cells on a status page
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub marker_class: String,
    pub sessions: String,
    pub started_at: String,
    pub average_request_time: String,
    pub requests_per_minute: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            marker_class: "main_label".to_string(),
            sessions: "Actieve sessies:".to_string(),
            started_at: "Gestart op:".to_string(),
            average_request_time: "Gemiddelde requesttijd:".to_string(),
            requests_per_minute: "Requests per minuut:".to_string(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    8
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Source of the per-project URL lists, consulted at the start of every cycle
pub trait SettingsProvider: Send + Sync {
    fn projects(&self) -> Vec<ProjectConfig>;
}

impl SettingsProvider for Config {
    fn projects(&self) -> Vec<ProjectConfig> {
        self.projects.clone()
    }
}

impl SettingsProvider for Vec<ProjectConfig> {
    fn projects(&self) -> Vec<ProjectConfig> {
        self.clone()
    }
}

/// Settings backed by the config file, re-read on every call.
///
/// When the file cannot be read or parsed the last good configuration is kept.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    last_good: RwLock<Config>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>, initial: Config) -> Self {
        Self {
            path: path.into(),
            last_good: RwLock::new(initial),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let config = read_config_file(&path)?;
        Ok(Self::new(path, config))
    }
}

impl SettingsProvider for FileSettings {
    fn projects(&self) -> Vec<ProjectConfig> {
        match read_config_file(&self.path) {
            Ok(config) => {
                let projects = config.projects.clone();
                if let Ok(mut last_good) = self.last_good.write() {
                    *last_good = config;
                }
                projects
            }
            Err(e) => {
                warn!("keeping previous settings: {e:#}");
                self.last_good
                    .read()
                    .map(|config| config.projects.clone())
                    .unwrap_or_default()
            }
        }
    }
}
