//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Placeholder replaced with the evaluation date (`yyyyMMdd`) in location templates.
pub const DATE_FOLDER_PLACEHOLDER: &str = "{date_folder}";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipelines: Vec<PipelineDefinition>,
}

impl Config {
    /// Find a pipeline definition by name.
    pub fn pipeline(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}

/// Scheduler loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between two ticks of the scheduler loop.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Half-width of the acceptance window around a cron fire time.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_window_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            window_secs: default_window_secs(),
        }
    }
}

/// Object storage client and transfer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Region used by the object storage client.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (S3-compatible services).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets.
    #[serde(default)]
    pub force_path_style: bool,

    /// Upper bound on items copied or deleted at the same time within one run.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_concurrent_items() -> usize {
    4
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

/// Execution record store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Execution record persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file for the sqlite backend.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "~/.ferry/executions.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files.
    #[serde(default = "default_log_directory")]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "~/.ferry/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
        }
    }
}

/// What a pipeline does with the items it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Copy items, leaving the source untouched.
    Copy,
    /// Copy items, then delete the successfully copied ones from the source.
    Move,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Copy => "copy",
            Operation::Move => "move",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "copy" => Ok(Operation::Copy),
            "move" => Ok(Operation::Move),
            other => Err(ConfigError::InvalidValue {
                field: "operation".to_string(),
                message: format!("unknown operation '{}', expected 'copy' or 'move'", other),
            }),
        }
    }
}

/// A named, scheduled source to target transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Unique pipeline name.
    pub name: String,
    /// Cron schedule (5 fields, minute granularity; 6 or 7 fields are used verbatim).
    pub schedule: String,
    /// Source location template.
    pub source: String,
    /// Target location template.
    pub target: String,
    /// Copy or move.
    pub operation: Operation,
    /// Relative keys to transfer instead of enumerating the whole source.
    #[serde(default)]
    pub source_keys: Vec<String>,
    /// Topic notified about run outcomes.
    #[serde(default)]
    pub notification_topic: Option<String>,
}

impl PipelineDefinition {
    /// Create a new pipeline definition.
    pub fn new(
        name: impl Into<String>,
        schedule: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            source: source.into(),
            target: target.into(),
            operation,
            source_keys: Vec::new(),
            notification_topic: None,
        }
    }

    /// Restrict the pipeline to an explicit list of keys.
    pub fn with_source_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the notification topic.
    pub fn with_notification_topic(mut self, topic: impl Into<String>) -> Self {
        self.notification_topic = Some(topic.into());
        self
    }

    /// Cron expression in the seconds-first form understood by the `cron` crate.
    ///
    /// Classic 5-field expressions get a `0` seconds field prepended, so the
    /// pipeline fires at the top of the matching minute.
    pub fn cron_expression(&self) -> String {
        let schedule = self.schedule.trim();
        if schedule.split_whitespace().count() == 5 {
            format!("0 {}", schedule)
        } else {
            schedule.to_string()
        }
    }
}
