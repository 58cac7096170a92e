//! Application configuration structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::probe::{DEFAULT_PROBE_BINARY, ProbeTarget};
use crate::report::{DEFAULT_HEATMAP_DAYS, DEFAULT_HISTOGRAM_BINS};
use crate::scheduler::{DEFAULT_RECORD_CRON, RetryPolicy, Schedule};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default log file path.
pub const DEFAULT_LOG_PATH: &str = "ping.csv";

/// Default directory for report artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

fn default_binary() -> String {
    DEFAULT_PROBE_BINARY.to_string()
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Probe configuration: the binary and the fixed target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe binary name or path (default: "ping").
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Target host, count and pause.
    #[serde(flatten)]
    pub target: ProbeTarget,
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Time-series log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Log file path (default: "ping.csv").
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

// =============================================================================
// Schedule Configuration
// =============================================================================

/// Job schedules and retry policy.
///
/// Schedules are either humantime durations (`"1h"`) or 6-field cron
/// expressions (`"0 14 * * * *"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Record schedule (default: minute 14 of every hour).
    pub record: String,

    /// Report schedule. When unset the report runs after each successful
    /// record activation.
    pub report: Option<String>,

    /// Retry policy for every task.
    pub retry: RetryPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            record: DEFAULT_RECORD_CRON.to_string(),
            report: None,
            retry: RetryPolicy::default(),
        }
    }
}

// =============================================================================
// Report Configuration
// =============================================================================

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory the charts are written to (default: ".").
    pub output_dir: PathBuf,

    /// Heatmap window in days (default: 350).
    pub heatmap_days: u32,

    /// Histogram bin count (default: 50).
    pub histogram_bins: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            heatmap_days: DEFAULT_HEATMAP_DAYS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Probe configuration.
    pub probe: ProbeConfig,

    /// Log file configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Job schedules.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Report output.
    #[serde(default)]
    pub report: ReportConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(&expand_env_vars(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line or environment overrides.
    pub fn apply_overrides(&mut self, target: Option<String>, log_path: Option<PathBuf>) {
        if let Some(host) = target {
            self.probe.target.host = host;
        }
        if let Some(path) = log_path {
            self.store.path = path;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe binary must not be empty".to_string(),
            ));
        }

        self.probe
            .target
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("probe: {e}")))?;

        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "store path must not be empty".to_string(),
            ));
        }

        self.record_schedule()?;
        self.report_schedule()?;

        if self.report.heatmap_days == 0 {
            return Err(ConfigError::ValidationError(
                "report heatmap_days must be positive".to_string(),
            ));
        }

        if self.report.histogram_bins == 0 {
            return Err(ConfigError::ValidationError(
                "report histogram_bins must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Schedule of the record job.
    pub fn record_schedule(&self) -> Result<Schedule, ConfigError> {
        Schedule::parse(&self.schedule.record)
            .map_err(|e| ConfigError::ValidationError(format!("schedule.record: {e}")))
    }

    /// Schedule of a standalone report job, if configured.
    pub fn report_schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        self.schedule
            .report
            .as_deref()
            .map(Schedule::parse)
            .transpose()
            .map_err(|e| ConfigError::ValidationError(format!("schedule.report: {e}")))
    }
}
