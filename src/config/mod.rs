//! Configuration module for pingwatch.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Probe binary and target (host, count, pause)
//! - Time-series log path
//! - Record/report schedules and retry policy
//! - Report output directory and chart parameters

mod app;
mod validation;

pub use app::{AppConfig, ProbeConfig, ReportConfig, ScheduleConfig, StoreConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};

// Re-export constants
pub use app::{DEFAULT_LOG_PATH, DEFAULT_OUTPUT_DIR};
