//! Schedules, retry policy and scheduler errors.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default record schedule: the 14th minute of every hour.
pub const DEFAULT_RECORD_CRON: &str = "0 14 * * * *";

/// Default number of retries after a failed task run.
pub const DEFAULT_RETRIES: u32 = 1;

/// Default delay before a retry (1 minute).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

/// Errors that can occur while scheduling tasks.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid schedule definition.
    #[error("config error: {0}")]
    Config(String),

    /// Underlying job scheduler failure.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Schedule for task execution.
///
/// Supports both fixed interval and cron-based scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval between runs.
    ///
    /// Interval is clamped to a minimum of 1 second.
    Interval(Duration),

    /// Cron expression for scheduled execution.
    ///
    /// Uses standard cron syntax: `sec min hour day month weekday` (6-field).
    /// Example: `"0 14 * * * *"` = every hour at minute 14
    Cron(String),
}

impl Schedule {
    /// Create an interval schedule.
    ///
    /// Interval is clamped to a minimum of 1 second.
    pub fn interval(duration: Duration) -> Self {
        if duration < MIN_INTERVAL {
            tracing::warn!(min_interval = ?MIN_INTERVAL,
                "Interval duration is less than minimum allowed. Using minimum duration."
            );
            Self::Interval(MIN_INTERVAL)
        } else {
            Self::Interval(duration)
        }
    }

    /// Create a cron schedule with immediate validation.
    ///
    /// # Errors
    /// Returns `SchedulerError::Config` if the cron expression is invalid.
    pub fn cron(expr: impl AsRef<str>) -> Result<Self, SchedulerError> {
        use std::str::FromStr;

        let expr = expr.as_ref().trim();
        cron::Schedule::from_str(expr)
            .map_err(|e| SchedulerError::Config(format!("invalid cron expression: {e}")))?;

        Ok(Self::Cron(expr.to_string()))
    }

    /// Parse a schedule from configuration text.
    ///
    /// A humantime duration (`"1h"`, `"30m"`) gives an interval; anything
    /// else must be a valid cron expression.
    pub fn parse(text: &str) -> Result<Self, SchedulerError> {
        match crate::config::parse_duration(text) {
            Ok(duration) => Ok(Self::interval(duration)),
            Err(_) => Self::cron(text),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::Cron(DEFAULT_RECORD_CRON.to_string())
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval(d) => write!(f, "every {:?}", d),
            Self::Cron(expr) => write!(f, "cron: {}", expr),
        }
    }
}

/// Retry policy applied uniformly to every task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt (default: 1).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before each retry (default: 1m).
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds or the policy's retries are used up.
///
/// At most `1 + policy.retries` attempts are made. The last error is returned.
pub async fn run_with_retry<T, E, F, Fut>(task: &str, policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt <= policy.retries => {
                tracing::warn!(
                    task = %task,
                    attempt,
                    retry_in = ?policy.delay,
                    error = %e,
                    "Task failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                tracing::error!(task = %task, attempts = attempt, error = %e, "Task failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_schedule_interval_minimum() {
        let schedule = Schedule::interval(Duration::from_millis(100));
        assert_eq!(schedule, Schedule::Interval(MIN_INTERVAL));
    }

    #[test]
    fn test_schedule_cron_valid() {
        let schedule = Schedule::cron("0 14 * * * *").unwrap();
        assert_eq!(schedule, Schedule::Cron("0 14 * * * *".to_string()));
        assert_eq!(schedule.to_string(), "cron: 0 14 * * * *");
    }

    #[test]
    fn test_schedule_cron_invalid() {
        let err = Schedule::cron("not a cron").unwrap_err();
        assert!(err.to_string().contains("invalid cron"));
    }

    #[test]
    fn test_schedule_parse() {
        assert_eq!(
            Schedule::parse("1h").unwrap(),
            Schedule::Interval(Duration::from_secs(3600))
        );
        assert_eq!(
            Schedule::parse("0 14 * * * *").unwrap(),
            Schedule::Cron("0 14 * * * *".to_string())
        );
        assert!(Schedule::parse("whenever").is_err());
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            retries: 3,
            delay: Duration::ZERO,
        };

        let result: Result<u32, String> = run_with_retry("test", &policy, || {
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 { Err(format!("attempt {n}")) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_policy() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            retries: 1,
            delay: Duration::ZERO,
        };

        let result: Result<(), String> = run_with_retry("test", &policy, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("unreachable".to_string())
            }
        })
        .await;

        assert_eq!(result, Err("unreachable".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let attempts = Arc::new(AtomicU32::new(0));
        let result: Result<(), String> = run_with_retry("test", &RetryPolicy::none(), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
