//! Subprocess probe invocation.
//!
//! Runs the system `ping` binary and captures its standard output.

use std::process::Stdio;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

/// Default probe binary.
pub const DEFAULT_PROBE_BINARY: &str = "ping";

/// Default number of echo requests per probe.
pub const DEFAULT_COUNT: u32 = 8;

/// Default pause (seconds) passed to the probe's `-W` flag.
pub const DEFAULT_PAUSE_SECS: u32 = 1;

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_pause() -> u32 {
    DEFAULT_PAUSE_SECS
}

/// Errors that can occur while running the probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Target parameters rejected before spawning.
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),

    /// The probe process could not be started.
    #[error("failed to spawn probe '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe exited unsuccessfully (e.g. host unreachable).
    #[error("probe exited with {}: {stderr}", describe_code(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    /// Standard output was not valid UTF-8.
    #[error("probe output is not valid UTF-8: {0}")]
    InvalidOutput(#[from] std::string::FromUtf8Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Probe target parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Target host (hostname or IP address).
    pub host: String,
    /// Number of echo requests (default: 8).
    #[serde(default = "default_count")]
    pub count: u32,
    /// Seconds passed to `-W` (default: 1).
    #[serde(default = "default_pause")]
    pub pause: u32,
}

impl ProbeTarget {
    /// Create a target with default count and pause.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            count: DEFAULT_COUNT,
            pause: DEFAULT_PAUSE_SECS,
        }
    }

    /// Set the number of echo requests.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the pause in seconds.
    pub fn with_pause(mut self, pause: u32) -> Self {
        self.pause = pause;
        self
    }

    /// Validate the target.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.host.trim().is_empty() {
            return Err(ProbeError::InvalidTarget(
                "host must not be empty".to_string(),
            ));
        }
        if self.count == 0 {
            return Err(ProbeError::InvalidTarget(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Command-line arguments for the probe binary.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-c".to_string(),
            self.count.to_string(),
            "-W".to_string(),
            self.pause.to_string(),
            self.host.trim().to_string(),
        ]
    }
}

/// Capability for running a reachability probe.
///
/// Implementations return the probe's raw text report. Probe failures are
/// ordinary results: network probes fail routinely and callers decide what a
/// failure means for the cycle.
#[async_trait::async_trait]
pub trait ProbeInvoker: Send + Sync + 'static {
    /// Run the probe once against `target`.
    async fn invoke(&self, target: &ProbeTarget) -> Result<String, ProbeError>;
}

/// Probe invoker backed by an external `ping` process.
#[derive(Debug, Clone)]
pub struct PingInvoker {
    binary: String,
}

impl PingInvoker {
    /// Create an invoker for the given binary name or path.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The binary this invoker runs.
    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for PingInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_BINARY)
    }
}

#[async_trait::async_trait]
impl ProbeInvoker for PingInvoker {
    async fn invoke(&self, target: &ProbeTarget) -> Result<String, ProbeError> {
        target.validate()?;

        tracing::debug!(
            binary = %self.binary,
            host = %target.host,
            count = target.count,
            pause = target.pause,
            "Spawning probe"
        );

        // kill_on_drop ties the child's lifetime to this future, so a
        // cancelled cycle does not leave an orphaned probe behind.
        let output = Command::new(&self.binary)
            .args(target.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = ProbeTarget::new("8.8.8.8");
        assert_eq!(target.host, "8.8.8.8");
        assert_eq!(target.count, DEFAULT_COUNT);
        assert_eq!(target.pause, DEFAULT_PAUSE_SECS);
    }

    #[test]
    fn test_target_args_shape() {
        let target = ProbeTarget::new("example.com").with_count(3).with_pause(2);
        assert_eq!(target.args(), vec!["-c", "3", "-W", "2", "example.com"]);
    }

    #[test]
    fn test_target_validation() {
        assert!(ProbeTarget::new("1.1.1.1").validate().is_ok());
        assert!(ProbeTarget::new("1.1.1.1").with_pause(0).validate().is_ok());
        assert!(matches!(
            ProbeTarget::new("  ").validate(),
            Err(ProbeError::InvalidTarget(_))
        ));
        assert!(matches!(
            ProbeTarget::new("1.1.1.1").with_count(0).validate(),
            Err(ProbeError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_exit_status_message() {
        let err = ProbeError::ExitStatus {
            code: Some(2),
            stderr: "unknown host".to_string(),
        };
        assert_eq!(err.to_string(), "probe exited with status 2: unknown host");

        let err = ProbeError::ExitStatus {
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[tokio::test]
    async fn test_invalid_target_does_not_spawn() {
        let invoker = PingInvoker::new("/nonexistent/probe-binary");
        let err = invoker
            .invoke(&ProbeTarget::new("").with_count(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let invoker = PingInvoker::new("/nonexistent/probe-binary");
        let err = invoker
            .invoke(&ProbeTarget::new("127.0.0.1"))
            .await
            .unwrap_err();
        match err {
            ProbeError::Spawn { binary, .. } => assert_eq!(binary, "/nonexistent/probe-binary"),
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        // `echo` prints its arguments back, which shows the exact invocation.
        let invoker = PingInvoker::new("echo");
        let output = invoker
            .invoke(&ProbeTarget::new("10.0.0.1").with_count(4).with_pause(1))
            .await
            .unwrap();
        assert_eq!(output.trim(), "-c 4 -W 1 10.0.0.1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit() {
        let invoker = PingInvoker::new("false");
        let err = invoker
            .invoke(&ProbeTarget::new("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ExitStatus { code: Some(1), .. }));
    }
}
