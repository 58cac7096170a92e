//! Probe summary parsing.
//!
//! The probe ends its report with an aggregate line such as:
//!
//! ```text
//! rtt min/avg/max/mdev = 12.345/15.678/20.901/2.345 ms
//! ```
//!
//! The fourth whitespace-separated field of the final line is read as
//! `min/avg/max/mdev`. Probes that print a different layout on their last
//! line (busybox omits `mdev`, some locales reorder the words) are reported
//! as [`ParseError`] rather than guessed at.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of the stats token within the summary line.
const STATS_FIELD_INDEX: usize = 3;

/// Names of the slash-delimited values, in output order.
const VALUE_NAMES: [&str; 4] = ["min", "avg", "max", "mdev"];

/// Errors that can occur while parsing probe output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Nothing to parse.
    #[error("probe output is empty")]
    Empty,

    /// The final line has fewer fields than the summary layout requires.
    #[error("summary line has {found} fields, expected at least 4: '{line}'")]
    MissingSummary { line: String, found: usize },

    /// The stats token does not hold exactly four values.
    #[error("summary token '{token}' has {found} slash-delimited values, expected 4")]
    ValueCount { token: String, found: usize },

    /// A value is not a usable latency.
    #[error("invalid {name} value '{value}' in summary token '{token}'")]
    InvalidValue {
        name: &'static str,
        value: String,
        token: String,
    },
}

/// Aggregate latency statistics reported by one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Fastest round trip (ms).
    pub min_ms: f64,
    /// Mean round trip (ms).
    pub avg_ms: f64,
    /// Slowest round trip (ms).
    pub max_ms: f64,
    /// Mean deviation of round trips (ms).
    pub mdev_ms: f64,
}

/// Parse the probe's summary line into [`LatencyStats`].
///
/// # Errors
/// Returns [`ParseError`] when the output is empty or the final line does not
/// carry four non-negative, finite values in its fourth field.
pub fn parse_summary(output: &str) -> Result<LatencyStats, ParseError> {
    let line = output.trim().lines().last().ok_or(ParseError::Empty)?.trim();

    let fields: Vec<&str> = line.split_whitespace().collect();
    let token = *fields
        .get(STATS_FIELD_INDEX)
        .ok_or_else(|| ParseError::MissingSummary {
            line: line.to_string(),
            found: fields.len(),
        })?;

    let parts: Vec<&str> = token.split('/').collect();
    if parts.len() != VALUE_NAMES.len() {
        return Err(ParseError::ValueCount {
            token: token.to_string(),
            found: parts.len(),
        });
    }

    let mut values = [0.0_f64; 4];
    for (i, raw) in parts.iter().enumerate() {
        values[i] = parse_value(VALUE_NAMES[i], raw, token)?;
    }
    let [min_ms, avg_ms, max_ms, mdev_ms] = values;

    Ok(LatencyStats {
        min_ms,
        avg_ms,
        max_ms,
        mdev_ms,
    })
}

fn parse_value(name: &'static str, raw: &str, token: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidValue {
        name,
        value: raw.to_string(),
        token: token.to_string(),
    };

    parse_latency(raw).ok_or_else(invalid)
}

/// Parse one latency value in milliseconds.
///
/// Only finite, non-negative numbers are latencies; `inf`, `NaN` and negative
/// values are rejected.
pub(crate) fn parse_latency(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}
