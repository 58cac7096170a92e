//! Core data types for the storage layer.
//!
//! - [`LatencySample`]: one timestamped probe result, as stored in the log

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::probe::{LatencyStats, parse_latency};
use crate::storage::StorageError;

/// Timestamp layout used when the sample has no sub-second part.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Timestamp layout used when the sample carries microseconds.
const TIMESTAMP_FORMAT_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Number of comma-separated fields in a record.
const RECORD_FIELDS: usize = 5;

/// One probe result stored in the time-series log.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use pingwatch::{LatencySample, LatencyStats};
///
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
///     .unwrap()
///     .and_hms_opt(0, 14, 0)
///     .unwrap();
/// let stats = LatencyStats { min_ms: 12.345, avg_ms: 15.678, max_ms: 20.901, mdev_ms: 2.345 };
/// let sample = LatencySample::new(ts, stats);
/// assert_eq!(sample.to_record(), "2024-01-01T00:14:00,15.678,12.345,20.901,2.345");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Local wall-clock time of the measurement (no timezone).
    pub timestamp: NaiveDateTime,
    /// Mean round trip (ms).
    pub avg_ms: f64,
    /// Fastest round trip (ms).
    pub min_ms: f64,
    /// Slowest round trip (ms).
    pub max_ms: f64,
    /// Mean deviation (ms).
    pub mdev_ms: f64,
}

impl LatencySample {
    /// Build a sample from parsed stats.
    pub fn new(timestamp: NaiveDateTime, stats: LatencyStats) -> Self {
        Self {
            timestamp,
            avg_ms: stats.avg_ms,
            min_ms: stats.min_ms,
            max_ms: stats.max_ms,
            mdev_ms: stats.mdev_ms,
        }
    }

    /// ISO-8601 timestamp as written to the log.
    pub fn timestamp_string(&self) -> String {
        if self.timestamp.nanosecond() == 0 {
            self.timestamp.format(TIMESTAMP_FORMAT).to_string()
        } else {
            self.timestamp.format(TIMESTAMP_FORMAT_MICROS).to_string()
        }
    }

    /// Format as a log record (without line terminator).
    pub fn to_record(&self) -> String {
        format!(
            "{},{:.3},{:.3},{:.3},{:.3}",
            self.timestamp_string(),
            self.avg_ms,
            self.min_ms,
            self.max_ms,
            self.mdev_ms
        )
    }

    /// Parse a log record.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidRecord` if the line does not hold a
    /// timestamp followed by four finite, non-negative numbers.
    pub fn from_record(line: &str) -> Result<Self, StorageError> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        if fields.len() != RECORD_FIELDS {
            return Err(StorageError::InvalidRecord(format!(
                "expected {} fields, found {}: '{}'",
                RECORD_FIELDS,
                fields.len(),
                line.trim()
            )));
        }

        let timestamp = parse_timestamp(fields[0]).ok_or_else(|| {
            StorageError::InvalidRecord(format!("invalid timestamp '{}'", fields[0]))
        })?;

        let number = |idx: usize, name: &str| -> Result<f64, StorageError> {
            parse_latency(fields[idx]).ok_or_else(|| {
                StorageError::InvalidRecord(format!("invalid {} '{}'", name, fields[idx]))
            })
        };

        Ok(Self {
            timestamp,
            avg_ms: number(1, "avg_ms")?,
            min_ms: number(2, "min_ms")?,
            max_ms: number(3, "max_ms")?,
            mdev_ms: number(4, "mdev_ms")?,
        })
    }
}

/// Parse an ISO-8601 local timestamp, with or without fractional seconds.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    raw.trim().parse::<NaiveDateTime>().ok()
}
