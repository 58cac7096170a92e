//! Storage Layer
//!
//! Append-only CSV time-series log of latency samples:
//! - **Writer**: [`TimeSeriesStore::append`] adds one record per probe cycle
//! - **Reader**: [`TimeSeriesStore::read_log`] loads every readable record for reports
//!
//! # Record format
//!
//! One record per line, no header row:
//!
//! ```text
//! timestamp,avg_ms,min_ms,max_ms,mdev_ms
//! 2024-01-01T00:14:00,15.678,12.345,20.901,2.345
//! ```
//!
//! Each append writes a newline followed by the record, so a file created by
//! this crate starts with an empty line and has no trailing newline.

mod error;
mod store;
mod types;

pub use error::StorageError;
pub use store::{SampleLog, TimeSeriesStore};
pub use types::{LatencySample, TIMESTAMP_FORMAT};
