//! pingwatch - Scheduled Latency Recorder
//!
//! This crate probes a single network host on a schedule, records the
//! round-trip statistics to an append-only CSV log and renders charts from
//! that log. It can be used as a library or run as the `pingwatch` binary.
//!
//! # Architecture
//!
//! - **Probe**: Runs `ping` as a subprocess and parses its summary line
//! - **Storage**: Append-only `timestamp,avg,min,max,mdev` log
//! - **Cycle**: Probe → parse → persist, failing with a stage-tagged error
//! - **Report**: Time-series, histogram and heatmap charts from the log
//! - **Scheduler**: Cron/interval jobs with retries
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pingwatch::{PingInvoker, ProbeCycle, ProbeTarget, TimeSeriesStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(TimeSeriesStore::new("ping.csv"));
//! let cycle = ProbeCycle::new(ProbeTarget::new("8.8.8.8"), PingInvoker::default(), store);
//! let sample = cycle.run(None, None).await?;
//! println!("{}", sample.to_record());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cycle;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod storage;

pub use cycle::{CycleError, CycleStage, ProbeCycle};
pub use probe::{LatencyStats, PingInvoker, ProbeError, ProbeInvoker, ProbeTarget, parse_summary};
pub use report::{ReportError, ReportGenerator, ReportOutcome};
pub use scheduler::{RetryPolicy, Schedule, Scheduler};
pub use storage::{LatencySample, StorageError, TimeSeriesStore};
