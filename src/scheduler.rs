//! Scheduler Layer
//!
//! Runs task pipelines on fixed intervals or cron schedules:
//!
//! - [`RecordTask`]: one probe cycle per activation
//! - [`ReportTask`]: chart generation from the log
//!
//! Tasks of a job run in order. Each task run is retried per [`RetryPolicy`],
//! and a task that keeps failing ends the activation so downstream tasks do
//! not run. At most one activation of a job is active at a time.

mod registry;
mod schedule;
mod tasks;

pub use registry::{DEFAULT_SHUTDOWN_TIMEOUT, JobInfo, Scheduler};
pub use schedule::{
    DEFAULT_RECORD_CRON, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, MIN_INTERVAL, RetryPolicy,
    Schedule, SchedulerError, run_with_retry,
};
pub use tasks::{Pipeline, RecordTask, ReportTask, Task, TaskError, TaskWindow};
