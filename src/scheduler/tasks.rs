//! Scheduled tasks and task pipelines.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::cycle::{Clock, ProbeCycle, local_clock};
use crate::probe::{PingInvoker, ProbeInvoker};
use crate::report::ReportGenerator;
use crate::scheduler::{RetryPolicy, run_with_retry};

/// Error returned by a task run.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Time span covered by one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskWindow {
    /// Previous activation of the same job, if any.
    pub start: Option<DateTime<Utc>>,
    /// This activation.
    pub end: DateTime<Utc>,
}

/// A unit of scheduled work.
///
/// A run either completes or fails. Failures are retried by the owning
/// pipeline according to its [`RetryPolicy`].
#[async_trait::async_trait]
pub trait Task: Send + Sync + 'static {
    /// Task name used in logs.
    fn name(&self) -> &str;

    /// Perform one run.
    async fn run(&self, window: &TaskWindow) -> Result<(), TaskError>;
}

/// Records one latency sample per run.
pub struct RecordTask<I: ProbeInvoker = PingInvoker> {
    cycle: Arc<ProbeCycle<I>>,
}

impl<I: ProbeInvoker> RecordTask<I> {
    /// Wrap a probe cycle.
    pub fn new(cycle: Arc<ProbeCycle<I>>) -> Self {
        Self { cycle }
    }
}

#[async_trait::async_trait]
impl<I: ProbeInvoker> Task for RecordTask<I> {
    fn name(&self) -> &str {
        "ping_site"
    }

    async fn run(&self, window: &TaskWindow) -> Result<(), TaskError> {
        self.cycle.run(window.start, Some(window.end)).await?;
        Ok(())
    }
}

/// Renders the report charts per run.
pub struct ReportTask {
    generator: Arc<ReportGenerator>,
    clock: Clock,
}

impl ReportTask {
    /// Wrap a report generator. The heatmap window is anchored at local time.
    pub fn new(generator: Arc<ReportGenerator>) -> Self {
        Self {
            generator,
            clock: local_clock(),
        }
    }
}

#[async_trait::async_trait]
impl Task for ReportTask {
    fn name(&self) -> &str {
        "plot_ping_times"
    }

    async fn run(&self, _window: &TaskWindow) -> Result<(), TaskError> {
        let generator = Arc::clone(&self.generator);
        let now = (self.clock)();
        let outcome = tokio::task::spawn_blocking(move || generator.generate(now)).await??;
        tracing::debug!(artifacts = outcome.artifacts.len(), "Report written");
        Ok(())
    }
}

/// Ordered tasks run together on each activation of one job.
///
/// Tasks run in sequence, each under the retry policy; a task that still
/// fails after its retries ends the activation. Only one activation runs at a
/// time: a tick arriving while the previous one is active is skipped.
pub struct Pipeline {
    name: String,
    tasks: Vec<Arc<dyn Task>>,
    retry: RetryPolicy,
    last_tick: Mutex<Option<DateTime<Utc>>>,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(name: impl Into<String>, tasks: Vec<Arc<dyn Task>>, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            tasks,
            retry,
            last_tick: Mutex::new(None),
        }
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the tasks, in run order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name().to_string()).collect()
    }

    /// Handle one scheduler tick.
    ///
    /// Returns `None` if the tick was skipped because a previous activation
    /// is still running.
    pub async fn tick(&self) -> Option<Result<(), TaskError>> {
        let Ok(mut last_tick) = self.last_tick.try_lock() else {
            tracing::warn!(job = %self.name, "Previous activation still running, skipping tick");
            return None;
        };

        let window = TaskWindow {
            start: *last_tick,
            end: Utc::now(),
        };
        *last_tick = Some(window.end);

        Some(self.run(&window).await)
    }

    /// Run every task once for `window`.
    pub async fn run(&self, window: &TaskWindow) -> Result<(), TaskError> {
        tracing::info!(job = %self.name, start = ?window.start, end = %window.end, "Activation started");
        let started = std::time::Instant::now();

        for task in &self.tasks {
            run_with_retry(task.name(), &self.retry, || task.run(window)).await?;
        }

        tracing::info!(
            job = %self.name,
            duration_ms = started.elapsed().as_millis(),
            "Activation completed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("tasks", &self.task_names())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
