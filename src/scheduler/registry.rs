//! Job registry driving task pipelines on their schedules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::scheduler::{Pipeline, RetryPolicy, Schedule, SchedulerError, Task};

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Job name.
    pub name: String,
    /// Schedule description.
    pub schedule: String,
    /// Task names, in run order.
    pub tasks: Vec<String>,
}

/// Registry of scheduled pipelines.
///
/// Uses `tokio-cron-scheduler`; cron expressions are evaluated in UTC.
pub struct Scheduler {
    scheduler: JobScheduler,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, JobInfo>>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub async fn new() -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Register a job running `tasks` in order on `schedule`.
    pub async fn add_job(
        &self,
        name: &str,
        schedule: &Schedule,
        tasks: Vec<Arc<dyn Task>>,
        retry: RetryPolicy,
    ) -> Result<uuid::Uuid, SchedulerError> {
        if tasks.is_empty() {
            return Err(SchedulerError::Config(format!("job '{name}' has no tasks")));
        }

        let pipeline = Arc::new(Pipeline::new(name, tasks, retry));
        let task_names = pipeline.task_names();
        let job = create_job(Arc::clone(&pipeline), schedule)?;

        let job_id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))
            .inspect_err(|e| tracing::error!(job = %name, error = %e, "Job registration failed"))?;

        self.jobs.write().await.insert(
            job_id,
            JobInfo {
                id: job_id,
                name: name.to_string(),
                schedule: schedule.to_string(),
                tasks: task_names,
            },
        );

        tracing::info!(job = %name, job_id = %job_id, schedule = %schedule, "Job registered");
        Ok(job_id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;
        tracing::info!(jobs = self.job_count().await, "Scheduler started");
        Ok(())
    }

    /// List all registered jobs.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Remove a job by ID.
    pub async fn remove(&self, job_id: &uuid::Uuid) -> Result<(), SchedulerError> {
        self.scheduler
            .remove(job_id)
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        let removed = self.jobs.write().await.remove(job_id);
        tracing::info!(
            job_id = %job_id,
            job = ?removed.map(|j| j.name),
            "Job removed"
        );
        Ok(())
    }

    /// Gracefully shutdown the scheduler with default timeout.
    pub async fn shutdown(self) -> Result<(), SchedulerError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown with custom timeout.
    ///
    /// A timeout is logged, not treated as an error.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), SchedulerError> {
        let job_count = self.jobs.read().await.len();
        let result = tokio::time::timeout(timeout, self.scheduler.shutdown()).await;

        match result {
            Ok(Ok(())) => {
                tracing::info!(jobs = job_count, "Scheduler shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(jobs = job_count, error = %e, "Scheduler shutdown failed");
                Err(SchedulerError::Scheduler(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(jobs = job_count, "Scheduler shutdown timed out");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field(
                "job_count",
                &self.jobs.try_read().map(|j| j.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

fn create_job(pipeline: Arc<Pipeline>, schedule: &Schedule) -> Result<Job, SchedulerError> {
    let callback = move |_: uuid::Uuid, _: JobScheduler| {
        let pipeline = Arc::clone(&pipeline);
        Box::pin(async move {
            // Failures are logged by the pipeline; the job keeps its schedule.
            let _ = pipeline.tick().await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    };

    match schedule {
        Schedule::Interval(d) => Job::new_repeated_async(*d, callback),
        Schedule::Cron(expr) => Job::new_cron_job_async(expr.as_str(), callback),
    }
    .map_err(|e| SchedulerError::Scheduler(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{TaskError, TaskWindow};

    struct NoopTask;

    #[async_trait::async_trait]
    impl Task for NoopTask {
        fn name(&self) -> &str {
            "noop"
        }

        async fn run(&self, _window: &TaskWindow) -> Result<(), TaskError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scheduler_new() {
        let scheduler = Scheduler::new().await.unwrap();
        assert_eq!(scheduler.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_and_remove_job() {
        let scheduler = Scheduler::new().await.unwrap();
        let schedule = Schedule::cron("0 14 * * * *").unwrap();

        let id = scheduler
            .add_job("hourly", &schedule, vec![Arc::new(NoopTask)], RetryPolicy::none())
            .await
            .unwrap();

        let jobs = scheduler.list_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, id);
        assert_eq!(jobs[0].name, "hourly");
        assert_eq!(jobs[0].schedule, "cron: 0 14 * * * *");
        assert_eq!(jobs[0].tasks, vec!["noop".to_string()]);

        scheduler.remove(&id).await.unwrap();
        assert_eq!(scheduler.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_job_without_tasks() {
        let scheduler = Scheduler::new().await.unwrap();
        let err = scheduler
            .add_job("empty", &Schedule::default(), vec![], RetryPolicy::none())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let scheduler = Scheduler::new().await.unwrap();
        scheduler
            .add_job(
                "interval",
                &Schedule::interval(Duration::from_secs(3600)),
                vec![Arc::new(NoopTask)],
                RetryPolicy::none(),
            )
            .await
            .unwrap();
        scheduler.start().await.unwrap();
        scheduler
            .shutdown_with_timeout(Duration::from_secs(2))
            .await
            .unwrap();
    }
}
