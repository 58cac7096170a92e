//! Probe cycle orchestration.
//!
//! One cycle runs the probe, parses its summary, stamps the result with the
//! local wall-clock time and appends it to the time-series log. Stages run in
//! strict order and the first failure ends the cycle; nothing is appended for
//! a failed cycle, so the log shows a gap rather than a bad record.
//!
//! Retries are not attempted here. The scheduler decides whether and when to
//! run the cycle again.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, Utc};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::probe::{
    ParseError, PingInvoker, ProbeError, ProbeInvoker, ProbeTarget, parse_summary,
};
use crate::storage::{LatencySample, StorageError, TimeSeriesStore};

/// Source of sample timestamps.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Local wall-clock time, truncated to microseconds.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local().trunc_subsecs(6))
}

/// Stage of a cycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CycleStage {
    /// Running the probe process.
    Probe,
    /// Parsing the probe's summary line.
    Parse,
    /// Appending the sample to the log.
    Persist,
}

/// Errors that end a probe cycle, tagged by stage.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Probe could not run or reported failure.
    #[error("probe stage failed: {0}")]
    Probe(#[from] ProbeError),

    /// Probe output did not have the expected summary shape.
    #[error("parse stage failed: {0}")]
    Parse(#[from] ParseError),

    /// Sample could not be written to the log.
    #[error("persist stage failed: {0}")]
    Persist(#[from] StorageError),
}

impl CycleError {
    /// Stage at which the cycle stopped.
    pub fn stage(&self) -> CycleStage {
        match self {
            Self::Probe(_) => CycleStage::Probe,
            Self::Parse(_) => CycleStage::Parse,
            Self::Persist(_) => CycleStage::Persist,
        }
    }
}

/// Probe → parse → persist pipeline for one fixed target.
pub struct ProbeCycle<I: ProbeInvoker = PingInvoker> {
    target: ProbeTarget,
    invoker: I,
    store: Arc<TimeSeriesStore>,
    clock: Clock,
}

impl<I: ProbeInvoker> ProbeCycle<I> {
    /// Create a cycle using the local clock.
    pub fn new(target: ProbeTarget, invoker: I, store: Arc<TimeSeriesStore>) -> Self {
        Self {
            target,
            invoker,
            store,
            clock: local_clock(),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The probe target.
    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    /// The store samples are appended to.
    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    /// Run one cycle.
    ///
    /// The scheduled window is informational and only logged.
    ///
    /// # Returns
    ///
    /// - `Ok(sample)`: the sample that was appended
    /// - `Err(CycleError)`: the first failing stage; nothing was appended
    pub async fn run(
        &self,
        scheduled_start: Option<DateTime<Utc>>,
        scheduled_end: Option<DateTime<Utc>>,
    ) -> Result<LatencySample, CycleError> {
        tracing::info!(
            host = %self.target.host,
            start = ?scheduled_start,
            end = ?scheduled_end,
            "Starting probe cycle"
        );

        self.execute().await.inspect_err(|e| {
            tracing::error!(
                host = %self.target.host,
                stage = %e.stage(),
                error = %e,
                "Probe cycle failed"
            );
        })
    }

    async fn execute(&self) -> Result<LatencySample, CycleError> {
        let output = self.invoker.invoke(&self.target).await?;

        let stats = parse_summary(&output)?;

        let sample = LatencySample::new((self.clock)(), stats);
        self.persist(sample).await?;

        tracing::info!(
            host = %self.target.host,
            timestamp = %sample.timestamp_string(),
            avg_ms = sample.avg_ms,
            min_ms = sample.min_ms,
            max_ms = sample.max_ms,
            mdev_ms = sample.mdev_ms,
            "Probe cycle recorded sample"
        );
        Ok(sample)
    }
}

impl<I: ProbeInvoker> ProbeCycle<I> {
    /// Append on the blocking pool; the store does synchronous file I/O.
    async fn persist(&self, sample: LatencySample) -> Result<(), StorageError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.append(&sample))
            .await
            .map_err(|e| StorageError::Write {
                path: self.store.path().to_path_buf(),
                source: std::io::Error::other(e),
            })?
    }
}

impl<I: ProbeInvoker> std::fmt::Debug for ProbeCycle<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeCycle")
            .field("target", &self.target)
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const SUMMARY: &str = "--- 8.8.8.8 ping statistics ---\n\
        8 packets transmitted, 8 received, 0% packet loss, time 7010ms\n\
        rtt min/avg/max/mdev = 12.345/15.678/20.901/2.345 ms\n";

    /// Fake probe returning canned output and counting calls.
    struct FakeInvoker {
        response: Result<String, fn() -> ProbeError>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeInvoker {
        fn ok(output: &str) -> Self {
            Self {
                response: Ok(output.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(|| ProbeError::ExitStatus {
                    code: Some(1),
                    stderr: "Destination Host Unreachable".to_string(),
                }),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl ProbeInvoker for FakeInvoker {
        async fn invoke(&self, _target: &ProbeTarget) -> Result<String, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(output) => Ok(output.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn fixed_clock() -> Clock {
        Arc::new(|| {
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 14, 0)
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_cycle_records_sample() {
        let dir = tempdir().unwrap();
        let store = Arc::new(TimeSeriesStore::new(dir.path().join("ping.csv")));
        let cycle = ProbeCycle::new(ProbeTarget::new("8.8.8.8"), FakeInvoker::ok(SUMMARY), store)
            .with_clock(fixed_clock());

        let sample = cycle.run(None, None).await.unwrap();
        assert_eq!(sample.avg_ms, 15.678);

        let content = std::fs::read_to_string(dir.path().join("ping.csv")).unwrap();
        assert_eq!(content, "\n2024-01-01T00:14:00,15.678,12.345,20.901,2.345");
    }

    #[tokio::test]
    async fn test_probe_failure_short_circuits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ping.csv");
        let store = Arc::new(TimeSeriesStore::new(&path));
        let invoker = FakeInvoker::failing();
        let calls = Arc::clone(&invoker.calls);
        let cycle = ProbeCycle::new(ProbeTarget::new("8.8.8.8"), invoker, store);

        let err = cycle.run(Some(Utc::now()), Some(Utc::now())).await.unwrap_err();
        assert_eq!(err.stage(), CycleStage::Probe);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!path.exists(), "nothing should be appended");
    }

    #[tokio::test]
    async fn test_parse_failure_appends_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ping.csv");
        let store = Arc::new(TimeSeriesStore::new(&path));
        let cycle = ProbeCycle::new(
            ProbeTarget::new("8.8.8.8"),
            FakeInvoker::ok("round-trip min/avg/max = 10/20/30 ms"),
            store,
        );

        let err = cycle.run(None, None).await.unwrap_err();
        assert_eq!(err.stage(), CycleStage::Parse);
        assert!(matches!(err, CycleError::Parse(ParseError::ValueCount { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_persist_failure_reports_stage() {
        let dir = tempdir().unwrap();
        // Appending to a directory fails at open.
        let store = Arc::new(TimeSeriesStore::new(dir.path()));
        let cycle = ProbeCycle::new(ProbeTarget::new("8.8.8.8"), FakeInvoker::ok(SUMMARY), store);

        let err = cycle.run(None, None).await.unwrap_err();
        assert_eq!(err.stage(), CycleStage::Persist);
        assert!(err.to_string().starts_with("persist stage failed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_cycles_append_every_sample() {
        let dir = tempdir().unwrap();
        let store = Arc::new(TimeSeriesStore::new(dir.path().join("ping.csv")));
        let cycle = Arc::new(
            ProbeCycle::new(
                ProbeTarget::new("8.8.8.8"),
                FakeInvoker::ok(SUMMARY),
                Arc::clone(&store),
            )
            .with_clock(fixed_clock()),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cycle = Arc::clone(&cycle);
                tokio::spawn(async move { cycle.run(None, None).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let log = store.read_log().unwrap();
        assert_eq!(log.len(), 8);
        assert_eq!(log.skipped, 0);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(CycleStage::Probe.to_string(), "probe");
        assert_eq!(CycleStage::Parse.as_ref(), "parse");
        assert_eq!(CycleStage::Persist.as_ref(), "persist");
        assert_eq!("parse".parse::<CycleStage>().unwrap(), CycleStage::Parse);
        assert!("render".parse::<CycleStage>().is_err());
    }
}
