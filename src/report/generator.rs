//! Report generation from the time-series log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::report::aggregate::{self, ReportSummary};
use crate::report::render;
use crate::storage::{StorageError, TimeSeriesStore};

/// Default trailing window for the heatmap (days).
pub const DEFAULT_HEATMAP_DAYS: u32 = 350;

/// Default number of histogram bins.
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Chart produced by the report stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ReportArtifact {
    /// Avg/min/max latency over time.
    TimeSeries,
    /// Latency distribution.
    Histogram,
    /// Hour-by-day-of-year mean latency.
    Heatmap,
}

impl ReportArtifact {
    /// All artifacts, in generation order.
    pub const ALL: [ReportArtifact; 3] = [Self::TimeSeries, Self::Histogram, Self::Heatmap];

    /// Output file name.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::TimeSeries => "avg_ping_plot.svg",
            Self::Histogram => "ping_histogram.svg",
            Self::Heatmap => "ping_heatmap.svg",
        }
    }
}

/// Errors that can occur while generating reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The log could not be read.
    #[error("failed to load log: {0}")]
    Storage(#[from] StorageError),

    /// The log holds no valid samples.
    #[error("log file '{}' holds no samples", path.display())]
    NoData { path: PathBuf },

    /// The output directory could not be created.
    #[error("failed to create report directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chart could not be drawn or written.
    #[error("failed to render {artifact}: {message}")]
    Render {
        artifact: ReportArtifact,
        message: String,
    },
}

/// Result of one report run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    /// Overview of the log contents.
    pub summary: ReportSummary,
    /// Files written, in generation order.
    pub artifacts: Vec<PathBuf>,
}

/// Reads the time-series log and writes the chart artifacts.
///
/// The log is only ever opened for reading.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    store: Arc<TimeSeriesStore>,
    output_dir: PathBuf,
    heatmap_days: u32,
    histogram_bins: usize,
}

impl ReportGenerator {
    /// Create a generator writing into `output_dir`.
    pub fn new(store: Arc<TimeSeriesStore>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            store,
            output_dir: output_dir.as_ref().to_path_buf(),
            heatmap_days: DEFAULT_HEATMAP_DAYS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }

    /// Set the heatmap window in days.
    pub fn with_heatmap_days(mut self, days: u32) -> Self {
        self.heatmap_days = days;
        self
    }

    /// Set the number of histogram bins.
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    /// Directory artifacts are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of an artifact.
    pub fn artifact_path(&self, artifact: ReportArtifact) -> PathBuf {
        self.output_dir.join(artifact.file_name())
    }

    /// Generate all artifacts. `now` anchors the heatmap window.
    ///
    /// # Errors
    /// Returns `ReportError` if the log is missing, unreadable or empty, or
    /// if any chart cannot be written.
    pub fn generate(&self, now: NaiveDateTime) -> Result<ReportOutcome, ReportError> {
        tracing::info!(path = %self.store.path().display(), "Loading ping log");
        let log = self.store.read_log()?;
        if log.is_empty() {
            return Err(ReportError::NoData {
                path: self.store.path().to_path_buf(),
            });
        }

        let mut samples = log.samples;
        samples.sort_by_key(|s| s.timestamp);
        let summary = ReportSummary::from_samples(&samples, log.skipped);

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut artifacts = Vec::with_capacity(ReportArtifact::ALL.len());
        for artifact in ReportArtifact::ALL {
            let path = self.artifact_path(artifact);
            tracing::info!(artifact = %artifact, path = %path.display(), "Producing chart");

            let result = match artifact {
                ReportArtifact::TimeSeries => render::timeseries(&path, &samples),
                ReportArtifact::Histogram => {
                    let bins = aggregate::histogram(&samples, self.histogram_bins);
                    render::histogram(&path, &bins)
                }
                ReportArtifact::Heatmap => {
                    let window = TimeDelta::days(i64::from(self.heatmap_days));
                    let map = aggregate::heatmap(&samples, now, window);
                    render::heatmap(&path, &map)
                }
            };
            result.map_err(|e| ReportError::Render {
                artifact,
                message: e.to_string(),
            })?;
            artifacts.push(path);
        }

        tracing::info!(
            samples = summary.samples,
            skipped = summary.skipped,
            "Ping time plots complete"
        );
        Ok(ReportOutcome { summary, artifacts })
    }
}
