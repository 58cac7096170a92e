//! Report Layer
//!
//! Reads the time-series log and renders three SVG charts:
//!
//! - `avg_ping_plot.svg`: avg/min/max latency over time
//! - `ping_histogram.svg`: latency distribution, 50 shared bins
//! - `ping_heatmap.svg`: mean latency by hour and day of year over the trailing window
//!
//! The stage depends only on the log's file format, never on in-memory state
//! of the probe cycle.

mod aggregate;
mod generator;
mod render;

pub use aggregate::{
    Heatmap, HistogramBin, LatencySeries, ReportSummary, TimeBucket, heatmap, histogram,
};
pub use generator::{
    DEFAULT_HEATMAP_DAYS, DEFAULT_HISTOGRAM_BINS, ReportArtifact, ReportError, ReportGenerator,
    ReportOutcome,
};
