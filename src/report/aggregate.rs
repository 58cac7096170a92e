//! Pure aggregations over logged samples.
//!
//! These feed the chart renderers but carry no drawing logic, so they can be
//! checked without producing images.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::storage::LatencySample;

/// A latency column of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LatencySeries {
    /// Mean round trip.
    #[strum(serialize = "avg_ping")]
    Avg,
    /// Slowest round trip.
    #[strum(serialize = "max_ping")]
    Max,
    /// Fastest round trip.
    #[strum(serialize = "min_ping")]
    Min,
}

impl LatencySeries {
    /// Series plotted in the histogram, in count order.
    pub const HISTOGRAM: [LatencySeries; 3] = [Self::Avg, Self::Max, Self::Min];

    /// Value of this series in `sample`.
    pub fn value(self, sample: &LatencySample) -> f64 {
        match self {
            Self::Avg => sample.avg_ms,
            Self::Max => sample.max_ms,
            Self::Min => sample.min_ms,
        }
    }
}

/// Calendar grouping of a sample timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeBucket {
    /// Calendar year.
    pub year: i32,
    /// Day of year, starting at 1.
    pub day_of_year: u32,
    /// Hour of day, 0-23.
    pub hour: u32,
}

impl From<&NaiveDateTime> for TimeBucket {
    fn from(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            day_of_year: ts.ordinal(),
            hour: ts.hour(),
        }
    }
}

/// One histogram bin shared by all series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower edge (ms).
    pub lower: f64,
    /// Exclusive upper edge (ms); inclusive for the last bin.
    pub upper: f64,
    /// Counts per series, ordered as [`LatencySeries::HISTOGRAM`].
    pub counts: [usize; 3],
}

/// Bin avg/max/min latencies over one common range.
///
/// Returns an empty vector when there are no samples or `bins` is zero.
pub fn histogram(samples: &[LatencySample], bins: usize) -> Vec<HistogramBin> {
    if samples.is_empty() || bins == 0 {
        return Vec::new();
    }

    let values = || {
        samples.iter().flat_map(|s| {
            LatencySeries::HISTOGRAM
                .into_iter()
                .map(move |series| series.value(s))
        })
    };
    let lo = values().fold(f64::INFINITY, f64::min);
    let hi = values().fold(f64::NEG_INFINITY, f64::max);
    let width = if hi > lo {
        (hi - lo) / bins as f64
    } else {
        1.0 / bins as f64
    };

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: lo + width * i as f64,
            upper: lo + width * (i + 1) as f64,
            counts: [0; 3],
        })
        .collect();

    for sample in samples {
        for (slot, series) in LatencySeries::HISTOGRAM.into_iter().enumerate() {
            let offset = (series.value(sample) - lo) / width;
            let idx = (offset.floor().max(0.0) as usize).min(bins - 1);
            out[idx].counts[slot] += 1;
        }
    }

    out
}

/// Mean latency per day-of-year and hour.
#[derive(Debug, Clone, Default)]
pub struct Heatmap {
    /// Days of year present, ascending.
    pub days: Vec<u32>,
    /// Mean of the truncated average latency per (day_of_year, hour).
    pub cells: BTreeMap<(u32, u32), f64>,
}

impl Heatmap {
    /// Lowest and highest cell value, if any.
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut values = self.cells.values().copied();
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Whether no cell holds data.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build the hour-by-day heatmap from samples newer than `now - window`.
///
/// The window keeps a single year's day-of-year values from overlapping.
/// Average latencies are truncated to whole milliseconds before averaging.
pub fn heatmap(samples: &[LatencySample], now: NaiveDateTime, window: TimeDelta) -> Heatmap {
    let cutoff = now - window;
    let mut sums: BTreeMap<(u32, u32), (f64, usize)> = BTreeMap::new();
    let mut days = BTreeSet::new();

    for sample in samples.iter().filter(|s| s.timestamp > cutoff) {
        let bucket = TimeBucket::from(&sample.timestamp);
        let entry = sums
            .entry((bucket.day_of_year, bucket.hour))
            .or_insert((0.0, 0));
        entry.0 += sample.avg_ms.trunc();
        entry.1 += 1;
        days.insert(bucket.day_of_year);
    }

    Heatmap {
        days: days.into_iter().collect(),
        cells: sums
            .into_iter()
            .map(|(key, (sum, n))| (key, sum / n as f64))
            .collect(),
    }
}

/// Overview of the log contents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    /// Valid samples read.
    pub samples: usize,
    /// Lines that were not valid records.
    pub skipped: usize,
    /// Earliest sample time.
    pub first: Option<NaiveDateTime>,
    /// Latest sample time.
    pub last: Option<NaiveDateTime>,
    /// Mean of the average latencies (ms).
    pub mean_avg_ms: Option<f64>,
    /// Lowest minimum latency (ms).
    pub min_ms: Option<f64>,
    /// Highest maximum latency (ms).
    pub max_ms: Option<f64>,
}

impl ReportSummary {
    /// Summarize `samples`.
    pub fn from_samples(samples: &[LatencySample], skipped: usize) -> Self {
        if samples.is_empty() {
            return Self {
                skipped,
                ..Default::default()
            };
        }

        let total: f64 = samples.iter().map(|s| s.avg_ms).sum();
        Self {
            samples: samples.len(),
            skipped,
            first: samples.iter().map(|s| s.timestamp).min(),
            last: samples.iter().map(|s| s.timestamp).max(),
            mean_avg_ms: Some(total / samples.len() as f64),
            min_ms: samples.iter().map(|s| s.min_ms).reduce(f64::min),
            max_ms: samples.iter().map(|s| s.max_ms).reduce(f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::LatencyStats;
    use chrono::NaiveDate;

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, 14, 0)
            .unwrap()
    }

    fn sample(ts: NaiveDateTime, min: f64, avg: f64, max: f64) -> LatencySample {
        LatencySample::new(
            ts,
            LatencyStats {
                min_ms: min,
                avg_ms: avg,
                max_ms: max,
                mdev_ms: 0.1,
            },
        )
    }

    #[test]
    fn test_series_labels() {
        assert_eq!(LatencySeries::Avg.to_string(), "avg_ping");
        assert_eq!(LatencySeries::Max.as_ref(), "max_ping");
        assert_eq!(LatencySeries::Min.as_ref(), "min_ping");
    }

    #[test]
    fn test_time_bucket() {
        let bucket = TimeBucket::from(&at(2, 1, 7));
        assert_eq!(
            bucket,
            TimeBucket {
                year: 2024,
                day_of_year: 32,
                hour: 7,
            }
        );
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let samples = vec![
            sample(at(1, 1, 0), 10.0, 15.0, 20.0),
            sample(at(1, 1, 1), 11.0, 12.0, 30.0),
        ];
        let bins = histogram(&samples, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, 10.0);
        assert_eq!(bins[3].upper, 30.0);

        let totals: Vec<usize> = (0..3)
            .map(|slot| bins.iter().map(|b| b.counts[slot]).sum())
            .collect();
        assert_eq!(totals, vec![2, 2, 2]);
        // Highest value lands in the last bin.
        assert_eq!(bins[3].counts[1], 1);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let samples = vec![sample(at(1, 1, 0), 5.0, 5.0, 5.0)];
        let bins = histogram(&samples, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0].counts, [1, 1, 1]);
        assert!(histogram(&[], 10).is_empty());
        assert!(histogram(&samples, 0).is_empty());
    }

    #[test]
    fn test_heatmap_window_and_means() {
        let now = at(12, 31, 12);
        let samples = vec![
            // Outside a 350 day window.
            sample(at(1, 2, 3), 1.0, 99.9, 100.0),
            sample(at(12, 30, 5), 1.0, 10.9, 12.0),
            sample(at(12, 30, 5), 1.0, 13.2, 14.0),
            sample(at(12, 31, 6), 1.0, 20.0, 21.0),
        ];

        let map = heatmap(&samples, now, TimeDelta::days(350));
        assert_eq!(map.days, vec![365, 366]);
        assert_eq!(map.cells.len(), 2);
        // trunc(10.9) = 10, trunc(13.2) = 13 -> mean 11.5
        assert_eq!(map.cells[&(365, 5)], 11.5);
        assert_eq!(map.cells[&(366, 6)], 20.0);
        assert_eq!(map.range(), Some((11.5, 20.0)));
    }

    #[test]
    fn test_heatmap_empty_window() {
        let samples = vec![sample(at(1, 1, 0), 1.0, 2.0, 3.0)];
        let map = heatmap(&samples, at(12, 31, 0), TimeDelta::days(30));
        assert!(map.is_empty());
        assert_eq!(map.range(), None);
    }

    #[test]
    fn test_summary() {
        let samples = vec![
            sample(at(1, 1, 0), 10.0, 15.0, 20.0),
            sample(at(1, 1, 1), 8.0, 13.0, 30.0),
        ];
        let summary = ReportSummary::from_samples(&samples, 3);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.first, Some(at(1, 1, 0)));
        assert_eq!(summary.last, Some(at(1, 1, 1)));
        assert_eq!(summary.mean_avg_ms, Some(14.0));
        assert_eq!(summary.min_ms, Some(8.0));
        assert_eq!(summary.max_ms, Some(30.0));
    }
}
