//! SVG chart rendering.

use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use plotters::prelude::*;

use crate::report::aggregate::{Heatmap, HistogramBin, LatencySeries};
use crate::storage::LatencySample;

type RenderResult = Result<(), Box<dyn std::error::Error>>;

const CHART_SIZE: (u32, u32) = (1200, 720);
const HEATMAP_SIZE: (u32, u32) = (720, 1200);
const FONT: &str = "sans-serif";

const LINE_SERIES: [(LatencySeries, RGBColor); 3] = [
    (LatencySeries::Avg, BLUE),
    (LatencySeries::Min, GREEN),
    (LatencySeries::Max, RED),
];

const HISTOGRAM_COLORS: [RGBColor; 3] = [BLUE, RED, GREEN];

/// Line chart of avg/min/max latency over time. `samples` must be sorted by
/// timestamp and non-empty.
pub(crate) fn timeseries(path: &Path, samples: &[LatencySample]) -> RenderResult {
    let Some(origin) = samples.first().map(|s| s.timestamp) else {
        return Ok(());
    };
    let hours = |ts: NaiveDateTime| (ts - origin).num_seconds() as f64 / 3600.0;

    let x_max = samples
        .iter()
        .map(|s| hours(s.timestamp))
        .fold(0.0, f64::max)
        .max(1.0);
    let y_max = samples.iter().map(|s| s.max_ms).fold(0.0, f64::max) * 1.1 + 1.0;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Ping time", (FONT, 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("datetime")
        .y_desc("ms")
        .x_labels(8)
        .x_label_formatter(&|x| {
            let offset = TimeDelta::milliseconds((x * 3_600_000.0) as i64);
            (origin + offset).format("%Y-%m-%d %H:%M").to_string()
        })
        .draw()?;

    for (series, color) in LINE_SERIES {
        chart
            .draw_series(LineSeries::new(
                samples.iter().map(|s| (hours(s.timestamp), series.value(s))),
                &color,
            ))?
            .label(series.to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Overlaid histogram of avg/max/min latency.
pub(crate) fn histogram(path: &Path, bins: &[HistogramBin]) -> RenderResult {
    let x_min = bins.first().map_or(0.0, |b| b.lower);
    let x_max = bins.last().map_or(1.0, |b| b.upper);
    let peak = bins.iter().flat_map(|b| b.counts).max().unwrap_or(0);
    let y_max = peak as f64 * 1.1 + 1.0;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Ping time Histogram", (FONT, 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("ms")
        .y_desc("Count")
        .draw()?;

    for (slot, (series, color)) in LatencySeries::HISTOGRAM
        .into_iter()
        .zip(HISTOGRAM_COLORS)
        .enumerate()
    {
        chart
            .draw_series(bins.iter().map(|b| {
                Rectangle::new(
                    [(b.lower, 0.0), (b.upper, b.counts[slot] as f64)],
                    color.mix(0.4).filled(),
                )
            }))?
            .label(series.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.4).filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Hour-by-day grid of mean latency, one row per day of year.
pub(crate) fn heatmap(path: &Path, map: &Heatmap) -> RenderResult {
    let rows = map.days.len().max(1);
    let (lo, hi) = map.range().unwrap_or((0.0, 0.0));
    let caption = if map.is_empty() {
        "Average Ping Time (no data)".to_string()
    } else {
        format!("Average Ping Time ({lo:.0}-{hi:.0} ms)")
    };

    let root = SVGBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..24f64, 0f64..rows as f64)?;

    let days = &map.days;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("hour")
        .y_desc("doy")
        .x_labels(12)
        .y_labels(rows.min(30))
        .x_label_formatter(&|x| format!("{}", *x as u32))
        .y_label_formatter(&|y| {
            days.get(*y as usize)
                .map(|d| d.to_string())
                .unwrap_or_default()
        })
        .draw()?;

    let span = if hi > lo { hi - lo } else { 1.0 };
    chart.draw_series(days.iter().enumerate().flat_map(|(row, day)| {
        (0..24u32).filter_map(move |hour| {
            let value = map.cells.get(&(*day, hour))?;
            let t = (value - lo) / span;
            Some(Rectangle::new(
                [
                    (f64::from(hour), row as f64),
                    (f64::from(hour) + 1.0, row as f64 + 1.0),
                ],
                coolwarm(t).filled(),
            ))
        })
    }))?;

    root.present()?;
    Ok(())
}

/// Diverging blue-white-red colour scale for `t` in `[0, 1]`.
fn coolwarm(t: f64) -> RGBColor {
    const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = t.clamp(0.0, 1.0);
    let (from, to, f) = if t < 0.5 {
        (COOL, MID, t * 2.0)
    } else {
        (MID, WARM, (t - 0.5) * 2.0)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coolwarm_endpoints() {
        assert_eq!(coolwarm(0.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.5), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
        assert_eq!(coolwarm(-3.0), coolwarm(0.0));
        assert_eq!(coolwarm(7.0), coolwarm(1.0));
    }
}
