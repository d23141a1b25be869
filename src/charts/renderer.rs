//! Static Chart Renderer
//! Writes the multi-region trend chart to a PNG file with plotters.
//!
//! Layout mirrors the interactive window: title `<metric> (<unit>)`, one
//! line per region labeled with its latest value, dates on X and either a
//! linear or a floored log scale on Y.

use crate::charts::plotter::{ChartData, ChartPlotter};
use crate::config::Metric;
use crate::data::{date_to_days, days_to_date};
use crate::report::TextReport;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SIZE: (u32, u32) = (1200, 750);

const X_LABELS: usize = 10;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to draw: no selected region has values for {0}")]
    Empty(&'static str),
    #[error("Failed to draw chart: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the chart for `metric` into a PNG at `path`.
    pub fn save_png(
        chart_data: &ChartData,
        metric: Metric,
        log_y: bool,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), RenderError> {
        let (x_min, x_max) = Self::x_range(chart_data).ok_or(RenderError::Empty(metric.column()))?;
        let (y_min, y_max) =
            Self::y_range(chart_data, metric, log_y).ok_or(RenderError::Empty(metric.column()))?;

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let title = chart_data.title(metric);
        let mut builder = ChartBuilder::on(&root);
        builder
            .caption(&title, ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(90);

        if log_y {
            let mut chart = builder
                .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())
                .map_err(draw_err)?;
            Self::draw_lines(&mut chart, chart_data, metric, Some(y_min))?;
        } else {
            let mut chart = builder
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(draw_err)?;
            Self::draw_lines(&mut chart, chart_data, metric, None)?;
        }

        root.present().map_err(draw_err)?;
        log::info!("Saved chart to {}", path.display());
        Ok(())
    }

    fn draw_lines<'a, DB, Y>(
        chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
        chart_data: &ChartData,
        metric: Metric,
        floor: Option<f64>,
    ) -> Result<(), RenderError>
    where
        DB: DrawingBackend + 'a,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let normalized = chart_data.normalized;
        let x_fmt = |x: &f64| Self::format_date_label(*x);
        let y_fmt = move |y: &f64| {
            if normalized {
                format!("{y:.3}")
            } else {
                TextReport::group_thousands(*y)
            }
        };

        chart
            .configure_mesh()
            .x_labels(X_LABELS)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .y_desc(chart_data.title(metric))
            .draw()
            .map_err(draw_err)?;

        for (i, series) in chart_data.series.iter().enumerate() {
            let points: Vec<(f64, f64)> = ChartPlotter::series_points(series, metric, None)
                .into_iter()
                .filter(|[_, y]| floor.map_or(true, |f| *y >= f))
                .map(|[x, y]| (x, y))
                .collect();
            if points.is_empty() {
                continue;
            }

            let c = ChartPlotter::get_region_color(i);
            let color = RGBColor(c.r(), c.g(), c.b());
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(3)))
                .map_err(draw_err)?
                .label(series.label(metric, normalized))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;

        Ok(())
    }

    /// X bounds in days since the epoch.
    pub fn x_range(chart_data: &ChartData) -> Option<(f64, f64)> {
        let (first, last) = chart_data.date_range()?;
        let x_min = f64::from(date_to_days(first));
        let x_max = f64::from(date_to_days(last));
        // A single day still needs a non-empty axis
        Some((x_min, x_max.max(x_min + 1.0)))
    }

    /// Y bounds: linear starts at zero (or the minimum if negative); log starts
    /// at the floor. The top gets 5% headroom.
    pub fn y_range(chart_data: &ChartData, metric: Metric, log_y: bool) -> Option<(f64, f64)> {
        let values: Vec<f64> = chart_data
            .series
            .iter()
            .flat_map(|s| s.values(metric).iter().flatten().copied())
            .filter(|v| v.is_finite())
            .collect();

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);

        if log_y {
            let floor = chart_data.log_floor();
            if !(max >= floor) {
                return None;
            }
            Some((floor, (max * 1.05).max(floor * 10.0)))
        } else {
            if values.is_empty() {
                return None;
            }
            let low = min.min(0.0);
            let high = if max > low { max * 1.05 } else { low + 1.0 };
            Some((low, high))
        }
    }

    /// Tick label for a day offset, e.g. `Apr 13`.
    pub fn format_date_label(x: f64) -> String {
        days_to_date(x.round() as i32)
            .map(|d| d.format("%b %-d").to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::plotter::RegionSeries;
    use chrono::NaiveDate;

    fn data(values: Vec<Option<f64>>, normalized: bool) -> ChartData {
        let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let dates = start.iter_days().take(values.len()).collect();
        ChartData {
            series: vec![RegionSeries {
                region: "Idaho".to_string(),
                dates,
                daily_cases: values.clone(),
                daily_deaths: vec![None; values.len()],
                total_cases: values.clone(),
                total_deaths: values,
            }],
            normalized,
        }
    }

    #[test]
    fn linear_range_starts_at_zero() {
        let chart = data(vec![None, Some(10.0), Some(200.0)], false);
        assert_eq!(
            StaticChartRenderer::y_range(&chart, Metric::TotalCases, false),
            Some((0.0, 210.0))
        );
    }

    #[test]
    fn log_range_starts_at_floor() {
        let chart = data(vec![Some(1.0), Some(1000.0)], false);
        assert_eq!(
            StaticChartRenderer::y_range(&chart, Metric::TotalCases, true),
            Some((5.0, 1050.0))
        );
    }

    #[test]
    fn log_range_needs_values_above_floor() {
        let chart = data(vec![Some(1.0), Some(2.0)], false);
        assert_eq!(StaticChartRenderer::y_range(&chart, Metric::TotalCases, true), None);
    }

    #[test]
    fn empty_metric_has_no_range() {
        let chart = data(vec![Some(1.0)], false);
        assert_eq!(StaticChartRenderer::y_range(&chart, Metric::DailyDeaths, false), None);
    }

    #[test]
    fn single_day_x_range_is_widened() {
        let chart = data(vec![Some(1.0)], false);
        let day = f64::from(date_to_days(NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()));
        assert_eq!(StaticChartRenderer::x_range(&chart), Some((day, day + 1.0)));
        assert_eq!(StaticChartRenderer::format_date_label(day), "Apr 1");
    }
}
