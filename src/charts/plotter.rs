//! Chart Plotter Module
//! Builds per-region series and draws them as an interactive time-series chart
//! with egui_plot.

use crate::config::{log_floor, Metric};
use crate::data::columns::{DAILY_CASES, DAILY_DEATHS, DATE, TOTAL_CASES, TOTAL_DEATHS};
use crate::data::{
    date_to_days, date_values, days_to_date, f64_values, DataProcessor, ProcessorError,
};
use crate::report::TextReport;
use chrono::{Datelike, NaiveDate, Weekday};
use egui::Color32;
use egui_plot::{GridInput, GridMark, Legend, Line, Plot, PlotPoints};
use polars::prelude::*;

/// Line colors, cycled by region order.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

const LINE_WIDTH: f32 = 3.0;

/// Grid step sizes; egui_plot fades lines with smaller steps.
const WEEK_STEP: f64 = 7.0;
const MONTH_STEP: f64 = 30.0;
/// Beyond this span (in days) the date grid is left to egui_plot's defaults.
const MAX_GRID_SPAN: f64 = 20_000.0;

/// One region's date-ordered values for every metric.
#[derive(Debug, Clone)]
pub struct RegionSeries {
    pub region: String,
    pub dates: Vec<NaiveDate>,
    pub daily_cases: Vec<Option<f64>>,
    pub daily_deaths: Vec<Option<f64>>,
    pub total_cases: Vec<Option<f64>>,
    pub total_deaths: Vec<Option<f64>>,
}

impl RegionSeries {
    pub fn values(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::DailyCases => &self.daily_cases,
            Metric::DailyDeaths => &self.daily_deaths,
            Metric::TotalCases => &self.total_cases,
            Metric::TotalDeaths => &self.total_deaths,
        }
    }

    /// Value of the most recent row.
    pub fn latest(&self, metric: Metric) -> Option<f64> {
        self.values(metric).last().copied().flatten()
    }

    /// Legend text: latest value followed by the region name.
    pub fn label(&self, metric: Metric, normalized: bool) -> String {
        format!(
            "{} {}",
            TextReport::format_latest(self.latest(metric), normalized),
            self.region
        )
    }
}

/// Everything the chart window and the PNG export need.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub series: Vec<RegionSeries>,
    pub normalized: bool,
}

impl ChartData {
    /// Collect the selected regions' rows; regions are ordered by name.
    pub fn from_frame(
        df: &DataFrame,
        regions: &[String],
        normalized: bool,
    ) -> Result<Self, ProcessorError> {
        let mut names: Vec<&String> = regions.iter().collect();
        names.sort();
        names.dedup();

        let mut series = Vec::with_capacity(names.len());
        for region in names {
            let region_df = DataProcessor::region_frame(df, region)?;
            if region_df.height() == 0 {
                log::debug!("No rows to chart for {region}");
                continue;
            }

            let dates: Vec<NaiveDate> = date_values(&region_df, DATE)?
                .into_iter()
                .flatten()
                .collect();
            series.push(RegionSeries {
                region: region.clone(),
                dates,
                daily_cases: f64_values(&region_df, DAILY_CASES)?,
                daily_deaths: f64_values(&region_df, DAILY_DEATHS)?,
                total_cases: f64_values(&region_df, TOTAL_CASES)?,
                total_deaths: f64_values(&region_df, TOTAL_DEATHS)?,
            });
        }

        Ok(Self { series, normalized })
    }

    /// `<metric> (% of pop)` or `<metric> (count)`.
    pub fn title(&self, metric: Metric) -> String {
        let suffix = if self.normalized { " (% of pop)" } else { " (count)" };
        format!("{}{}", metric.column(), suffix)
    }

    pub fn log_floor(&self) -> f64 {
        log_floor(self.normalized)
    }

    /// First and last date across all series.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.series.iter().filter_map(|s| s.dates.first()).min()?;
        let last = self.series.iter().filter_map(|s| s.dates.last()).max()?;
        Some((*first, *last))
    }
}

/// Draws the multi-region chart.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn get_region_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Plot coordinates for one series: x in days since the epoch, y as-is or
    /// log10 when `log_floor` is given. Missing values and values under the
    /// floor are left out.
    pub fn series_points(
        series: &RegionSeries,
        metric: Metric,
        log_floor: Option<f64>,
    ) -> Vec<[f64; 2]> {
        series
            .dates
            .iter()
            .zip(series.values(metric))
            .filter_map(|(date, value)| {
                let value = (*value)?;
                let x = f64::from(date_to_days(*date));
                match log_floor {
                    Some(floor) if value < floor => None,
                    Some(_) => Some([x, value.log10()]),
                    None => Some([x, value]),
                }
            })
            .collect()
    }

    /// Month starts as major marks and Mondays as minor marks within `bounds`.
    pub fn date_grid_marks(bounds: (f64, f64)) -> Vec<GridMark> {
        if !(bounds.1 - bounds.0).is_finite() || bounds.1 - bounds.0 > MAX_GRID_SPAN {
            return Vec::new();
        }
        let (Some(start), Some(end)) = (
            days_to_date(bounds.0.floor() as i32),
            days_to_date(bounds.1.ceil() as i32),
        ) else {
            return Vec::new();
        };

        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter_map(|day| {
                let value = f64::from(date_to_days(day));
                if day.day() == 1 {
                    Some(GridMark {
                        value,
                        step_size: MONTH_STEP,
                    })
                } else if day.weekday() == Weekday::Mon {
                    Some(GridMark {
                        value,
                        step_size: WEEK_STEP,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// X labels only on month starts, as `Mar 1`.
    pub fn format_date_mark(value: f64) -> String {
        let days = value.round();
        if (value - days).abs() > f64::EPSILON {
            return String::new();
        }
        match days_to_date(days as i32) {
            Some(date) if date.day() == 1 => date.format("%b 1").to_string(),
            _ => String::new(),
        }
    }

    /// Y label for a log10-scaled axis value.
    pub fn format_log_mark(value: f64) -> String {
        let actual = 10f64.powf(value);
        if actual >= 1.0 {
            TextReport::group_thousands(actual)
        } else {
            format!("{actual:.3}")
        }
    }

    /// One decade per mark for a log10-scaled axis.
    fn log_grid_marks(input: GridInput) -> Vec<GridMark> {
        let (low, high) = input.bounds;
        if !(high - low).is_finite() || high - low > 600.0 {
            return Vec::new();
        }
        ((low.floor() as i32)..=(high.ceil() as i32))
            .map(|decade| GridMark {
                value: f64::from(decade),
                step_size: 1.0,
            })
            .collect()
    }

    /// Draw every region as one line of `metric` over time.
    pub fn draw_trend_chart(
        ui: &mut egui::Ui,
        chart_data: &ChartData,
        metric: Metric,
        log_y: bool,
    ) {
        let floor = chart_data.log_floor();
        let log_floor = log_y.then_some(floor);

        let mut plot = Plot::new(format!("trend_{}", metric.column()))
            .legend(Legend::default())
            .x_axis_label("Date")
            .y_axis_label(chart_data.title(metric))
            .x_grid_spacer(|input: GridInput| Self::date_grid_marks(input.bounds))
            .x_axis_formatter(|mark, _range| Self::format_date_mark(mark.value));

        if log_y {
            plot = plot
                .include_y(floor.log10())
                .y_grid_spacer(Self::log_grid_marks)
                .y_axis_formatter(|mark, _range| Self::format_log_mark(mark.value));
        }

        plot.show(ui, |plot_ui| {
            for (i, series) in chart_data.series.iter().enumerate() {
                let points = Self::series_points(series, metric, log_floor);
                if points.is_empty() {
                    continue;
                }
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points))
                        .color(Self::get_region_color(i))
                        .width(LINE_WIDTH)
                        .name(series.label(metric, chart_data.normalized)),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn series() -> RegionSeries {
        RegionSeries {
            region: "Texas".to_string(),
            dates: vec![day(3, 1), day(3, 2), day(3, 3)],
            daily_cases: vec![None, Some(2.0), Some(40.0)],
            daily_deaths: vec![None, None, Some(1.0)],
            total_cases: vec![Some(1.0), Some(100.0), Some(12345.0)],
            total_deaths: vec![Some(0.0), Some(0.0), Some(3.0)],
        }
    }

    #[test]
    fn label_puts_latest_value_first() {
        let s = series();
        assert_eq!(s.label(Metric::TotalCases, false), "  12,345 Texas");
        assert_eq!(s.label(Metric::TotalDeaths, true), "3.000 Texas");
    }

    #[test]
    fn linear_points_skip_missing_values() {
        let points = ChartPlotter::series_points(&series(), Metric::DailyCases, None);
        let x0 = f64::from(date_to_days(day(3, 2)));
        assert_eq!(points, vec![[x0, 2.0], [x0 + 1.0, 40.0]]);
    }

    #[test]
    fn log_points_drop_values_under_floor() {
        let points = ChartPlotter::series_points(&series(), Metric::TotalCases, Some(5.0));
        assert_eq!(points.len(), 2);
        assert!((points[0][1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn grid_marks_months_major_mondays_minor() {
        // Feb 28 2020 (Fri) .. Mar 10 2020 (Tue)
        let bounds = (
            f64::from(date_to_days(day(2, 28))),
            f64::from(date_to_days(day(3, 10))),
        );
        let marks = ChartPlotter::date_grid_marks(bounds);
        let summary: Vec<(NaiveDate, f64)> = marks
            .iter()
            .map(|m| (days_to_date(m.value as i32).unwrap(), m.step_size))
            .collect();
        assert_eq!(
            summary,
            vec![
                (day(3, 1), MONTH_STEP),
                (day(3, 2), WEEK_STEP),
                (day(3, 9), WEEK_STEP),
            ]
        );
    }

    #[test]
    fn date_labels_only_on_month_starts() {
        assert_eq!(
            ChartPlotter::format_date_mark(f64::from(date_to_days(day(4, 1)))),
            "Apr 1"
        );
        assert_eq!(
            ChartPlotter::format_date_mark(f64::from(date_to_days(day(4, 6)))),
            ""
        );
    }

    #[test]
    fn log_labels_show_real_values() {
        assert_eq!(ChartPlotter::format_log_mark(3.0), "1,000");
        assert_eq!(ChartPlotter::format_log_mark(-2.0), "0.010");
    }

    #[test]
    fn title_and_range() {
        let data = ChartData {
            series: vec![series()],
            normalized: false,
        };
        assert_eq!(data.title(Metric::DailyDeaths), "daily deaths (count)");
        assert_eq!(data.date_range(), Some((day(3, 1), day(3, 3))));
    }
}
