//! Text Report Module
//! Per-region summaries written to any `Write` sink.

use crate::config::Granularity;
use crate::data::columns::{FIPS, TOTAL_CASES, TOTAL_DEATHS};
use crate::data::{f64_values, i64_values, DataProcessor, ProcessorError};
use polars::prelude::*;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Latest cumulative totals of one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionTotals {
    pub total_cases: f64,
    pub total_deaths: f64,
}

/// Writes the per-region text report.
pub struct TextReport;

impl TextReport {
    /// Integer with comma thousands separators, e.g. `1234567` -> `1,234,567`.
    pub fn group_thousands(value: f64) -> String {
        let rounded = value.round() as i64;
        let digits = rounded.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if rounded < 0 {
            grouped.push('-');
        }
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        grouped
    }

    /// A total as printed: percent with 2 decimals, or a right-aligned grouped count.
    pub fn format_total(value: f64, normalized: bool) -> String {
        if normalized {
            format!("{value:0.2} %")
        } else {
            format!("{:>8}", Self::group_thousands(value))
        }
    }

    /// Latest value shown in chart legends: 3 decimals, or a grouped count.
    pub fn format_latest(value: Option<f64>, normalized: bool) -> String {
        match value {
            None => "n/a".to_string(),
            Some(v) if normalized => format!("{v:0.3}"),
            Some(v) => format!("{:>8}", Self::group_thousands(v)),
        }
    }

    /// Totals from the last row of a single-region, date-ordered frame.
    pub fn latest_totals(region_df: &DataFrame) -> PolarsResult<Option<RegionTotals>> {
        let cases = f64_values(region_df, TOTAL_CASES)?;
        let deaths = f64_values(region_df, TOTAL_DEATHS)?;

        match (cases.last().copied().flatten(), deaths.last().copied().flatten()) {
            (Some(total_cases), Some(total_deaths)) => Ok(Some(RegionTotals {
                total_cases,
                total_deaths,
            })),
            _ => Ok(None),
        }
    }

    /// The "total cases / total deaths" lines for one region.
    pub fn write_totals<W: Write>(
        out: &mut W,
        region_df: &DataFrame,
        normalized: bool,
    ) -> Result<(), ReportError> {
        match Self::latest_totals(region_df)? {
            Some(totals) => {
                let cases = Self::format_total(totals.total_cases, normalized);
                let deaths = Self::format_total(totals.total_deaths, normalized);
                writeln!(out, "total cases:  {cases}")?;
                writeln!(out, "total deaths: {deaths}")?;
            }
            None => {
                writeln!(out, "no rows left after filtering")?;
            }
        }
        Ok(())
    }

    /// Header, optional row dump, then totals for one region.
    pub fn write_region<W: Write>(
        out: &mut W,
        df: &DataFrame,
        region: &str,
        granularity: Granularity,
        lines: bool,
        normalized: bool,
    ) -> Result<(), ReportError> {
        let region_df = DataProcessor::region_frame(df, region)?;

        let code = match granularity {
            Granularity::County => i64_values(&region_df, FIPS)?.last().copied().flatten(),
            Granularity::State => None,
        };
        match code {
            Some(code) => writeln!(out, "\n{region} {code:05}")?,
            None => writeln!(out, "\n{region}")?,
        }

        if lines {
            writeln!(out, "{region_df}")?;
        }
        Self::write_totals(out, &region_df, normalized)
    }

    /// Header and totals only, used ahead of the multi-region chart.
    pub fn write_region_summary<W: Write>(
        out: &mut W,
        df: &DataFrame,
        region: &str,
        normalized: bool,
    ) -> Result<(), ReportError> {
        let region_df = DataProcessor::region_frame(df, region)?;
        writeln!(out, "\n{region}")?;
        Self::write_totals(out, &region_df, normalized)
    }
}
