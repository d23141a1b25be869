//! Data Processor Module
//! Derives daily rates, joins population, normalizes and filters the table.

use crate::config::JoinKey;
use crate::data::columns::{
    DAILY_CASES, DAILY_DEATHS, DATE, FIPS, METRICS, PARENT, POPULATION, REGION, TOTAL_CASES,
    TOTAL_DEATHS,
};
use crate::data::loader::{f64_values, string_values};
use crate::stats::TrendCalculator;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column {0:?} contains missing values")]
    MissingValues(&'static str),
}

/// Result of matching population onto observations.
pub struct JoinOutcome {
    /// Rows that found a population, sorted by region and date
    pub df: DataFrame,
    /// Regions dropped because the population table had no entry for them
    pub unmatched: Vec<String>,
}

/// Handles the table transformations between loading and presenting.
pub struct DataProcessor;

impl DataProcessor {
    /// Sort by (parent, region, date), parent only when the table has one.
    pub fn sort_by_region(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut keys = Vec::with_capacity(3);
        if Self::has_parent(&df) {
            keys.push(col(PARENT));
        }
        keys.push(col(REGION));
        keys.push(col(DATE));

        let sorted = df
            .lazy()
            .sort_by_exprs(keys, SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;
        Ok(sorted)
    }

    /// Add daily cases/deaths: per-region first difference, then a trailing
    /// 7-day mean. The first 6 points of each region stay null.
    pub fn derive_daily(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut df = Self::sort_by_region(df)?;

        let regions = string_values(&df, REGION)?;
        let parents = if Self::has_parent(&df) {
            string_values(&df, PARENT)?
        } else {
            vec![None; df.height()]
        };
        let keys: Vec<(Option<String>, Option<String>)> =
            parents.into_iter().zip(regions).collect();
        let runs = TrendCalculator::group_runs(&keys);

        let cases = Self::dense_f64s(&df, TOTAL_CASES)?;
        let deaths = Self::dense_f64s(&df, TOTAL_DEATHS)?;

        let daily_cases = TrendCalculator::smoothed_daily(&cases, &runs);
        let daily_deaths = TrendCalculator::smoothed_daily(&deaths, &runs);

        df.with_column(Column::new(DAILY_CASES.into(), daily_cases))?;
        df.with_column(Column::new(DAILY_DEATHS.into(), daily_deaths))?;

        log::debug!("Derived daily rates for {} regions", runs.len());
        Ok(df)
    }

    /// Keep the rows of one enclosing region (exact, case-sensitive match).
    pub fn filter_parent(df: DataFrame, parent: &str) -> Result<DataFrame, ProcessorError> {
        if !Self::has_parent(&df) {
            return Ok(df);
        }
        let filtered = df.lazy().filter(col(PARENT).eq(lit(parent))).collect()?;
        Ok(filtered)
    }

    /// Left-join population onto observations, then split off the regions
    /// that found no match so they can be reported.
    pub fn join_population(
        df: DataFrame,
        population: DataFrame,
        key: JoinKey,
    ) -> Result<JoinOutcome, ProcessorError> {
        let key_col = match key {
            JoinKey::Fips => FIPS,
            JoinKey::RegionName => REGION,
        };

        let joined = df
            .lazy()
            .join(
                population.lazy(),
                [col(key_col)],
                [col(key_col)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;

        let missing = joined
            .clone()
            .lazy()
            .filter(col(POPULATION).is_null())
            .collect()?;
        let unmatched = Self::regions(&Self::sort_by_region(missing)?)?;
        if !unmatched.is_empty() {
            log::warn!(
                "No population data for {} region(s): {}",
                unmatched.len(),
                unmatched.join(", ")
            );
        }

        let matched = joined
            .lazy()
            .filter(col(POPULATION).is_not_null())
            .collect()?;

        Ok(JoinOutcome {
            df: Self::sort_by_region(matched)?,
            unmatched,
        })
    }

    /// Replace the four metric columns with their percentage of population.
    pub fn normalize(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let exprs: Vec<Expr> = METRICS
            .iter()
            .map(|&name| (col(name) / col(POPULATION) * lit(100.0)).alias(name))
            .collect();

        let normalized = df.lazy().with_columns(exprs).collect()?;
        Ok(normalized)
    }

    /// Drop rows whose daily cases fall below `threshold`.
    ///
    /// Rows still inside the smoothing warm-up have no daily value and are kept.
    pub fn drop_noise(df: DataFrame, threshold: f64) -> Result<DataFrame, ProcessorError> {
        let before = df.height();
        let filtered = df
            .lazy()
            .filter(
                col(DAILY_CASES)
                    .is_null()
                    .or(col(DAILY_CASES).gt_eq(lit(threshold))),
            )
            .collect()?;

        log::debug!(
            "Noise filter (< {threshold}) dropped {} of {before} rows",
            before - filtered.height()
        );
        Ok(filtered)
    }

    /// Rows of a single region, in date order.
    pub fn region_frame(df: &DataFrame, region: &str) -> Result<DataFrame, ProcessorError> {
        let filtered = df
            .clone()
            .lazy()
            .filter(col(REGION).eq(lit(region)))
            .collect()?;
        Ok(filtered)
    }

    /// Distinct region names in order of first appearance.
    pub fn regions(df: &DataFrame) -> Result<Vec<String>, ProcessorError> {
        let mut regions: Vec<String> = Vec::new();
        for region in string_values(df, REGION)?.into_iter().flatten() {
            if regions.last() != Some(&region) && !regions.contains(&region) {
                regions.push(region);
            }
        }
        Ok(regions)
    }

    fn has_parent(df: &DataFrame) -> bool {
        df.get_column_index(PARENT).is_some()
    }

    fn dense_f64s(df: &DataFrame, name: &'static str) -> Result<Vec<f64>, ProcessorError> {
        f64_values(df, name)?
            .into_iter()
            .map(|v| v.ok_or(ProcessorError::MissingValues(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metric;
    use crate::data::loader::{date_to_days, i64_values};
    use crate::data::RegionSelector;
    use chrono::NaiveDate;

    /// Build an observation table from (parent, region, fips, day offset, cases, deaths).
    fn observations(rows: &[(&str, &str, i64, i64, f64, f64)]) -> DataFrame {
        let start = date_to_days(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        DataFrame::new(vec![
            Column::new(PARENT.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(REGION.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(
                DATE.into(),
                rows.iter().map(|r| start + r.3 as i32).collect::<Vec<i32>>(),
            )
            .cast(&DataType::Date)
            .unwrap(),
            Column::new(FIPS.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(TOTAL_CASES.into(), rows.iter().map(|r| r.4).collect::<Vec<_>>()),
            Column::new(TOTAL_DEATHS.into(), rows.iter().map(|r| r.5).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn population(keys: &[i64], pops: &[f64]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(FIPS.into(), keys.to_vec()),
            Column::new(POPULATION.into(), pops.to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn derives_per_region_after_sorting() {
        // Rows arrive interleaved and out of date order.
        let mut rows = Vec::new();
        for day in (0..8).rev() {
            rows.push(("CA", "Marin", 6041, day, (day * 10) as f64, 0.0));
            rows.push(("CA", "Alameda", 6001, day, (day * 3) as f64, day as f64));
        }
        let df = DataProcessor::derive_daily(observations(&rows)).unwrap();

        assert_eq!(DataProcessor::regions(&df).unwrap(), vec!["Alameda", "Marin"]);
        let daily = f64_values(&df, DAILY_CASES).unwrap();
        // Alameda: deltas 0,3,3,3,3,3,3,3
        assert!(daily[..6].iter().all(Option::is_none));
        assert!((daily[6].unwrap() - 18.0 / 7.0).abs() < 1e-9);
        assert!((daily[7].unwrap() - 3.0).abs() < 1e-9);
        // Marin restarts its window
        assert!(daily[8..14].iter().all(Option::is_none));
        assert!((daily[15].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn same_county_name_in_two_states_is_two_series() {
        let mut rows = Vec::new();
        for day in 0..7 {
            rows.push(("AZ", "Yuma", 4027, day, 1.0, 0.0));
            rows.push(("CO", "Yuma", 8125, day, (day * 7) as f64, 0.0));
        }
        let df = DataProcessor::derive_daily(observations(&rows)).unwrap();
        let daily = f64_values(&df, DAILY_CASES).unwrap();
        assert_eq!(daily[6], Some(0.0));
        assert!((daily[13].unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn filters_parent_exactly() {
        let df = observations(&[
            ("California", "Marin", 6041, 0, 1.0, 0.0),
            ("california", "Marin", 6041, 0, 1.0, 0.0),
            ("Oregon", "Lane", 41039, 0, 1.0, 0.0),
        ]);
        let df = DataProcessor::filter_parent(df, "California").unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn join_reports_regions_without_population() {
        let df = observations(&[
            ("CA", "Marin", 6041, 0, 1.0, 0.0),
            ("CA", "Marin", 6041, 1, 2.0, 0.0),
            ("CA", "Unknown", 0, 0, 5.0, 0.0),
        ]);
        let outcome =
            DataProcessor::join_population(df, population(&[6041], &[258826.0]), JoinKey::Fips)
                .unwrap();

        assert_eq!(outcome.unmatched, vec!["Unknown"]);
        assert_eq!(outcome.df.height(), 2);
        assert_eq!(
            i64_values(&outcome.df, FIPS).unwrap(),
            vec![Some(6041), Some(6041)]
        );
    }

    #[test]
    fn join_with_no_matches_is_empty_not_an_error() {
        let df = observations(&[("CA", "Marin", 6041, 0, 1.0, 0.0)]);
        let outcome =
            DataProcessor::join_population(df, population(&[1], &[10.0]), JoinKey::Fips).unwrap();
        assert_eq!(outcome.df.height(), 0);
        assert_eq!(outcome.unmatched, vec!["Marin"]);
    }

    #[test]
    fn normalizes_to_percent_of_population() {
        let df = observations(&[("CA", "Marin", 6041, 0, 50.0, 5.0)]);
        let df = DataProcessor::derive_daily(df).unwrap();
        let df = DataProcessor::join_population(df, population(&[6041], &[1000.0]), JoinKey::Fips)
            .unwrap()
            .df;
        let df = DataProcessor::normalize(df).unwrap();

        assert_eq!(f64_values(&df, TOTAL_CASES).unwrap(), vec![Some(5.0)]);
        assert_eq!(f64_values(&df, TOTAL_DEATHS).unwrap(), vec![Some(0.5)]);
        // still inside the smoothing warm-up
        assert_eq!(f64_values(&df, DAILY_CASES).unwrap(), vec![None]);
    }

    #[test]
    fn normalization_reorders_top_regions() {
        let df = observations(&[
            ("X", "A", 1, 0, 100.0, 0.0),
            ("X", "B", 2, 0, 150.0, 0.0),
        ]);
        let df = DataProcessor::derive_daily(df).unwrap();
        let pops = population(&[1, 2], &[1000.0, 10000.0]);
        let df = DataProcessor::join_population(df, pops, JoinKey::Fips)
            .unwrap()
            .df;

        let raw = RegionSelector::top_n(&df, Metric::TotalCases, 2).unwrap();
        assert_eq!(raw, vec!["B", "A"]);

        let normalized = DataProcessor::normalize(df).unwrap();
        let ranked = RegionSelector::top_n(&normalized, Metric::TotalCases, 2).unwrap();
        assert_eq!(ranked, vec!["A", "B"]);
    }

    #[test]
    fn noise_filter_keeps_warm_up_rows() {
        let df = DataFrame::new(vec![
            Column::new(REGION.into(), ["a", "a", "a", "a"]),
            Column::new(DAILY_CASES.into(), [None, Some(1.0), Some(2.0), Some(9.0)]),
        ])
        .unwrap();

        let counts = DataProcessor::drop_noise(df.clone(), 2.0).unwrap();
        assert_eq!(
            f64_values(&counts, DAILY_CASES).unwrap(),
            vec![None, Some(2.0), Some(9.0)]
        );

        let normalized = DataProcessor::drop_noise(df, 0.0).unwrap();
        assert_eq!(normalized.height(), 4);
    }
}
