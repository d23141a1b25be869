//! CSV Data Loader Module
//! Reads the observation and population tables using Polars.
//!
//! Both upstream files are Latin-1 encoded, so bytes are decoded before the
//! CSV reader sees them. Loaded tables are renamed to the internal column
//! names in [`crate::data::columns`].

use crate::config::{Granularity, JoinKey};
use crate::data::columns::{DATE, FIPS, PARENT, POPULATION, REGION, TOTAL_CASES, TOTAL_DEATHS};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Days from 0001-01-01 to 1970-01-01, the epoch of the Polars `Date` type.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {} (run from the directory holding the data files)", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{} does not look like the expected table, missing column(s): {}", .path.display(), .missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },
    #[error("{} line {line}: malformed date {value:?}, expected YYYY-MM-DD", .path.display())]
    MalformedDate {
        path: PathBuf,
        line: usize,
        value: String,
    },
    #[error("{} line {line}: missing value in column {column:?}", .path.display())]
    MissingValue {
        path: PathBuf,
        line: usize,
        column: String,
    },
}

/// Observation table plus facts reported before the run.
pub struct Observations {
    pub df: DataFrame,
    /// Last-modified time of the source file
    pub modified: Option<DateTime<Local>>,
    pub latest_date: Option<NaiveDate>,
}

/// Handles CSV file loading with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Hint printed instead of fetching; the upstream data lives in a git checkout.
    pub fn fetch_latest() -> &'static str {
        "Try\ngit fetch upstream\ninstead\n"
    }

    /// Read a Latin-1 encoded CSV file into a DataFrame.
    pub fn read_latin1_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_latin1(&bytes);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()?;

        log::info!("Read {} rows from {}", df.height(), path.display());
        Ok(df)
    }

    /// Load the cumulative case/death observations for a granularity.
    ///
    /// Output columns: [parent], region, date, fips, total cases, total deaths
    pub fn load_observations(
        path: &Path,
        granularity: Granularity,
    ) -> Result<Observations, LoaderError> {
        let raw = Self::read_latin1_csv(path)?;

        let region_col = granularity.region_column();
        let mut required = vec!["date", region_col, "fips", "cases", "deaths"];
        if let Some(parent_col) = granularity.parent_column() {
            required.push(parent_col);
        }
        Self::require_columns(&raw, path, &required)?;

        let regions = Self::required_strings(&raw, path, region_col)?;

        let dates = string_values(&raw, "date")?;
        let mut days = Vec::with_capacity(dates.len());
        let mut latest_date: Option<NaiveDate> = None;
        for (i, value) in dates.into_iter().enumerate() {
            let value = value.unwrap_or_default();
            let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
                LoaderError::MalformedDate {
                    path: path.to_path_buf(),
                    line: i + 2,
                    value: value.clone(),
                }
            })?;
            latest_date = latest_date.max(Some(date));
            days.push(date_to_days(date));
        }

        // Rows without a numeric code (e.g. "Unknown" counties) get 0
        let fips: Vec<i64> = i64_values(&raw, "fips")?
            .into_iter()
            .map(|v| v.unwrap_or(0))
            .collect();
        let cases = f64_values(&raw, "cases")?;
        let deaths = f64_values(&raw, "deaths")?;

        let mut columns = Vec::with_capacity(6);
        if let Some(parent_col) = granularity.parent_column() {
            let parents = Self::required_strings(&raw, path, parent_col)?;
            columns.push(Column::new(PARENT.into(), parents));
        }
        columns.push(Column::new(REGION.into(), regions));
        columns.push(Column::new(DATE.into(), days).cast(&DataType::Date)?);
        columns.push(Column::new(FIPS.into(), fips));
        columns.push(Column::new(TOTAL_CASES.into(), cases));
        columns.push(Column::new(TOTAL_DEATHS.into(), deaths));

        let df = Self::drop_missing_counts(DataFrame::new(columns)?, path)?;

        Ok(Observations {
            df,
            modified: Self::modified_time(path),
            latest_date,
        })
    }

    /// Load the population reference table keyed for the granularity's join.
    ///
    /// Output columns: (fips | region), population
    pub fn load_population(
        path: &Path,
        granularity: Granularity,
    ) -> Result<DataFrame, LoaderError> {
        let raw = Self::read_latin1_csv(path)?;

        match granularity.join_key() {
            JoinKey::Fips => {
                Self::require_columns(&raw, path, &["STATE", "COUNTY", "POPESTIMATE2019"])?;
                let states = i64_values(&raw, "STATE")?;
                let counties = i64_values(&raw, "COUNTY")?;
                let keys: Vec<Option<i64>> = states
                    .into_iter()
                    .zip(counties)
                    .map(|(state, county)| Some(state? * 1000 + county?))
                    .collect();
                let populations = f64_values(&raw, "POPESTIMATE2019")?;
                let (keys, populations) = Self::clean_population(keys, populations, path);

                Ok(DataFrame::new(vec![
                    Column::new(FIPS.into(), keys),
                    Column::new(POPULATION.into(), populations),
                ])?)
            }
            JoinKey::RegionName => {
                Self::require_columns(&raw, path, &["state", "Estimated_pop_2019"])?;
                let keys = string_values(&raw, "state")?;
                let populations = f64_values(&raw, "Estimated_pop_2019")?;
                let (keys, populations) = Self::clean_population(keys, populations, path);

                Ok(DataFrame::new(vec![
                    Column::new(REGION.into(), keys),
                    Column::new(POPULATION.into(), populations),
                ])?)
            }
        }
    }

    /// Drop rows with no key, no usable population, or a repeated key (first wins).
    fn clean_population<K>(
        keys: Vec<Option<K>>,
        populations: Vec<Option<f64>>,
        path: &Path,
    ) -> (Vec<K>, Vec<f64>)
    where
        K: Clone + Eq + std::hash::Hash,
    {
        let total = keys.len();
        let mut seen = HashSet::new();
        let mut out_keys = Vec::with_capacity(total);
        let mut out_pops = Vec::with_capacity(total);

        for (key, population) in keys.into_iter().zip(populations) {
            let (Some(key), Some(population)) = (key, population) else {
                continue;
            };
            if population <= 0.0 || !seen.insert(key.clone()) {
                continue;
            }
            out_keys.push(key);
            out_pops.push(population);
        }

        if out_keys.len() < total {
            log::debug!(
                "Discarded {} of {} population rows from {}",
                total - out_keys.len(),
                total,
                path.display()
            );
        }
        (out_keys, out_pops)
    }

    /// Last-modified time of a file, if the filesystem reports one.
    pub fn modified_time(path: &Path) -> Option<DateTime<Local>> {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Local>::from)
    }

    fn require_columns(df: &DataFrame, path: &Path, required: &[&str]) -> Result<(), LoaderError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| df.get_column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::SchemaMismatch {
                path: path.to_path_buf(),
                missing,
            })
        }
    }

    fn required_strings(
        df: &DataFrame,
        path: &Path,
        name: &str,
    ) -> Result<Vec<String>, LoaderError> {
        string_values(df, name)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| LoaderError::MissingValue {
                    path: path.to_path_buf(),
                    line: i + 2,
                    column: name.to_string(),
                })
            })
            .collect()
    }

    /// Rows with a blank cumulative count carry no usable delta; drop them.
    fn drop_missing_counts(df: DataFrame, path: &Path) -> Result<DataFrame, LoaderError> {
        let before = df.height();
        let kept = df
            .lazy()
            .filter(
                col(TOTAL_CASES)
                    .is_not_null()
                    .and(col(TOTAL_DEATHS).is_not_null()),
            )
            .collect()?;

        if kept.height() < before {
            log::warn!(
                "Skipped {} row(s) of {} with a missing case or death count",
                before - kept.height(),
                path.display()
            );
        }
        Ok(kept)
    }
}

/// Latin-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

pub(crate) fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub(crate) fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

/// Dates of a `Date` column as calendar values.
pub(crate) fn date_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    Ok(column
        .i32()?
        .into_iter()
        .map(|v| v.and_then(days_to_date))
        .collect())
}
