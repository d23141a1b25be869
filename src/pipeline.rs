//! Report Pipeline
//! Load, derive, join, normalize, select and present; shared by the county
//! and state reports and parameterized by [`crate::config::Granularity`].

use crate::charts::ChartData;
use crate::config::ReportConfig;
use crate::data::{DataLoader, DataProcessor, LoaderError, ProcessorError, RegionSelector};
use crate::report::{ReportError, TextReport};
use polars::prelude::*;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Process(#[from] ProcessorError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No rows for {0:?}; names are matched exactly, including case")]
    UnknownParent(String),
    #[error("No {noun} to report: none of [{}] occur in the data (names are matched exactly, including case)", .requested.join(", "))]
    EmptySelection {
        noun: &'static str,
        requested: Vec<String>,
    },
    #[error("No population data matched any {noun}; missing for: {}", .unmatched.join(", "))]
    EmptyAfterJoin {
        noun: &'static str,
        unmatched: Vec<String>,
    },
}

/// What a run produced besides its text output.
#[derive(Debug)]
pub struct RunOutcome {
    /// Regions reported, in selection order
    pub regions: Vec<String>,
    /// Chart contents in multi-region mode
    pub chart: Option<ChartData>,
}

const BANNER_WIDTH: usize = 60;

/// Run the whole report, writing text to `out`.
pub fn run<W: Write>(config: &ReportConfig, out: &mut W) -> Result<RunOutcome, PipelineError> {
    let stars = "*".repeat(BANNER_WIDTH);
    writeln!(out, "{stars}\n{stars}")?;
    if config.debug {
        writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
    }
    if config.fetch {
        write!(out, "{}", DataLoader::fetch_latest())?;
    }

    let observations = DataLoader::load_observations(&config.data_file, config.granularity)?;
    if let Some(modified) = observations.modified {
        writeln!(out, "Data was retrieved {}", modified.format("%B %d, %Y at %I:%M %p"))?;
    }

    let mut df = DataProcessor::derive_daily(observations.df)?;
    if let Some(latest) = observations.latest_date {
        writeln!(out, "Most recent date point is {}", latest.format("%B %d, %Y"))?;
    }

    if let (Some(parent), Some(_)) = (&config.parent, config.granularity.parent_column()) {
        df = DataProcessor::filter_parent(df, parent)?;
        if df.height() == 0 {
            return Err(PipelineError::UnknownParent(parent.clone()));
        }
    }

    let population = DataLoader::load_population(&config.population_file, config.granularity)?;
    let joined = DataProcessor::join_population(df, population, config.granularity.join_key())?;
    if !joined.unmatched.is_empty() {
        writeln!(out, "No population data for: {}", joined.unmatched.join(", "))?;
    }
    if joined.df.height() == 0 {
        return Err(PipelineError::EmptyAfterJoin {
            noun: config.granularity.noun(),
            unmatched: joined.unmatched,
        });
    }

    let mut df = joined.df;
    if config.normalize {
        df = DataProcessor::normalize(df)?;
    }

    let regions = select_regions(config, &df, out)?;
    let df = DataProcessor::drop_noise(df, config.noise_threshold())?;

    if config.multi.is_some() {
        for region in &regions {
            TextReport::write_region_summary(out, &df, region, config.normalize)?;
        }
        let chart = ChartData::from_frame(&df, &regions, config.normalize)?;
        Ok(RunOutcome {
            regions,
            chart: Some(chart),
        })
    } else {
        for region in &regions {
            TextReport::write_region(
                out,
                &df,
                region,
                config.granularity,
                config.lines,
                config.normalize,
            )?;
        }
        Ok(RunOutcome {
            regions,
            chart: None,
        })
    }
}

/// Resolve the region argument and drop names absent from the joined table.
fn select_regions<W: Write>(
    config: &ReportConfig,
    df: &DataFrame,
    out: &mut W,
) -> Result<Vec<String>, PipelineError> {
    let requested = RegionSelector::resolve(&config.regions, df, config.metric())?;
    let (present, absent) = RegionSelector::retain_present(df, requested.clone())?;

    if !absent.is_empty() {
        writeln!(out, "No data for: {}", absent.join(", "))?;
    }
    if present.is_empty() {
        return Err(PipelineError::EmptySelection {
            noun: config.granularity.noun(),
            requested,
        });
    }

    log::debug!("Selected {}: {}", config.granularity.noun(), present.join(", "));
    Ok(present)
}

