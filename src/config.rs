//! Report Configuration Module
//! Immutable run options shared by the county and state pipelines.

use serde::Serialize;
use std::path::PathBuf;

/// Daily-cases values below this are dropped before presenting raw counts.
pub const NOISE_THRESHOLD_COUNT: f64 = 2.0;
/// Daily-cases values below this are dropped before presenting percentages.
pub const NOISE_THRESHOLD_NORMALIZED: f64 = 0.0;

/// Lowest Y value shown on a log-scaled chart of raw counts.
pub const LOG_Y_FLOOR_COUNT: f64 = 5.0;
/// Lowest Y value shown on a log-scaled chart of population percentages.
pub const LOG_Y_FLOOR_NORMALIZED: f64 = 0.001;

pub const DEFAULT_COUNTIES: &str =
    "Santa Clara, Alameda, San Mateo, San Francisco, Contra Costa, Marin, Sonoma, Napa";
pub const DEFAULT_STATE: &str = "California";
pub const DEFAULT_STATES: &str =
    "Arizona,California,Texas,Florida,Louisiana,Alabama,South Carolina,Mississippi,Idaho";

/// How the population table is matched onto observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinKey {
    /// Numeric region code (`fips`)
    Fips,
    /// Region name
    RegionName,
}

/// Geographic level a report runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    County,
    State,
}

impl Granularity {
    /// Column of the observations file naming the region.
    pub fn region_column(self) -> &'static str {
        match self {
            Granularity::County => "county",
            Granularity::State => "state",
        }
    }

    /// Column of the observations file naming the enclosing region, if any.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            Granularity::County => Some("state"),
            Granularity::State => None,
        }
    }

    pub fn join_key(self) -> JoinKey {
        match self {
            Granularity::County => JoinKey::Fips,
            Granularity::State => JoinKey::RegionName,
        }
    }

    pub fn default_data_file(self) -> &'static str {
        match self {
            Granularity::County => "us-counties.csv",
            Granularity::State => "us-states.csv",
        }
    }

    pub fn default_population_file(self) -> &'static str {
        match self {
            Granularity::County => "co-est2019-alldata.csv",
            Granularity::State => "state_pops.csv",
        }
    }

    /// Plural noun used in user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            Granularity::County => "counties",
            Granularity::State => "states",
        }
    }
}

/// One of the four plottable metric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    DailyCases,
    DailyDeaths,
    TotalCases,
    TotalDeaths,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::TotalCases
    }
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::DailyCases,
        Metric::DailyDeaths,
        Metric::TotalCases,
        Metric::TotalDeaths,
    ];

    /// Map the single-character chart flag: lower case for daily, upper for totals.
    ///
    /// Anything else falls back to total cases.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "c" => Metric::DailyCases,
            "d" => Metric::DailyDeaths,
            "C" => Metric::TotalCases,
            "D" => Metric::TotalDeaths,
            other => {
                log::debug!("Unknown metric flag {other:?}, using total cases");
                Metric::TotalCases
            }
        }
    }

    /// Column holding this metric in the derived table.
    pub fn column(self) -> &'static str {
        match self {
            Metric::DailyCases => crate::data::columns::DAILY_CASES,
            Metric::DailyDeaths => crate::data::columns::DAILY_DEATHS,
            Metric::TotalCases => crate::data::columns::TOTAL_CASES,
            Metric::TotalDeaths => crate::data::columns::TOTAL_DEATHS,
        }
    }
}

/// Region argument as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegionChoice {
    /// The N regions with the highest latest value of the chart metric
    Top(usize),
    /// Explicit names, in the order given
    Named(Vec<String>),
}

impl RegionChoice {
    /// A positive integer selects the top N; anything else is a comma separated list.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<usize>() {
            Ok(n) if n > 0 => RegionChoice::Top(n),
            _ => {
                let names = input
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                RegionChoice::Named(names)
            }
        }
    }
}

/// Everything one run needs, fixed before the pipeline starts.
#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub granularity: Granularity,
    pub data_file: PathBuf,
    pub population_file: PathBuf,
    pub regions: RegionChoice,
    /// Keep only rows of this enclosing region (county reports)
    pub parent: Option<String>,
    pub lines: bool,
    pub log_y: bool,
    /// Chart metric; `Some` switches to the multi-region chart mode
    pub multi: Option<Metric>,
    pub normalize: bool,
    pub debug: bool,
    pub fetch: bool,
    pub save_chart: Option<PathBuf>,
}

impl ReportConfig {
    /// Defaults for a granularity, as the CLI would produce with no flags.
    pub fn new(granularity: Granularity) -> Self {
        let (regions, parent) = match granularity {
            Granularity::County => (DEFAULT_COUNTIES, Some(DEFAULT_STATE.to_string())),
            Granularity::State => (DEFAULT_STATES, None),
        };

        Self {
            granularity,
            data_file: PathBuf::from(granularity.default_data_file()),
            population_file: PathBuf::from(granularity.default_population_file()),
            regions: RegionChoice::parse(regions),
            parent,
            lines: false,
            log_y: false,
            multi: None,
            normalize: false,
            debug: false,
            fetch: false,
            save_chart: None,
        }
    }

    /// Metric used for ranking and charting.
    pub fn metric(&self) -> Metric {
        self.multi.unwrap_or_default()
    }

    pub fn noise_threshold(&self) -> f64 {
        if self.normalize {
            NOISE_THRESHOLD_NORMALIZED
        } else {
            NOISE_THRESHOLD_COUNT
        }
    }

    pub fn log_floor(&self) -> f64 {
        log_floor(self.normalize)
    }
}

pub fn log_floor(normalized: bool) -> f64 {
    if normalized {
        LOG_Y_FLOOR_NORMALIZED
    } else {
        LOG_Y_FLOOR_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_region_argument_selects_top_n() {
        assert_eq!(RegionChoice::parse("3"), RegionChoice::Top(3));
        assert_eq!(RegionChoice::parse(" 12 "), RegionChoice::Top(12));
    }

    #[test]
    fn non_integer_region_argument_is_a_trimmed_list() {
        assert_eq!(
            RegionChoice::parse("Texas, California"),
            RegionChoice::Named(vec!["Texas".to_string(), "California".to_string()])
        );
    }

    #[test]
    fn zero_and_empty_fall_through_to_names() {
        assert_eq!(RegionChoice::parse("0"), RegionChoice::Named(vec!["0".to_string()]));
        assert_eq!(RegionChoice::parse(""), RegionChoice::Named(Vec::new()));
        assert_eq!(RegionChoice::parse(" , "), RegionChoice::Named(Vec::new()));
    }

    #[test]
    fn metric_flags() {
        assert_eq!(Metric::from_flag("c"), Metric::DailyCases);
        assert_eq!(Metric::from_flag("d"), Metric::DailyDeaths);
        assert_eq!(Metric::from_flag("C"), Metric::TotalCases);
        assert_eq!(Metric::from_flag("D"), Metric::TotalDeaths);
        assert_eq!(Metric::from_flag("x"), Metric::TotalCases);
    }

    #[test]
    fn thresholds_follow_normalization() {
        let mut config = ReportConfig::new(Granularity::State);
        assert_eq!(config.noise_threshold(), NOISE_THRESHOLD_COUNT);
        assert_eq!(config.log_floor(), LOG_Y_FLOOR_COUNT);
        config.normalize = true;
        assert_eq!(config.noise_threshold(), NOISE_THRESHOLD_NORMALIZED);
        assert_eq!(config.log_floor(), LOG_Y_FLOOR_NORMALIZED);
    }

    #[test]
    fn county_defaults_filter_to_california() {
        let config = ReportConfig::new(Granularity::County);
        assert_eq!(config.parent.as_deref(), Some("California"));
        assert_eq!(config.data_file, PathBuf::from("us-counties.csv"));
        match config.regions {
            RegionChoice::Named(names) => assert_eq!(names.len(), 8),
            RegionChoice::Top(_) => panic!("expected named counties"),
        }
    }
}
