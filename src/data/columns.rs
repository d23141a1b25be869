//! Internal column names used once a table has been loaded.

pub const REGION: &str = "region";
pub const PARENT: &str = "parent";
pub const FIPS: &str = "fips";
pub const DATE: &str = "date";
pub const TOTAL_CASES: &str = "total cases";
pub const TOTAL_DEATHS: &str = "total deaths";
pub const DAILY_CASES: &str = "daily cases";
pub const DAILY_DEATHS: &str = "daily deaths";
pub const POPULATION: &str = "population";

/// Columns rescaled by normalization.
pub const METRICS: [&str; 4] = [TOTAL_CASES, TOTAL_DEATHS, DAILY_CASES, DAILY_DEATHS];
