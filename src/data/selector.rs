//! Region Selector Module
//! Turns the region argument into a concrete, ordered list of region names.

use crate::config::{Metric, RegionChoice};
use crate::data::columns::REGION;
use crate::data::loader::{f64_values, string_values};
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Resolves region arguments against a derived table.
pub struct RegionSelector;

impl RegionSelector {
    /// Resolve the argument to region names.
    ///
    /// Named regions are returned as given; use [`Self::retain_present`] to
    /// drop names that do not occur in the data.
    pub fn resolve(
        choice: &RegionChoice,
        df: &DataFrame,
        metric: Metric,
    ) -> PolarsResult<Vec<String>> {
        match choice {
            RegionChoice::Top(n) => Self::top_n(df, metric, *n),
            RegionChoice::Named(names) => Ok(names.clone()),
        }
    }

    /// The `n` regions with the highest latest value of `metric`.
    ///
    /// Regions whose latest value is missing rank last; ties keep table order.
    pub fn top_n(df: &DataFrame, metric: Metric, n: usize) -> PolarsResult<Vec<String>> {
        let mut latest = Self::latest_values(df, metric)?;
        latest.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Ok(latest
            .into_iter()
            .take(n)
            .map(|(region, _)| region)
            .collect())
    }

    /// Last row's value of `metric` for each region, in order of first appearance.
    ///
    /// Expects the table sorted by region and date.
    pub fn latest_values(
        df: &DataFrame,
        metric: Metric,
    ) -> PolarsResult<Vec<(String, Option<f64>)>> {
        let regions = string_values(df, REGION)?;
        let values = f64_values(df, metric.column())?;

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut latest: Vec<(String, Option<f64>)> = Vec::new();

        for (region, value) in regions.into_iter().zip(values) {
            let Some(region) = region else {
                continue;
            };
            match index.get(&region) {
                Some(&i) => latest[i].1 = value,
                None => {
                    index.insert(region.clone(), latest.len());
                    latest.push((region, value));
                }
            }
        }

        Ok(latest)
    }

    /// Split requested names into (present in the table, absent), keeping order.
    pub fn retain_present(
        df: &DataFrame,
        requested: Vec<String>,
    ) -> PolarsResult<(Vec<String>, Vec<String>)> {
        let known: Vec<String> = string_values(df, REGION)?.into_iter().flatten().collect();

        let mut present = Vec::new();
        let mut absent = Vec::new();
        for name in requested {
            if present.contains(&name) || absent.contains(&name) {
                continue;
            }
            if known.contains(&name) {
                present.push(name);
            } else {
                absent.push(name);
            }
        }

        Ok((present, absent))
    }
}
