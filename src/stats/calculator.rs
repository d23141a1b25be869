//! Trend Calculator Module
//! Per-region series arithmetic: day-over-day deltas and trailing rolling means.

use statrs::statistics::Statistics;
use std::ops::Range;

/// Points in the trailing smoothing window.
pub const ROLLING_WINDOW: usize = 7;

/// Handles the numeric work on one region's date-ordered series.
pub struct TrendCalculator;

impl TrendCalculator {
    /// Split a sorted key sequence into runs of consecutive equal keys.
    pub fn group_runs<K: PartialEq>(keys: &[K]) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = 0;

        for i in 1..=keys.len() {
            if i == keys.len() || keys[i] != keys[start] {
                runs.push(start..i);
                start = i;
            }
        }

        runs
    }

    /// First difference of a cumulative series; the first point is zero.
    pub fn daily_deltas(cumulative: &[f64]) -> Vec<f64> {
        let mut deltas = Vec::with_capacity(cumulative.len());
        let mut previous: Option<f64> = None;

        for &value in cumulative {
            deltas.push(previous.map_or(0.0, |p| value - p));
            previous = Some(value);
        }

        deltas
    }

    /// Trailing (not centered) rolling mean.
    ///
    /// Points before the window is full have no value.
    pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
        if window == 0 {
            return vec![None; values.len()];
        }

        (0..values.len())
            .map(|i| {
                if i + 1 < window {
                    None
                } else {
                    Some(values[i + 1 - window..=i].iter().mean())
                }
            })
            .collect()
    }

    /// Deltas then smoothing, applied independently to each run.
    pub fn smoothed_daily(cumulative: &[f64], runs: &[Range<usize>]) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(cumulative.len());
        for run in runs {
            let deltas = Self::daily_deltas(&cumulative[run.clone()]);
            out.extend(Self::rolling_mean(&deltas, ROLLING_WINDOW));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn deltas_are_zero_filled() {
        let deltas = TrendCalculator::daily_deltas(&[0.0, 0.0, 3.0, 3.0, 7.0]);
        assert_eq!(deltas, vec![0.0, 0.0, 3.0, 0.0, 4.0]);
        assert!(TrendCalculator::daily_deltas(&[]).is_empty());
    }

    #[test]
    fn rolling_mean_waits_for_full_window() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let smoothed = TrendCalculator::rolling_mean(&values, ROLLING_WINDOW);

        assert_eq!(smoothed.len(), 9);
        assert!(smoothed[..6].iter().all(Option::is_none));
        // mean(1..=7) = 4, mean(2..=8) = 5, mean(3..=9) = 6
        assert!(close(smoothed[6].unwrap(), 4.0));
        assert!(close(smoothed[7].unwrap(), 5.0));
        assert!(close(smoothed[8].unwrap(), 6.0));
    }

    #[test]
    fn rolling_mean_matches_trailing_sum_over_seven() {
        let values = [5.0, 0.0, 12.0, 3.0, 3.0, 9.0, 1.0, 40.0, 2.0, 0.0];
        let smoothed = TrendCalculator::rolling_mean(&values, ROLLING_WINDOW);
        for i in 6..values.len() {
            let expected = values[i - 6..=i].iter().sum::<f64>() / 7.0;
            assert!(close(smoothed[i].unwrap(), expected), "index {i}");
        }
    }

    #[test]
    fn short_series_never_fills_window() {
        let smoothed = TrendCalculator::rolling_mean(&[1.0, 2.0, 3.0], ROLLING_WINDOW);
        assert_eq!(smoothed, vec![None, None, None]);
    }

    #[test]
    fn groups_consecutive_keys() {
        let keys = ["a", "a", "b", "c", "c", "c"];
        assert_eq!(TrendCalculator::group_runs(&keys), vec![0..2, 2..3, 3..6]);
        assert!(TrendCalculator::group_runs::<&str>(&[]).is_empty());
    }

    #[test]
    fn smoothing_restarts_per_region() {
        // Region A has 8 days, region B has 2; B must not inherit A's window.
        let mut cumulative: Vec<f64> = (0..8).map(|i| f64::from(i * 7)).collect();
        cumulative.extend([100.0, 101.0]);
        let runs = vec![0..8, 8..10];

        let smoothed = TrendCalculator::smoothed_daily(&cumulative, &runs);
        assert_eq!(smoothed.len(), 10);
        // A: deltas 0,7,7,7,7,7,7,7 -> index 6 mean 6, index 7 mean 7
        assert!(close(smoothed[6].unwrap(), 6.0));
        assert!(close(smoothed[7].unwrap(), 7.0));
        assert_eq!(smoothed[8], None);
        assert_eq!(smoothed[9], None);
    }
}
