//! Stats module - Per-region series arithmetic

mod calculator;

pub use calculator::{TrendCalculator, ROLLING_WINDOW};
