//! COVID-19 Trends - county and state case/death reports with charts
//!
//! Loads the published cumulative time series, derives smoothed daily values,
//! joins population estimates and reports the selected regions as text or as
//! a multi-region chart.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod pipeline;
pub mod report;
pub mod stats;
