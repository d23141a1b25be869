//! Charts module - Chart rendering

mod plotter;
mod renderer;

pub use plotter::{ChartData, ChartPlotter, RegionSeries};
pub use renderer::{RenderError, StaticChartRenderer, DEFAULT_SIZE};
