//! GUI module - Interactive chart window

mod app;
mod chart_viewer;
mod control_panel;

pub use app::TrendApp;
pub use chart_viewer::ChartViewer;
pub use control_panel::{ChartSettings, ControlPanel};
