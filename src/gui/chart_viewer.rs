//! Chart Viewer Widget
//! Central panel holding the multi-region trend chart.

use crate::charts::{ChartData, ChartPlotter};
use crate::gui::control_panel::ChartSettings;
use egui::RichText;

/// Displays the chart for the current settings.
pub struct ChartViewer {
    chart_data: ChartData,
}

impl ChartViewer {
    pub fn new(chart_data: ChartData) -> Self {
        Self { chart_data }
    }

    pub fn show(&self, ui: &mut egui::Ui, settings: ChartSettings) {
        if self.chart_data.series.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        }

        ui.vertical_centered(|ui| {
            ui.label(
                RichText::new(self.chart_data.title(settings.metric))
                    .size(16.0)
                    .strong(),
            );
        });
        ui.add_space(6.0);

        ChartPlotter::draw_trend_chart(ui, &self.chart_data, settings.metric, settings.log_y);
    }
}
