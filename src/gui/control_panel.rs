//! Control Panel Widget
//! Top bar for switching the charted metric and the Y scale.

use crate::config::Metric;
use egui::{Color32, ComboBox, RichText};

/// What the chart currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSettings {
    pub metric: Metric,
    pub log_y: bool,
}

/// Top bar with metric and scale controls.
pub struct ControlPanel {
    pub settings: ChartSettings,
    regions: usize,
}

impl ControlPanel {
    pub fn new(settings: ChartSettings, regions: usize) -> Self {
        Self { settings, regions }
    }

    /// Draw the controls; returns true when a setting changed.
    pub fn show(&mut self, ui: &mut egui::Ui) -> bool {
        let before = self.settings;

        ui.horizontal(|ui| {
            ui.label(
                RichText::new("📈 COVID-19 Trends")
                    .size(18.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.separator();

            ComboBox::from_label("Metric")
                .selected_text(self.settings.metric.column())
                .show_ui(ui, |ui| {
                    for metric in Metric::ALL {
                        ui.selectable_value(&mut self.settings.metric, metric, metric.column());
                    }
                });

            ui.checkbox(&mut self.settings.log_y, "Log Y scale");
            ui.separator();
            ui.label(
                RichText::new(format!("{} regions", self.regions))
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });

        self.settings != before
    }
}
