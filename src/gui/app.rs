//! Trend Chart Window
//! eframe application showing the selected regions on one chart.

use crate::charts::ChartData;
use crate::gui::{ChartSettings, ChartViewer, ControlPanel};
use egui::TopBottomPanel;

/// Main chart window.
pub struct TrendApp {
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl TrendApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        chart_data: ChartData,
        settings: ChartSettings,
    ) -> Self {
        Self {
            control_panel: ControlPanel::new(settings, chart_data.series.len()),
            chart_viewer: ChartViewer::new(chart_data),
        }
    }

    /// Open the window and block until it is closed.
    pub fn run(chart_data: ChartData, settings: ChartSettings) -> eframe::Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([800.0, 500.0])
                .with_min_inner_size([480.0, 320.0])
                .with_title("COVID-19 Trends"),
            ..Default::default()
        };

        eframe::run_native(
            "COVID-19 Trends",
            options,
            Box::new(move |cc| Ok(Box::new(TrendApp::new(cc, chart_data, settings)))),
        )
    }
}

impl eframe::App for TrendApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        TopBottomPanel::top("control_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            if self.control_panel.show(ui) {
                log::debug!("Chart settings changed: {:?}", self.control_panel.settings);
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui, self.control_panel.settings);
        });
    }
}
