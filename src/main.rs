mod app;
mod color;
mod config;
mod coordinator;
mod data;
mod error;
mod geo;
mod schedule;
mod selection;
mod state;
mod stats;
mod ui;
mod views;

use app::ScorecardApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from_env();
    log::info!("Starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Scorecard Explorer – Linked Views",
        options,
        Box::new(|cc| Ok(Box::new(ScorecardApp::new(&cc.egui_ctx, config)))),
    )
}
