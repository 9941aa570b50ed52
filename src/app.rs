use eframe::egui;

use crate::config::DashboardConfig;
use crate::state::AppState;
use crate::ui::{dashboard, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ScorecardApp {
    pub state: AppState,
}

impl ScorecardApp {
    /// Build the app and kick off the initial load.
    pub fn new(ctx: &egui::Context, config: DashboardConfig) -> Self {
        let mut state = AppState::new(config);
        state.start_loading(ctx);
        Self { state }
    }
}

impl eframe::App for ScorecardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Results of the background load, then the newest pending filter.
        self.state.poll_loader();
        self.state.coordinator.run_deferred();

        // ---- Top panel: menu bar and summary ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: linked views ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard::central_panel(ui, &mut self.state);
        });

        // Filter changes made this frame are applied on the next one.
        if self.state.coordinator.is_updating() {
            ctx.request_repaint();
        }
    }
}
