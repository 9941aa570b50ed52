use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Context as _;
use eframe::egui;

use crate::config::DashboardConfig;
use crate::coordinator::{LoadOutcome, ViewCoordinator};
use crate::data::filter::{FilterChoices, FilterGroup};
use crate::data::loader::load_dataset;
use crate::geo::StateBoundaries;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Where the current (or next) load reads from.
    pub config: DashboardConfig,

    /// Selection state and views.
    pub coordinator: ViewCoordinator,

    /// Checkbox state behind the filter panel.
    pub choices: FilterChoices,

    /// Pending background load, if any.
    loader: Option<Receiver<LoadOutcome>>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            coordinator: ViewCoordinator::default(),
            choices: FilterChoices::default(),
            loader: None,
        }
    }

    /// Load dataset and geography on a worker thread. Any earlier load in
    /// flight is abandoned.
    pub fn start_loading(&mut self, ctx: &egui::Context) {
        let config = self.config.clone();
        let ctx = ctx.clone();
        let (tx, rx) = mpsc::channel();
        log::info!(
            "Loading {} and {}",
            config.data_path.display(),
            config.geography_path.display()
        );
        thread::spawn(move || {
            let outcome = load_inputs(&config);
            // The receiver is gone if a newer load replaced this one.
            if tx.send(outcome).is_err() {
                log::debug!("dropping result of a superseded load");
            }
            ctx.request_repaint();
        });
        self.loader = Some(rx);
        self.coordinator.begin_loading();
    }

    /// Hand a finished load to the coordinator. Call once per frame.
    pub fn poll_loader(&mut self) {
        let Some(rx) = &self.loader else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.loader = None;
                self.coordinator.finish_loading(outcome, self.choices.predicate());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.loader = None;
                self.coordinator
                    .fail(&anyhow::anyhow!("loader thread exited without a result"));
            }
        }
    }

    /// Start over with a different dataset file.
    pub fn open_dataset(&mut self, ctx: &egui::Context, path: PathBuf) {
        self.config.data_path = path;
        self.start_loading(ctx);
    }

    /// Start over with a different boundary file.
    pub fn open_boundaries(&mut self, ctx: &egui::Context, path: PathBuf) {
        self.config.geography_path = path;
        self.start_loading(ctx);
    }

    /// Check or uncheck one box.
    pub fn set_choice(&mut self, group: FilterGroup, code: &str, checked: bool) {
        self.choices.set(group, code, checked);
        self.dispatch_filter();
    }

    pub fn toggle_all(&mut self, group: FilterGroup) {
        self.choices.toggle_all(group);
        self.dispatch_filter();
    }

    pub fn reset_filters(&mut self) {
        self.choices.reset();
        self.dispatch_filter();
    }

    fn dispatch_filter(&mut self) {
        self.coordinator.request_filter(self.choices.predicate());
    }
}

/// Read both inputs. The two results are independent.
fn load_inputs(config: &DashboardConfig) -> LoadOutcome {
    let dataset = load_dataset(&config.data_path, config.min_present)
        .with_context(|| format!("loading dataset {}", config.data_path.display()));
    let geography = StateBoundaries::load(&config.geography_path);
    LoadOutcome { dataset, geography }
}
