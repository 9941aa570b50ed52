use eframe::egui::{RichText, ScrollArea, Ui};

use crate::coordinator::LoadStatus;
use crate::state::AppState;
use crate::views::{placeholder, SelectionMessage};

const PLACEHOLDER_HEIGHT: f32 = 160.0;

// ---------------------------------------------------------------------------
// Central panel – the four linked views
// ---------------------------------------------------------------------------

/// Render every view top to bottom and route brush messages back to the
/// coordinator once all of them have been drawn.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let status = state.coordinator.status().clone();
    let mut messages: Vec<SelectionMessage> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for view in state.coordinator.views_mut() {
                let kind = view.kind();
                ui.group(|ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.heading(kind.title());
                        if status == LoadStatus::Ready {
                            let count = format!("{} records", view.record_count());
                            ui.label(RichText::new(count).weak());
                        }
                    });
                    match &status {
                        LoadStatus::Loading => {
                            placeholder(ui, "Loading data…", PLACEHOLDER_HEIGHT);
                        }
                        LoadStatus::Failed(_) => {
                            placeholder(ui, "Error loading data.", PLACEHOLDER_HEIGHT);
                        }
                        LoadStatus::Ready => {
                            if let Some(message) = view.show(ui) {
                                messages.push(message);
                            }
                        }
                    }
                });
                ui.add_space(8.0);
            }
        });

    for message in messages {
        state.coordinator.handle_message(message);
    }
}
