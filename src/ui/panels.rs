use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::coordinator::LoadStatus;
use crate::data::filter::FilterGroup;
use crate::data::schema::Metric;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for group in [FilterGroup::Control, FilterGroup::Region] {
                filter_group(ui, state, group);
            }

            ui.add_space(4.0);
            // Always clickable: a reset with nothing checked still clears the brush.
            if ui.button("Reset all filters").clicked() {
                state.reset_filters();
            }

            ui.separator();
            ui.strong("By region");
            region_table(ui, state);
        });
}

/// One collapsible checkbox group with a toggle-all button.
fn filter_group(ui: &mut Ui, state: &mut AppState, group: FilterGroup) {
    let entries = state.choices.entries(group);
    let n_checked = entries.iter().filter(|(_, _, on)| *on).count();
    let header_text = format!("{}  ({n_checked}/{})", group.title(), entries.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(group.title())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Toggle all").clicked() {
                state.toggle_all(group);
            }
            for (code, label, checked) in entries {
                let mut on = checked;
                if ui.checkbox(&mut on, label).changed() {
                    state.set_choice(group, code, on);
                }
            }
        });
}

/// Median completion and school count per region over the filtered set.
fn region_table(ui: &mut Ui, state: &AppState) {
    let rows = state.coordinator.regions();
    if rows.is_empty() {
        ui.weak("No data to display.");
        return;
    }
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::remainder().at_least(100.0))
        .column(Column::auto())
        .column(Column::auto())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Region");
            });
            header.col(|ui| {
                ui.strong("Completion");
            });
            header.col(|ui| {
                ui.strong("Schools");
            });
        })
        .body(|mut body| {
            for row in rows {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(&row.label);
                    });
                    table_row.col(|ui| {
                        ui.label(Metric::Completion.format(row.median));
                    });
                    table_row.col(|ui| {
                        ui.label(row.count.to_string());
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu and the filter summary.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                ui.close_menu();
                if let Some(path) = pick_dataset() {
                    state.open_dataset(ui.ctx(), path);
                }
            }
            if ui.button("Open boundaries…").clicked() {
                ui.close_menu();
                if let Some(path) = pick_boundaries() {
                    state.open_boundaries(ui.ctx(), path);
                }
            }
        });

        ui.separator();

        match state.coordinator.status() {
            LoadStatus::Loading => {
                ui.spinner();
                ui.label("Loading data…");
            }
            LoadStatus::Failed(msg) => {
                ui.label(RichText::new("Error loading data.").color(Color32::RED))
                    .on_hover_text(msg);
            }
            LoadStatus::Ready => {
                if let Some(summary) = state.coordinator.summary() {
                    ui.label(summary.count_text());
                    ui.separator();
                    ui.label(RichText::new(&summary.selection).weak());
                }
                if state.coordinator.is_updating() {
                    ui.separator();
                    ui.label(RichText::new("Updating…").italics());
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn pick_dataset() -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open institution data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file()
}

fn pick_boundaries() -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open state boundaries")
        .add_filter("TopoJSON / GeoJSON", &["json", "topojson", "geojson"])
        .pick_file()
}
