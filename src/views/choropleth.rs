use std::collections::BTreeMap;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke, Ui};
use egui_plot::{Plot, PlotPoints, Polygon};

use super::{gradient_legend, placeholder, Feed, SelectionMessage, ViewAdapter, ViewInput, ViewKind};
use crate::color::{ColorScale, NO_DATA};
use crate::coordinator::GeoStatus;
use crate::data::schema::{state_abbreviation, Metric};
use crate::stats::{state_medians, GroupStat};

const HEIGHT: f32 = 340.0;
const LEGEND_WIDTH: f32 = 140.0;

/// Per-state median of one metric over the filtered institutions.
pub struct Choropleth {
    metric: Metric,
    stats: BTreeMap<u32, GroupStat>,
    colors: Option<ColorScale>,
    geography: GeoStatus,
    count: usize,
}

impl Choropleth {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            stats: BTreeMap::new(),
            colors: None,
            geography: GeoStatus::Loading,
            count: 0,
        }
    }

    fn fill(&self, fips: u32) -> Color32 {
        match (self.stats.get(&fips), &self.colors) {
            (Some(stat), Some(colors)) => colors.color_for(stat.median),
            _ => NO_DATA,
        }
    }

    /// Tooltip text for one state.
    fn describe_state(&self, fips: u32) -> String {
        let name =
            state_abbreviation(fips).map_or_else(|| format!("FIPS {fips:02}"), str::to_string);
        match self.stats.get(&fips) {
            Some(stat) => format!(
                "{name}\nMedian {}: {} ({} school{})",
                self.metric.short_label().to_lowercase(),
                self.metric.format(stat.median),
                stat.count,
                if stat.count == 1 { "" } else { "s" },
            ),
            None => format!("{name}\nNo data"),
        }
    }
}

impl ViewAdapter for Choropleth {
    fn kind(&self) -> ViewKind {
        ViewKind::Map
    }

    fn feed(&self) -> Feed {
        Feed::Filtered
    }

    fn update(&mut self, input: &ViewInput<'_>) {
        self.count = input.records.len();
        self.stats = state_medians(input.records, self.metric);
        self.colors = self
            .stats
            .values()
            .map(|s| s.median)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .map(ColorScale::viridis);
        self.geography = input.geography.clone();
        log::trace!("map: {} states with data", self.stats.len());
    }

    fn record_count(&self) -> usize {
        self.count
    }

    fn show(&mut self, ui: &mut Ui) -> Option<SelectionMessage> {
        let boundaries = match &self.geography {
            GeoStatus::Loading => {
                placeholder(ui, "Loading map…", HEIGHT);
                return None;
            }
            GeoStatus::Unavailable(reason) => {
                placeholder(ui, "Map unavailable.", HEIGHT).on_hover_text(reason.as_str());
                return None;
            }
            GeoStatus::Ready(boundaries) => boundaries.clone(),
        };
        if self.count == 0 {
            placeholder(ui, "No data to display.", HEIGHT);
            return None;
        }

        let outline = Stroke::new(0.5, Color32::WHITE);
        // TODO: triangulate concave state outlines before filling; egui_plot only fills
        // convex polygons correctly.
        let response = Plot::new("choropleth")
            .height(HEIGHT)
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .show(ui, |plot_ui| {
                for (fips, rings) in boundaries.iter() {
                    let fill = self.fill(fips);
                    for ring in rings {
                        let polygon = Polygon::new(PlotPoints::new(ring.clone()))
                            .fill_color(fill)
                            .stroke(outline);
                        plot_ui.polygon(polygon);
                    }
                }
                plot_ui
                    .pointer_coordinate()
                    .and_then(|p| boundaries.state_at([p.x, p.y]))
            });

        if let Some(fips) = response.inner {
            response.response.on_hover_text_at_pointer(self.describe_state(fips));
        }

        if let Some(colors) = &self.colors {
            let (lo, hi) = colors.domain();
            let text_color = ui.visuals().text_color();
            let (rect, _) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), 30.0),
                egui::Sense::hover(),
            );
            let bar = Rect::from_min_size(
                rect.min + egui::vec2(4.0, 2.0),
                egui::vec2(LEGEND_WIDTH, 8.0),
            );
            let painter = ui.painter();
            gradient_legend(
                painter,
                bar,
                |t| colors.at(t),
                &self.metric.format(lo),
                &self.metric.format(hi),
                text_color,
            );
            painter.text(
                Pos2::new(bar.right() + 8.0, bar.center().y),
                Align2::LEFT_CENTER,
                format!("{} (low → high)", self.metric),
                FontId::proportional(11.0),
                text_color,
            );
        }
        None
    }
}
