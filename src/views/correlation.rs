use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Ui};

use super::{gradient_legend, placeholder, Feed, SelectionMessage, ViewAdapter, ViewInput, ViewKind};
use crate::color::ColorScale;
use crate::data::schema::Metric;
use crate::stats::correlation_matrix;

const LABEL_MARGIN: f32 = 72.0;
const MAX_CELL: f32 = 64.0;
const MIN_CELL: f32 = 28.0;

/// Pearson correlation heatmap over the displayed institutions.
pub struct CorrelationView {
    columns: Vec<Metric>,
    matrix: Vec<Vec<f64>>,
    count: usize,
    colors: ColorScale,
}

impl CorrelationView {
    pub fn new(columns: &[Metric]) -> Self {
        let n = columns.len();
        Self {
            columns: columns.to_vec(),
            matrix: vec![vec![0.0; n]; n],
            count: 0,
            // r = 1 is red, r = -1 is blue.
            colors: ColorScale::red_blue((1.0, -1.0)),
        }
    }

    /// Screen row `i` shows matrix row `n - 1 - i`, so the diagonal runs bottom-left to top-right.
    fn matrix_row(&self, screen_row: usize) -> usize {
        self.columns.len() - 1 - screen_row
    }

    fn describe(&self, row: usize, col: usize) -> String {
        format!(
            "{} vs {}, r = {:.3}",
            self.columns[row], self.columns[col], self.matrix[row][col]
        )
    }

    fn color_of(&self, r: f64) -> Color32 {
        self.colors.color_for(r)
    }
}

/// Readable label colour over a cell fill.
fn contrast(fill: Color32) -> Color32 {
    let [r, g, b, _] = fill.to_array();
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 140.0 {
        Color32::from_gray(0x22)
    } else {
        Color32::WHITE
    }
}

impl ViewAdapter for CorrelationView {
    fn kind(&self) -> ViewKind {
        ViewKind::CorrelationMatrix
    }

    fn feed(&self) -> Feed {
        Feed::Displayed
    }

    fn update(&mut self, input: &ViewInput<'_>) {
        self.count = input.records.len();
        self.matrix = correlation_matrix(input.records, &self.columns);
    }

    fn record_count(&self) -> usize {
        self.count
    }

    fn show(&mut self, ui: &mut Ui) -> Option<SelectionMessage> {
        let n = self.columns.len();
        if self.count == 0 || n == 0 {
            placeholder(ui, "No data to display.", 200.0);
            return None;
        }
        let cell = ((ui.available_width() - LABEL_MARGIN) / n as f32).clamp(MIN_CELL, MAX_CELL);
        let grid = cell * n as f32;
        let size = egui::vec2(LABEL_MARGIN + grid, LABEL_MARGIN + grid + 28.0);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let origin = response.rect.min + egui::vec2(LABEL_MARGIN, 0.0);
        let text_color = ui.visuals().text_color();
        let cell_rect = |screen_row: usize, col: usize| {
            Rect::from_min_size(
                origin + egui::vec2(col as f32 * cell, screen_row as f32 * cell),
                egui::vec2(cell - 1.0, cell - 1.0),
            )
        };

        let value_font = FontId::proportional((cell * 0.28).clamp(8.0, 12.0));
        for screen_row in 0..n {
            let row = self.matrix_row(screen_row);
            for col in 0..n {
                let r = self.matrix[row][col];
                let rect = cell_rect(screen_row, col);
                let fill = self.color_of(r);
                painter.rect_filled(rect, 0.0, fill);
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    format!("{r:.2}"),
                    value_font.clone(),
                    contrast(fill),
                );
            }
            let left = cell_rect(screen_row, 0);
            painter.text(
                left.left_center() - egui::vec2(6.0, 0.0),
                Align2::RIGHT_CENTER,
                self.columns[row].short_label(),
                FontId::proportional(11.0),
                text_color,
            );
        }
        let grid_bottom = origin.y + grid;
        for (col, metric) in self.columns.iter().enumerate() {
            let x = origin.x + (col as f32 + 0.5) * cell;
            painter.text(
                Pos2::new(x, grid_bottom + 4.0),
                Align2::CENTER_TOP,
                metric.short_label(),
                FontId::proportional(10.0),
                text_color,
            );
        }

        let bar = Rect::from_min_size(
            Pos2::new(origin.x, grid_bottom + 28.0),
            egui::vec2(140.0, 8.0),
        );
        gradient_legend(&painter, bar, |t| self.color_of(-1.0 + 2.0 * t), "-1", "1", text_color);
        painter.text(
            bar.right_center() + egui::vec2(8.0, 0.0),
            Align2::LEFT_CENTER,
            "Correlation r",
            FontId::proportional(11.0),
            text_color,
        );

        let hovered = response.hover_pos().and_then(|pos| {
            let rel = pos - origin;
            if rel.x < 0.0 || rel.y < 0.0 {
                return None;
            }
            let (screen_row, col) = ((rel.y / cell) as usize, (rel.x / cell) as usize);
            (screen_row < n && col < n).then(|| (self.matrix_row(screen_row), col))
        });
        if let Some((row, col)) = hovered {
            response.on_hover_text_at_pointer(self.describe(row, col));
        }
        None
    }
}
