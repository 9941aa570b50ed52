use std::collections::BTreeSet;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Response, Sense, Stroke, Ui};

use super::{emphasis, placeholder, Feed, Scale, SelectionMessage, ViewAdapter, ViewInput, ViewKind};
use crate::color::{ColorScale, MISSING};
use crate::data::model::{Record, RecordIndex};
use crate::data::schema::Metric;
use crate::selection::Brush;
use crate::stats::extent;

const LABEL_MARGIN: f32 = 56.0;
const MAX_CELL: f32 = 110.0;
const MIN_CELL: f32 = 44.0;
const CELL_GAP: f32 = 4.0;
const INSET: f32 = 2.0;
const POINT_RADIUS: f32 = 2.0;
const HOVER_DISTANCE: f32 = 5.0;
const MIN_DRAG: f32 = 3.0;

#[derive(Debug, Clone)]
struct Point {
    index: RecordIndex,
    name: String,
    values: Vec<Option<f64>>,
    color: Color32,
    emphasis: Option<bool>,
}

/// A finished rectangle brush inside one cell, in data units.
#[derive(Debug, Clone, PartialEq)]
struct CellBrush {
    row: usize,
    col: usize,
    x: (f64, f64),
    y: (f64, f64),
    selected: BTreeSet<RecordIndex>,
}

#[derive(Debug, Clone, Copy)]
struct CellGesture {
    row: usize,
    col: usize,
    start: Pos2,
    current: Pos2,
}

/// Geometry of the matrix for the current frame.
#[derive(Debug, Clone, Copy)]
struct Layout {
    origin: Pos2,
    cell: f32,
    n: usize,
}

impl Layout {
    fn cell_rect(&self, row: usize, col: usize) -> Rect {
        let min = self.origin + egui::vec2(col as f32 * self.cell, row as f32 * self.cell);
        Rect::from_min_size(min, egui::vec2(self.cell - CELL_GAP, self.cell - CELL_GAP))
    }

    fn cell_at(&self, pos: Pos2) -> Option<(usize, usize)> {
        let rel = pos - self.origin;
        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }
        let col = (rel.x / self.cell) as usize;
        let row = (rel.y / self.cell) as usize;
        (row < self.n && col < self.n).then_some((row, col))
    }
}

/// Plot area inside a cell.
fn inner(cell: Rect) -> Rect {
    cell.shrink(INSET)
}

fn to_screen(cell: Rect, tx: f64, ty: f64) -> Pos2 {
    let r = inner(cell);
    Pos2::new(r.left() + tx as f32 * r.width(), r.bottom() - ty as f32 * r.height())
}

fn to_unit(cell: Rect, pos: Pos2) -> (f64, f64) {
    let r = inner(cell);
    (
        ((pos.x - r.left()) / r.width()) as f64,
        ((r.bottom() - pos.y) / r.height()) as f64,
    )
}

/// n × n grid of pairwise scatterplots over the displayed institutions.
pub struct ScatterMatrix {
    dims: Vec<Metric>,
    color_by: Metric,
    points: Vec<Point>,
    scales: Vec<Option<Scale>>,
    gesture: Option<CellGesture>,
    active: Option<CellBrush>,
}

impl ScatterMatrix {
    pub fn new(dims: &[Metric], color_by: Metric) -> Self {
        Self {
            dims: dims.to_vec(),
            color_by,
            points: Vec::new(),
            scales: Vec::new(),
            gesture: None,
            active: None,
        }
    }

    /// Records inside the unit-space rectangle of cell (`row`, `col`).
    /// Rows plot `dims[row]` on y, columns plot `dims[col]` on x.
    fn brush_cell(
        &self,
        row: usize,
        col: usize,
        a: (f64, f64),
        b: (f64, f64),
    ) -> Option<CellBrush> {
        let xs = self.scales.get(col).copied().flatten()?;
        let ys = self.scales.get(row).copied().flatten()?;
        let x = (xs.invert(a.0.min(b.0)), xs.invert(a.0.max(b.0)));
        let y = (ys.invert(a.1.min(b.1)), ys.invert(a.1.max(b.1)));
        let selected = self
            .points
            .iter()
            .filter(|p| match (p.values[col], p.values[row]) {
                (Some(vx), Some(vy)) => vx >= x.0 && vx <= x.1 && vy >= y.0 && vy <= y.1,
                _ => false,
            })
            .map(|p| p.index)
            .collect();
        Some(CellBrush {
            row,
            col,
            x,
            y,
            selected,
        })
    }

    /// Points of cell (`row`, `col`) in unit space; records missing either value are left out.
    fn cell_points(&self, row: usize, col: usize) -> impl Iterator<Item = (&Point, f64, f64)> + '_ {
        let xs = self.scales.get(col).copied().flatten();
        let ys = self.scales.get(row).copied().flatten();
        self.points.iter().filter_map(move |p| {
            let (sx, sy) = (xs?, ys?);
            Some((p, sx.unit(p.values[col]?), sy.unit(p.values[row]?)))
        })
    }

    fn message(&self, brush: Brush) -> SelectionMessage {
        SelectionMessage {
            source: ViewKind::ScatterMatrix,
            brush,
        }
    }

    fn interact(&mut self, response: &Response, layout: Layout) -> Option<SelectionMessage> {
        let pointer = response.interact_pointer_pos();

        if response.drag_started() {
            self.gesture = pointer.and_then(|pos| {
                layout.cell_at(pos).map(|(row, col)| CellGesture {
                    row,
                    col,
                    start: pos,
                    current: pos,
                })
            });
        }
        if let (Some(gesture), Some(pos)) = (self.gesture.as_mut(), pointer) {
            if response.dragged() {
                gesture.current = pos.clamp(
                    inner(layout.cell_rect(gesture.row, gesture.col)).min,
                    inner(layout.cell_rect(gesture.row, gesture.col)).max,
                );
            }
        }
        if response.drag_stopped() {
            let g = self.gesture.take()?;
            if (g.start - g.current).length() < MIN_DRAG {
                self.active = None;
                return Some(self.message(Brush::None));
            }
            let cell = layout.cell_rect(g.row, g.col);
            let (a, b) = (to_unit(cell, g.start), to_unit(cell, g.current));
            let brush = self.brush_cell(g.row, g.col, a, b)?;
            log::debug!(
                "brushed {} × {}: {} records",
                self.dims[brush.col],
                self.dims[brush.row],
                brush.selected.len()
            );
            let selected = brush.selected.clone();
            self.active = Some(brush);
            return Some(self.message(Brush::Indices(selected)));
        }
        if response.clicked() && pointer.and_then(|pos| layout.cell_at(pos)).is_some() {
            self.active = None;
            return Some(self.message(Brush::None));
        }
        None
    }

    fn paint(&self, ui: &Ui, painter: &egui::Painter, layout: Layout) {
        let text_color = ui.visuals().text_color();
        let frame = ui.visuals().faint_bg_color;
        let label_font = FontId::proportional(11.0);

        for row in 0..layout.n {
            for col in 0..layout.n {
                let cell = layout.cell_rect(row, col);
                painter.rect_filled(cell, 2.0, frame);
                for (p, tx, ty) in self.cell_points(row, col) {
                    let (alpha, outline) = match p.emphasis {
                        None => (0.5, None),
                        Some(true) => (0.9, Some(Stroke::new(0.5, Color32::from_gray(0x33)))),
                        Some(false) => (0.12, None),
                    };
                    let center = to_screen(cell, tx, ty);
                    let fill = p.color.gamma_multiply(alpha);
                    match outline {
                        Some(stroke) => painter.circle(center, POINT_RADIUS, fill, stroke),
                        None => painter.circle_filled(center, POINT_RADIUS, fill),
                    };
                }
            }
        }

        for (i, metric) in self.dims.iter().enumerate() {
            let top = layout.cell_rect(0, i);
            painter.text(
                top.center_top() - egui::vec2(0.0, 6.0),
                Align2::CENTER_BOTTOM,
                metric.short_label(),
                label_font.clone(),
                text_color,
            );
            let left = layout.cell_rect(i, 0);
            painter.text(
                left.left_center() - egui::vec2(6.0, 0.0),
                Align2::RIGHT_CENTER,
                metric.short_label(),
                label_font.clone(),
                text_color,
            );
        }

        let brush_fill = text_color.gamma_multiply(0.15);
        if let Some(active) = &self.active {
            if let (Some(xs), Some(ys)) = (self.scales[active.col], self.scales[active.row]) {
                let cell = layout.cell_rect(active.row, active.col);
                let a = to_screen(cell, xs.unit(active.x.0), ys.unit(active.y.0));
                let b = to_screen(cell, xs.unit(active.x.1), ys.unit(active.y.1));
                painter.rect_filled(Rect::from_two_pos(a, b), 0.0, brush_fill);
            }
        }
        if let Some(g) = &self.gesture {
            painter.rect_filled(Rect::from_two_pos(g.start, g.current), 0.0, brush_fill);
        }
    }

    fn hovered(&self, layout: Layout, pos: Pos2) -> Option<String> {
        let (row, col) = layout.cell_at(pos)?;
        let cell = layout.cell_rect(row, col);
        let (p, _, _) = self
            .cell_points(row, col)
            .map(|(p, tx, ty)| (p, tx, ty, to_screen(cell, tx, ty).distance(pos)))
            .filter(|(.., d)| *d <= HOVER_DISTANCE)
            .min_by(|a, b| a.3.total_cmp(&b.3))
            .map(|(p, tx, ty, _)| (p, tx, ty))?;
        let (xm, ym) = (self.dims[col], self.dims[row]);
        let fmt = |m: Metric, v: Option<f64>| v.map_or_else(|| "—".to_string(), |v| m.format(v));
        Some(format!(
            "{}\n{}: {}\n{}: {}",
            p.name,
            xm.short_label(),
            fmt(xm, p.values[col]),
            ym.short_label(),
            fmt(ym, p.values[row]),
        ))
    }
}

impl ViewAdapter for ScatterMatrix {
    fn kind(&self) -> ViewKind {
        ViewKind::ScatterMatrix
    }

    fn feed(&self) -> Feed {
        Feed::Displayed
    }

    fn update(&mut self, input: &ViewInput<'_>) {
        let records = input.records;
        self.scales = self
            .dims
            .iter()
            .map(|m| extent(records, *m).map(Scale::from_extent))
            .collect();
        let colors = extent(records, self.color_by).map(ColorScale::viridis);
        self.points = records
            .iter()
            .map(|r| Point {
                index: r.index,
                name: r.display_name(),
                values: self.dims.iter().map(|m| r.metric(*m)).collect(),
                color: colors
                    .as_ref()
                    .map_or(MISSING, |c| c.color_or_missing(r.metric(self.color_by))),
                emphasis: emphasis(input.brush, r),
            })
            .collect();
        let still_active = matches!(
            (&self.active, input.brush),
            (Some(active), Brush::Indices(set)) if active.selected == *set
        );
        if !still_active {
            self.active = None;
        }
    }

    fn record_count(&self) -> usize {
        self.points.len()
    }

    fn show(&mut self, ui: &mut Ui) -> Option<SelectionMessage> {
        let n = self.dims.len();
        if self.points.is_empty() || n == 0 {
            placeholder(ui, "No data to display.", 200.0);
            return None;
        }
        let cell = ((ui.available_width() - LABEL_MARGIN) / n as f32).clamp(MIN_CELL, MAX_CELL);
        let size = egui::vec2(LABEL_MARGIN + cell * n as f32, LABEL_MARGIN * 0.5 + cell * n as f32);
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let layout = Layout {
            origin: response.rect.min + egui::vec2(LABEL_MARGIN, LABEL_MARGIN * 0.5),
            cell,
            n,
        };
        let message = self.interact(&response, layout);
        self.paint(ui, &painter, layout);
        if self.gesture.is_none() {
            if let Some(text) = response.hover_pos().and_then(|pos| self.hovered(layout, pos)) {
                response.on_hover_text_at_pointer(text);
            }
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::GeoStatus;

    const DIMS: [Metric; 2] = [Metric::Cost, Metric::Earnings];

    fn rec(i: usize, cost: Option<f64>, earnings: Option<f64>) -> Record {
        Record::empty(RecordIndex(i))
            .with_metric(Metric::Cost, cost)
            .with_metric(Metric::Earnings, earnings)
    }

    fn matrix(records: &[Record], brush: &Brush) -> ScatterMatrix {
        let refs: Vec<&Record> = records.iter().collect();
        let mut m = ScatterMatrix::new(&DIMS, Metric::Completion);
        m.update(&ViewInput {
            records: &refs,
            brush,
            geography: &GeoStatus::Loading,
        });
        m
    }

    fn data() -> Vec<Record> {
        vec![
            rec(0, Some(10_000.0), Some(30_000.0)),
            rec(1, Some(20_000.0), Some(50_000.0)),
            rec(2, Some(30_000.0), None),
            rec(3, Some(40_000.0), Some(70_000.0)),
        ]
    }

    #[test]
    fn points_missing_a_value_are_left_out_of_that_cell() {
        let m = matrix(&data(), &Brush::None);
        assert_eq!(m.record_count(), 4);
        // Row 1 (earnings on y) × col 0 (cost on x): record 2 has no earnings.
        let ids: Vec<usize> = m.cell_points(1, 0).map(|(p, ..)| p.index.0).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        // Diagonal cost × cost keeps everyone with a cost.
        assert_eq!(m.cell_points(0, 0).count(), 4);
    }

    #[test]
    fn rectangle_brush_needs_both_dimensions_in_range() {
        let m = matrix(&data(), &Brush::None);
        // Cost in [10k, 25k] (x), earnings in [30k, 70k] (y, full range).
        let b = m.brush_cell(1, 0, (0.0, 0.0), (0.5, 1.0)).unwrap();
        assert_eq!(b.x, (10_000.0, 25_000.0));
        let expected: BTreeSet<RecordIndex> = [RecordIndex(0), RecordIndex(1)].into();
        assert_eq!(b.selected, expected);
    }

    #[test]
    fn full_cell_brush_keeps_the_extremes() {
        let data = vec![rec(0, Some(0.339), Some(0.868)), rec(1, Some(0.868), Some(0.339))];
        let m = matrix(&data, &Brush::None);
        let b = m.brush_cell(1, 0, (0.0, 0.0), (1.0, 1.0)).unwrap();
        assert_eq!(b.x, (0.339, 0.868));
        assert_eq!(b.y, (0.339, 0.868));
        assert_eq!(b.selected.len(), 2);
    }

    #[test]
    fn layout_hit_testing() {
        let layout = Layout {
            origin: Pos2::new(100.0, 50.0),
            cell: 50.0,
            n: 2,
        };
        assert_eq!(layout.cell_at(Pos2::new(120.0, 60.0)), Some((0, 0)));
        assert_eq!(layout.cell_at(Pos2::new(160.0, 110.0)), Some((1, 1)));
        assert_eq!(layout.cell_at(Pos2::new(90.0, 60.0)), None);
        assert_eq!(layout.cell_at(Pos2::new(205.0, 60.0)), None);
        let cell = layout.cell_rect(0, 0);
        let (tx, ty) = to_unit(cell, to_screen(cell, 0.25, 0.75));
        assert!((tx - 0.25).abs() < 1e-5 && (ty - 0.75).abs() < 1e-5);
    }

    #[test]
    fn empty_input_and_emphasis() {
        let empty = matrix(&[], &Brush::None);
        assert_eq!(empty.record_count(), 0);
        assert!(empty.brush_cell(0, 0, (0.0, 0.0), (1.0, 1.0)).is_none());

        let brushed = matrix(&data(), &Brush::Indices([RecordIndex(3)].into()));
        let marks: Vec<Option<bool>> = brushed.points.iter().map(|p| p.emphasis).collect();
        assert_eq!(marks, vec![Some(false), Some(false), Some(false), Some(true)]);
    }
}
