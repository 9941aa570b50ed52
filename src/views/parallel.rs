use std::collections::BTreeSet;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, Ui};

use super::{
    emphasis, gradient_legend, placeholder, point_positions, Feed, Scale, SelectionMessage,
    ViewAdapter, ViewInput, ViewKind,
};
use crate::color::{ColorScale, MISSING};
use crate::data::model::{Record, RecordIndex};
use crate::data::schema::Metric;
use crate::selection::Brush;
use crate::stats::extent;

const HEIGHT: f32 = 360.0;
const MARGIN_X: f32 = 16.0;
const MARGIN_TOP: f32 = 28.0;
const MARGIN_BOTTOM: f32 = 52.0;
const AXIS_PADDING: f32 = 0.2;
/// How close (px) a drag must start to an axis to brush it.
const AXIS_GRAB: f32 = 10.0;
/// Drags shorter than this (px) count as a click and clear the brush.
const MIN_DRAG: f32 = 3.0;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Polyline {
    index: RecordIndex,
    values: Vec<Option<f64>>,
    color: Color32,
    emphasis: Option<bool>,
}

#[derive(Debug, Clone, Default)]
struct ParallelEncoding {
    scales: Vec<Option<Scale>>,
    lines: Vec<Polyline>,
    colors: Option<ColorScale>,
}

impl ParallelEncoding {
    fn build(records: &[&Record], axes: &[Metric], color_by: Metric, brush: &Brush) -> Self {
        let scales = axes
            .iter()
            .map(|m| extent(records, *m).map(Scale::from_extent))
            .collect();
        let colors = extent(records, color_by).map(ColorScale::viridis);
        let lines = records
            .iter()
            .map(|r| Polyline {
                index: r.index,
                values: axes.iter().map(|m| r.metric(*m)).collect(),
                color: colors
                    .as_ref()
                    .map_or(MISSING, |c| c.color_or_missing(r.metric(color_by))),
                emphasis: emphasis(brush, r),
            })
            .collect();
        Self {
            scales,
            lines,
            colors,
        }
    }

    /// Runs of consecutive axes where the line has a value, as
    /// `(axis, unit position)`. Absent values break the line.
    fn segments(&self, line: &Polyline) -> Vec<Vec<(usize, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for (axis, value) in line.values.iter().enumerate() {
            match (value, self.scales[axis]) {
                (Some(v), Some(scale)) => current.push((axis, scale.unit(*v))),
                _ => {
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// Brush `axis` between two unit positions (order irrelevant).
    fn brush_between(&self, axis: usize, t0: f64, t1: f64) -> Option<AxisBrush> {
        let scale = self.scales.get(axis).copied().flatten()?;
        let lo = scale.invert(t0.min(t1));
        let hi = scale.invert(t0.max(t1));
        let selected = self
            .lines
            .iter()
            .filter(|l| l.values[axis].is_some_and(|v| v >= lo && v <= hi))
            .map(|l| l.index)
            .collect();
        Some(AxisBrush {
            axis,
            lo,
            hi,
            selected,
        })
    }
}

// ---------------------------------------------------------------------------
// Brush state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct AxisGesture {
    axis: usize,
    start_y: f32,
    current_y: f32,
}

/// A finished brush on one axis, in axis units.
#[derive(Debug, Clone, PartialEq)]
struct AxisBrush {
    axis: usize,
    lo: f64,
    hi: f64,
    selected: BTreeSet<RecordIndex>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// One polyline per filtered institution across the configured axes.
pub struct ParallelCoords {
    axes: Vec<Metric>,
    color_by: Metric,
    encoding: ParallelEncoding,
    gesture: Option<AxisGesture>,
    /// This view's brush while it is still the active selection.
    active: Option<AxisBrush>,
}

impl ParallelCoords {
    pub fn new(axes: &[Metric], color_by: Metric) -> Self {
        Self {
            axes: axes.to_vec(),
            color_by,
            encoding: ParallelEncoding::default(),
            gesture: None,
            active: None,
        }
    }

    fn message(&self, brush: Brush) -> SelectionMessage {
        SelectionMessage {
            source: ViewKind::ParallelCoordinates,
            brush,
        }
    }

    fn interact(
        &mut self,
        response: &Response,
        plot: Rect,
        xs: &[f32],
    ) -> Option<SelectionMessage> {
        let clamp_y = |y: f32| y.clamp(plot.top(), plot.bottom());
        let pointer = response.interact_pointer_pos();

        if response.drag_started() {
            self.gesture = pointer.and_then(|pos| {
                nearest_axis(xs, pos.x).map(|axis| AxisGesture {
                    axis,
                    start_y: clamp_y(pos.y),
                    current_y: clamp_y(pos.y),
                })
            });
        }
        if let (Some(gesture), Some(pos)) = (self.gesture.as_mut(), pointer) {
            if response.dragged() {
                gesture.current_y = clamp_y(pos.y);
            }
        }
        if response.drag_stopped() {
            let gesture = self.gesture.take()?;
            if (gesture.start_y - gesture.current_y).abs() < MIN_DRAG {
                self.active = None;
                return Some(self.message(Brush::None));
            }
            let to_unit = |y: f32| ((plot.bottom() - y) / plot.height()) as f64;
            let brush = self.encoding.brush_between(
                gesture.axis,
                to_unit(gesture.start_y),
                to_unit(gesture.current_y),
            )?;
            log::debug!(
                "brushed {} on [{}, {}]: {} records",
                self.axes[brush.axis],
                brush.lo,
                brush.hi,
                brush.selected.len()
            );
            let selected = brush.selected.clone();
            self.active = Some(brush);
            return Some(self.message(Brush::Indices(selected)));
        }
        if response.clicked() && pointer.is_some_and(|pos| nearest_axis(xs, pos.x).is_some()) {
            self.active = None;
            return Some(self.message(Brush::None));
        }
        None
    }

    fn paint(&self, ui: &Ui, painter: &egui::Painter, plot: Rect, xs: &[f32]) {
        let to_y = |t: f64| plot.bottom() - t as f32 * plot.height();
        let text_color = ui.visuals().text_color();

        // Faded lines first so emphasised ones stay on top.
        for emphasised in [false, true] {
            for line in &self.encoding.lines {
                if (line.emphasis == Some(true)) != emphasised {
                    continue;
                }
                let (width, alpha) = if emphasised { (1.5, 0.85) } else { (0.8, 0.15) };
                let stroke = Stroke::new(width, line.color.gamma_multiply(alpha));
                for run in self.encoding.segments(line) {
                    if run.len() < 2 {
                        continue;
                    }
                    let points = run
                        .iter()
                        .map(|(axis, t)| Pos2::new(xs[*axis], to_y(*t)))
                        .collect();
                    painter.add(Shape::line(points, stroke));
                }
            }
        }

        let axis_stroke = Stroke::new(1.0, text_color.gamma_multiply(0.5));
        let small = FontId::proportional(9.0);
        for (axis, metric) in self.axes.iter().enumerate() {
            let x = xs[axis];
            painter.line_segment(
                [Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())],
                axis_stroke,
            );
            painter.text(
                Pos2::new(x, plot.top() - 8.0),
                Align2::CENTER_BOTTOM,
                metric.short_label(),
                FontId::proportional(12.0),
                text_color,
            );
            if let Some(scale) = self.encoding.scales[axis] {
                let (lo, hi) = scale.domain();
                painter.text(
                    Pos2::new(x + 3.0, plot.top()),
                    Align2::LEFT_TOP,
                    metric.format(hi),
                    small.clone(),
                    text_color,
                );
                painter.text(
                    Pos2::new(x + 3.0, plot.bottom()),
                    Align2::LEFT_BOTTOM,
                    metric.format(lo),
                    small.clone(),
                    text_color,
                );
            }
        }

        let brush_fill = text_color.gamma_multiply(0.15);
        if let Some(active) = &self.active {
            if let Some(scale) = self.encoding.scales[active.axis] {
                let top = to_y(scale.unit(active.hi));
                let bottom = to_y(scale.unit(active.lo));
                let x = xs[active.axis];
                let band = Rect::from_x_y_ranges((x - 8.0)..=(x + 8.0), top..=bottom);
                painter.rect_filled(band, 2.0, brush_fill);
            }
        }
        if let Some(gesture) = &self.gesture {
            let x = xs[gesture.axis];
            let rect = Rect::from_two_pos(
                Pos2::new(x - 8.0, gesture.start_y),
                Pos2::new(x + 8.0, gesture.current_y),
            );
            painter.rect_filled(rect, 2.0, brush_fill);
        }

        if let Some(colors) = &self.encoding.colors {
            let (lo, hi) = colors.domain();
            let bar = Rect::from_min_size(
                Pos2::new(plot.left(), plot.bottom() + 24.0),
                egui::vec2(120.0, 8.0),
            );
            gradient_legend(
                painter,
                bar,
                |t| colors.at(t),
                &self.color_by.format(lo),
                &self.color_by.format(hi),
                text_color,
            );
            painter.text(
                bar.right_center() + egui::vec2(8.0, 0.0),
                Align2::LEFT_CENTER,
                self.color_by.short_label(),
                FontId::proportional(11.0),
                text_color,
            );
        }
    }
}

/// Index of the axis within grabbing distance of `x`.
fn nearest_axis(xs: &[f32], x: f32) -> Option<usize> {
    xs.iter()
        .enumerate()
        .map(|(i, ax)| (i, (ax - x).abs()))
        .filter(|(_, d)| *d <= AXIS_GRAB)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

impl ViewAdapter for ParallelCoords {
    fn kind(&self) -> ViewKind {
        ViewKind::ParallelCoordinates
    }

    fn feed(&self) -> Feed {
        Feed::Filtered
    }

    fn update(&mut self, input: &ViewInput<'_>) {
        self.encoding =
            ParallelEncoding::build(input.records, &self.axes, self.color_by, input.brush);
        let still_active = matches!(
            (&self.active, input.brush),
            (Some(active), Brush::Indices(set)) if active.selected == *set
        );
        if !still_active {
            self.active = None;
        }
    }

    fn record_count(&self) -> usize {
        self.encoding.lines.len()
    }

    fn show(&mut self, ui: &mut Ui) -> Option<SelectionMessage> {
        if self.encoding.lines.is_empty() {
            placeholder(ui, "No data to display.", HEIGHT);
            return None;
        }
        let (response, painter) =
            ui.allocate_painter(egui::vec2(ui.available_width(), HEIGHT), Sense::click_and_drag());
        let plot = Rect::from_min_max(
            response.rect.min + egui::vec2(MARGIN_X, MARGIN_TOP),
            response.rect.max - egui::vec2(MARGIN_X, MARGIN_BOTTOM),
        );
        let xs = point_positions(self.axes.len(), plot.left(), plot.right(), AXIS_PADDING);
        let message = self.interact(&response, plot, &xs);
        self.paint(ui, &painter, plot, &xs);
        message
    }
}
