//! Render adapters: the four linked views.
//!
//! ```text
//!   SelectionState ──► ViewCoordinator::refresh
//!                          │  (fixed order)
//!          ┌───────────────┼───────────────┬───────────────┐
//!          ▼               ▼               ▼               ▼
//!     parallel        choropleth      correlation       scatter
//!   (filtered set)  (filtered set)  (displayed set)  (displayed set)
//!          │                                               │
//!          └──── SelectionMessage (brush) ─────────────────┘
//!                          ▼
//!                ViewCoordinator::handle_message
//! ```
//!
//! `update` turns records into an encoding held by the adapter; `show`
//! paints that encoding every frame and reports at most one brush gesture.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Ui};

use crate::coordinator::GeoStatus;
use crate::data::model::Record;
use crate::selection::Brush;

pub mod choropleth;
pub mod correlation;
pub mod parallel;
pub mod scatter;

pub use choropleth::Choropleth;
pub use correlation::CorrelationView;
pub use parallel::ParallelCoords;
pub use scatter::ScatterMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    ParallelCoordinates,
    Map,
    CorrelationMatrix,
    ScatterMatrix,
}

impl ViewKind {
    pub fn title(self) -> &'static str {
        match self {
            ViewKind::ParallelCoordinates => "Parallel coordinates",
            ViewKind::Map => "Median completion by state",
            ViewKind::CorrelationMatrix => "Correlation matrix",
            ViewKind::ScatterMatrix => "Scatterplot matrix",
        }
    }
}

/// Which record set a view is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// The whole filtered set; brushed records are emphasised, not excluded.
    Filtered,
    /// The filtered set intersected with the brush.
    Displayed,
}

/// Everything a view needs to rebuild its encoding.
pub struct ViewInput<'a> {
    pub records: &'a [&'a Record],
    pub brush: &'a Brush,
    pub geography: &'a GeoStatus,
}

/// Emitted by a view when the user finishes a brush gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMessage {
    pub source: ViewKind,
    pub brush: Brush,
}

pub trait ViewAdapter {
    fn kind(&self) -> ViewKind;

    fn feed(&self) -> Feed;

    /// Rebuild the encoding from fresh input.
    fn update(&mut self, input: &ViewInput<'_>);

    /// Number of records in the current encoding.
    fn record_count(&self) -> usize;

    /// Paint the current encoding; returns a message when a brush gesture ends.
    fn show(&mut self, ui: &mut Ui) -> Option<SelectionMessage>;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Linear map between a value extent and the unit interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    lo: f64,
    hi: f64,
}

impl Scale {
    /// A degenerate extent `[a, a]` is widened to `[a, a + 1]`.
    pub fn from_extent((lo, hi): (f64, f64)) -> Self {
        if lo == hi {
            Self { lo, hi: lo + 1.0 }
        } else {
            Self { lo, hi }
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Value → `[0, 1]` (unclamped).
    pub fn unit(&self, v: f64) -> f64 {
        (v - self.lo) / (self.hi - self.lo)
    }

    /// `[0, 1]` → value. Exact at both ends of the domain.
    pub fn invert(&self, t: f64) -> f64 {
        self.lo * (1.0 - t) + self.hi * t
    }
}

/// Emphasis of a mark under the current brush: `None` when nothing is brushed.
pub fn emphasis(brush: &Brush, record: &Record) -> Option<bool> {
    brush.contains(record.index)
}

/// Evenly spaced positions with outer padding, like a point scale.
pub fn point_positions(n: usize, start: f32, end: f32, padding: f32) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let step = (end - start) / ((n - 1) as f32 + padding * 2.0).max(1.0);
    let offset = if n == 1 { (end - start) / 2.0 } else { step * padding };
    (0..n).map(|i| start + offset + step * i as f32).collect()
}

/// Explicit empty state shown instead of a chart.
pub fn placeholder(ui: &mut Ui, text: &str, height: f32) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), height),
        egui::Sense::hover(),
    );
    ui.painter().text(
        rect.center(),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(14.0),
        ui.visuals().weak_text_color(),
    );
    response
}

/// Horizontal colour ramp with end labels.
pub fn gradient_legend(
    painter: &egui::Painter,
    rect: Rect,
    color_at: impl Fn(f64) -> Color32,
    low: &str,
    high: &str,
    text_color: Color32,
) {
    const SLICES: usize = 24;
    let w = rect.width() / SLICES as f32;
    for i in 0..SLICES {
        let x = rect.left() + w * i as f32;
        let slice =
            Rect::from_min_max(Pos2::new(x, rect.top()), Pos2::new(x + w + 0.5, rect.bottom()));
        painter.rect_filled(slice, 0.0, color_at((i as f64 + 0.5) / SLICES as f64));
    }
    let font = FontId::proportional(10.0);
    let below = egui::vec2(0.0, 2.0);
    painter.text(rect.left_bottom() + below, Align2::LEFT_TOP, low, font.clone(), text_color);
    painter.text(rect.right_bottom() + below, Align2::RIGHT_TOP, high, font, text_color);
}
