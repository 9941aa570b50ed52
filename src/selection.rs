use std::collections::BTreeSet;
use std::sync::Arc;

use crate::data::filter::{filtered_positions, FilterPredicate};
use crate::data::model::{Dataset, Record, RecordIndex};

// ---------------------------------------------------------------------------
// Brush selection
// ---------------------------------------------------------------------------

/// The records picked out by the most recent brush gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Brush {
    /// No brush: every filtered record is displayed.
    #[default]
    None,
    /// Exactly these records are displayed.
    Indices(BTreeSet<RecordIndex>),
}

impl Brush {
    /// Whether `index` is emphasised by the brush. `None` when there is no brush.
    pub fn contains(&self, index: RecordIndex) -> Option<bool> {
        match self {
            Brush::None => None,
            Brush::Indices(set) => Some(set.contains(&index)),
        }
    }

    /// Whether `index` passes the brush; everything passes when there is no brush.
    pub fn admits(&self, index: RecordIndex) -> bool {
        self.contains(index).unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

/// Single source of truth for which records are filtered and which are brushed.
///
/// `set_filter` and `set_brush` are the only mutators; views read through
/// [`SelectionState::filtered`] and [`SelectionState::displayed`].
#[derive(Debug, Clone)]
pub struct SelectionState {
    dataset: Arc<Dataset>,
    predicate: FilterPredicate,
    /// Positions into `dataset.records()` passing `predicate`.
    filtered: Vec<usize>,
    /// Indices of `filtered`, for brush validation.
    filtered_indices: BTreeSet<RecordIndex>,
    brush: Brush,
}

impl SelectionState {
    pub fn new(dataset: Arc<Dataset>, predicate: FilterPredicate) -> Self {
        let mut state = Self {
            dataset,
            predicate: FilterPredicate::default(),
            filtered: Vec::new(),
            filtered_indices: BTreeSet::new(),
            brush: Brush::None,
        };
        state.set_filter(predicate);
        state
    }

    /// Replace the predicate, recompute the filtered set and clear the brush.
    ///
    /// The brush is cleared on every call, even when `predicate` equals the
    /// current one.
    pub fn set_filter(&mut self, predicate: FilterPredicate) {
        self.filtered = filtered_positions(&self.dataset, &predicate);
        self.filtered_indices = self
            .filtered
            .iter()
            .map(|&pos| self.dataset.records()[pos].index)
            .collect();
        self.predicate = predicate;
        self.brush = Brush::None;
    }

    /// Replace the brush. Indices outside the filtered set are dropped so
    /// the brush never refers to a hidden record.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = match brush {
            Brush::None => Brush::None,
            Brush::Indices(set) => Brush::Indices(
                set.into_iter()
                    .filter(|i| self.filtered_indices.contains(i))
                    .collect(),
            ),
        };
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.predicate
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Records passing the filter, in dataset order.
    pub fn filtered(&self) -> Vec<&Record> {
        let records = self.dataset.records();
        self.filtered.iter().map(|&pos| &records[pos]).collect()
    }

    /// Filtered records intersected with the brush.
    pub fn displayed(&self) -> Vec<&Record> {
        let records = self.dataset.records();
        self.filtered
            .iter()
            .map(|&pos| &records[pos])
            .filter(|r| self.brush.admits(r.index))
            .collect()
    }
}
