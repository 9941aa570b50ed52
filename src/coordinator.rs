use std::sync::Arc;

use anyhow::Result;

use crate::data::filter::FilterPredicate;
use crate::data::model::{Dataset, Record};
use crate::data::schema::{
    group_thousands, region_label, IdField, Metric, COLOR_BY, CORE_METRICS, PARALLEL_AXES,
};
use crate::geo::StateBoundaries;
use crate::schedule::{Coalescer, Generation};
use crate::selection::{Brush, SelectionState};
use crate::stats::grouped_median;
use crate::views::{
    Choropleth, CorrelationView, Feed, ParallelCoords, ScatterMatrix, SelectionMessage,
    ViewAdapter, ViewInput,
};

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// State of the geography resource, independent of the dataset.
#[derive(Debug, Clone)]
pub enum GeoStatus {
    Loading,
    Ready(Arc<StateBoundaries>),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    /// Terminal until a new load is started.
    Failed(String),
}

/// Result of one background load.
pub struct LoadOutcome {
    pub dataset: Result<Dataset>,
    pub geography: Result<StateBoundaries>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub shown: usize,
    pub total: usize,
    pub selection: String,
}

impl FilterSummary {
    pub fn count_text(&self) -> String {
        format!(
            "Showing {} of {} institutions.",
            group_thousands(self.shown as i64),
            group_thousands(self.total as i64)
        )
    }
}

/// One line of the side-panel region table.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub code: String,
    pub label: String,
    pub median: f64,
    pub count: usize,
}

/// Median completion per region over `records`, ordered by region code.
pub fn region_breakdown(records: &[&Record]) -> Vec<RegionRow> {
    grouped_median(records, IdField::Region, COLOR_BY)
        .into_iter()
        .map(|(code, stat)| RegionRow {
            label: region_label(&code).map_or_else(|| code.clone(), str::to_string),
            code,
            median: stat.median,
            count: stat.count,
        })
        .collect()
}

/// The four dashboard views in refresh order.
pub fn default_views() -> Vec<Box<dyn ViewAdapter>> {
    vec![
        Box::new(ParallelCoords::new(&PARALLEL_AXES, COLOR_BY)),
        Box::new(Choropleth::new(Metric::Completion)),
        Box::new(CorrelationView::new(&CORE_METRICS)),
        Box::new(ScatterMatrix::new(&CORE_METRICS, COLOR_BY)),
    ]
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Owns the selection state and the views, and is the only place that
/// pushes state changes into them.
///
/// Filter changes go through a [`Coalescer`]: [`ViewCoordinator::request_filter`]
/// only dispatches, and the newest predicate is applied by
/// [`ViewCoordinator::run_deferred`] at the start of the next frame. Brush
/// messages are applied immediately.
pub struct ViewCoordinator {
    status: LoadStatus,
    selection: Option<SelectionState>,
    geography: GeoStatus,
    views: Vec<Box<dyn ViewAdapter>>,
    filters: Coalescer<FilterPredicate>,
    summary: Option<FilterSummary>,
    regions: Vec<RegionRow>,
}

impl Default for ViewCoordinator {
    fn default() -> Self {
        Self::with_views(default_views())
    }
}

impl ViewCoordinator {
    pub fn with_views(views: Vec<Box<dyn ViewAdapter>>) -> Self {
        Self {
            status: LoadStatus::Loading,
            selection: None,
            geography: GeoStatus::Loading,
            views,
            filters: Coalescer::new(),
            summary: None,
            regions: Vec::new(),
        }
    }

    /// Forget the current data and wait for a new load.
    pub fn begin_loading(&mut self) {
        self.status = LoadStatus::Loading;
        self.selection = None;
        self.geography = GeoStatus::Loading;
        self.summary = None;
        self.regions.clear();
    }

    /// Install a finished load and render every view once.
    ///
    /// A dataset failure is terminal; a geography failure only disables the map.
    pub fn finish_loading(&mut self, outcome: LoadOutcome, predicate: FilterPredicate) {
        if self.status != LoadStatus::Loading {
            log::debug!("ignoring load result in state {:?}", self.status);
            return;
        }
        let dataset = match outcome.dataset {
            Ok(dataset) => dataset,
            Err(err) => {
                self.fail(&err);
                return;
            }
        };
        self.geography = match outcome.geography {
            Ok(boundaries) => GeoStatus::Ready(Arc::new(boundaries)),
            Err(err) => {
                log::warn!("Map unavailable: {err:#}");
                GeoStatus::Unavailable(format!("{err:#}"))
            }
        };
        if dataset.is_empty() {
            log::warn!("no institution has enough metrics to be shown");
        }
        log::info!("Dataset ready: {} institutions", dataset.len());
        self.selection = Some(SelectionState::new(Arc::new(dataset), predicate));
        self.status = LoadStatus::Ready;
        self.refresh();
    }

    /// Switch to the terminal failure state. Nothing is rendered afterwards.
    pub fn fail(&mut self, err: &anyhow::Error) {
        log::error!("Failed to load data: {err:#}");
        self.status = LoadStatus::Failed(format!("{err:#}"));
        self.selection = None;
        self.summary = None;
        self.regions.clear();
    }

    /// Queue a filter change for the next frame. Ignored unless data is ready.
    pub fn request_filter(&mut self, predicate: FilterPredicate) -> Option<Generation> {
        if self.status != LoadStatus::Ready {
            return None;
        }
        let generation = self.filters.dispatch(predicate);
        log::debug!("filter dispatched as generation {}", generation.0);
        Some(generation)
    }

    /// Apply the newest queued filter, discarding older ones.
    /// Returns whether anything was applied.
    pub fn run_deferred(&mut self) -> bool {
        let mut newest = None;
        let discarded = self
            .filters
            .run_pending(|generation, predicate| newest = Some((generation, predicate)));
        let Some((generation, predicate)) = newest else {
            return false;
        };
        let Some(selection) = self.selection.as_mut() else {
            return false;
        };
        log::info!(
            "Applying filter generation {} ({}), {discarded} superseded",
            generation.0,
            predicate.describe()
        );
        selection.set_filter(predicate);
        self.refresh();
        true
    }

    /// Whether a filter change is waiting to be applied.
    pub fn is_updating(&self) -> bool {
        self.filters.has_pending()
    }

    /// Apply a brush gesture reported by a view.
    pub fn handle_message(&mut self, message: SelectionMessage) {
        let Some(selection) = self.selection.as_mut() else {
            return;
        };
        match &message.brush {
            Brush::None => log::debug!("brush cleared from {:?}", message.source),
            Brush::Indices(set) => {
                log::debug!("{} records brushed from {:?}", set.len(), message.source)
            }
        }
        selection.set_brush(message.brush);
        self.refresh();
    }

    /// Push the current selection into every view in order, then rebuild
    /// the region table and summary.
    fn refresh(&mut self) {
        let Some(selection) = &self.selection else {
            return;
        };
        let filtered = selection.filtered();
        let displayed = selection.displayed();
        for view in self.views.iter_mut() {
            let records = match view.feed() {
                Feed::Filtered => filtered.as_slice(),
                Feed::Displayed => displayed.as_slice(),
            };
            view.update(&ViewInput {
                records,
                brush: selection.brush(),
                geography: &self.geography,
            });
        }
        self.regions = region_breakdown(&filtered);
        self.summary = Some(FilterSummary {
            shown: filtered.len(),
            total: selection.dataset().len(),
            selection: selection.predicate().describe(),
        });
        log::debug!(
            "refreshed views: {} filtered, {} displayed",
            filtered.len(),
            displayed.len()
        );
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    #[cfg(test)]
    pub fn geography(&self) -> &GeoStatus {
        &self.geography
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    pub fn summary(&self) -> Option<&FilterSummary> {
        self.summary.as_ref()
    }

    pub fn regions(&self) -> &[RegionRow] {
        &self.regions
    }

    pub fn views_mut(&mut self) -> &mut [Box<dyn ViewAdapter>] {
        &mut self.views
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    use anyhow::anyhow;
    use eframe::egui::Ui;

    use super::*;
    use crate::data::model::RecordIndex;
    use crate::views::ViewKind;

    type Log = Rc<RefCell<Vec<(ViewKind, usize)>>>;

    /// Records every update it receives into a shared log.
    struct Recorder {
        kind: ViewKind,
        feed: Feed,
        log: Log,
        count: usize,
    }

    impl ViewAdapter for Recorder {
        fn kind(&self) -> ViewKind {
            self.kind
        }

        fn feed(&self) -> Feed {
            self.feed
        }

        fn update(&mut self, input: &ViewInput<'_>) {
            self.count = input.records.len();
            self.log.borrow_mut().push((self.kind, self.count));
        }

        fn record_count(&self) -> usize {
            self.count
        }

        fn show(&mut self, _ui: &mut Ui) -> Option<SelectionMessage> {
            None
        }
    }

    fn recorders(log: &Log) -> Vec<Box<dyn ViewAdapter>> {
        [
            (ViewKind::ParallelCoordinates, Feed::Filtered),
            (ViewKind::Map, Feed::Filtered),
            (ViewKind::CorrelationMatrix, Feed::Displayed),
            (ViewKind::ScatterMatrix, Feed::Displayed),
        ]
        .into_iter()
        .map(|(kind, feed)| {
            Box::new(Recorder {
                kind,
                feed,
                log: log.clone(),
                count: 0,
            }) as Box<dyn ViewAdapter>
        })
        .collect()
    }

    fn record(i: usize, control: &str, region: &str, completion: f64) -> Record {
        Record::empty(RecordIndex(i))
            .with_field(IdField::Control, control)
            .with_field(IdField::Region, region)
            .with_field(IdField::State, "CA")
            .with_metric(Metric::Completion, Some(completion))
            .with_metric(Metric::Cost, Some(10_000.0 * (i + 1) as f64))
            .with_metric(Metric::Debt, Some(20_000.0 - 1_000.0 * i as f64))
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record(0, "1", "5", 0.40),
            record(1, "2", "5", 0.60),
            record(2, "1", "8", 0.80),
            record(3, "3", "8", 0.20),
        ])
    }

    fn ready(views: Vec<Box<dyn ViewAdapter>>) -> ViewCoordinator {
        let mut c = ViewCoordinator::with_views(views);
        c.finish_loading(
            LoadOutcome {
                dataset: Ok(dataset()),
                geography: Ok(StateBoundaries::default()),
            },
            FilterPredicate::default(),
        );
        c
    }

    fn publics() -> FilterPredicate {
        FilterPredicate {
            controls: ["1".to_string()].into(),
            ..Default::default()
        }
    }

    fn brush(indices: &[usize]) -> SelectionMessage {
        SelectionMessage {
            source: ViewKind::ParallelCoordinates,
            brush: Brush::Indices(indices.iter().map(|i| RecordIndex(*i)).collect()),
        }
    }

    #[test]
    fn views_refresh_in_fixed_order_with_their_feeds() {
        let log: Log = Rc::default();
        let mut c = ready(recorders(&log));
        assert_eq!(
            *log.borrow(),
            vec![
                (ViewKind::ParallelCoordinates, 4),
                (ViewKind::Map, 4),
                (ViewKind::CorrelationMatrix, 4),
                (ViewKind::ScatterMatrix, 4),
            ]
        );

        log.borrow_mut().clear();
        c.handle_message(brush(&[1, 2]));
        assert_eq!(
            *log.borrow(),
            vec![
                (ViewKind::ParallelCoordinates, 4),
                (ViewKind::Map, 4),
                (ViewKind::CorrelationMatrix, 2),
                (ViewKind::ScatterMatrix, 2),
            ]
        );
    }

    #[test]
    fn filter_is_deferred_until_next_frame() {
        let log: Log = Rc::default();
        let mut c = ready(recorders(&log));
        log.borrow_mut().clear();

        assert!(c.request_filter(publics()).is_some());
        assert!(c.is_updating());
        assert!(log.borrow().is_empty());
        assert_eq!(c.summary().map(|s| s.shown), Some(4));

        assert!(c.run_deferred());
        assert!(!c.is_updating());
        assert_eq!(c.summary().map(|s| s.shown), Some(2));
        assert!(!c.run_deferred());
    }

    #[test]
    fn rapid_filters_apply_only_the_newest() {
        let log: Log = Rc::default();
        let mut c = ready(recorders(&log));
        log.borrow_mut().clear();

        let g1 = c.request_filter(publics()).unwrap();
        let g2 = c
            .request_filter(FilterPredicate {
                regions: ["8".to_string()].into(),
                ..Default::default()
            })
            .unwrap();
        let g3 = c
            .request_filter(FilterPredicate {
                controls: ["3".to_string()].into(),
                ..Default::default()
            })
            .unwrap();
        assert!(g1 < g2 && g2 < g3);

        assert!(c.run_deferred());
        // One refresh, for g3 only.
        assert_eq!(log.borrow().len(), 4);
        let summary = c.summary().unwrap();
        assert_eq!(summary.shown, 1);
        assert_eq!(summary.selection, "Private for-profit • All regions");
    }

    #[test]
    fn applying_a_filter_clears_the_brush() {
        let mut c = ready(default_views());
        c.handle_message(brush(&[0, 2]));
        assert_ne!(c.selection().unwrap().brush(), &Brush::None);
        c.request_filter(FilterPredicate::default());
        c.run_deferred();
        assert_eq!(c.selection().unwrap().brush(), &Brush::None);
    }

    #[test]
    fn empty_brush_empties_matrix_views_only() {
        let mut c = ready(default_views());
        c.handle_message(brush(&[]));
        let counts: Vec<(ViewKind, usize)> = c
            .views_mut()
            .iter()
            .map(|v| (v.kind(), v.record_count()))
            .collect();
        assert_eq!(
            counts,
            vec![
                (ViewKind::ParallelCoordinates, 4),
                (ViewKind::Map, 4),
                (ViewKind::CorrelationMatrix, 0),
                (ViewKind::ScatterMatrix, 0),
            ]
        );
    }

    #[test]
    fn dataset_failure_is_terminal() {
        let log: Log = Rc::default();
        let mut c = ViewCoordinator::with_views(recorders(&log));
        c.finish_loading(
            LoadOutcome {
                dataset: Err(anyhow!("connection reset")),
                geography: Ok(StateBoundaries::default()),
            },
            FilterPredicate::default(),
        );
        assert!(matches!(c.status(), LoadStatus::Failed(msg) if msg.contains("connection reset")));
        assert!(c.request_filter(publics()).is_none());
        c.handle_message(brush(&[0]));
        c.finish_loading(
            LoadOutcome {
                dataset: Ok(dataset()),
                geography: Ok(StateBoundaries::default()),
            },
            FilterPredicate::default(),
        );
        assert!(matches!(c.status(), LoadStatus::Failed(_)));
        assert!(c.summary().is_none());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn geography_failure_only_degrades_the_map() {
        let log: Log = Rc::default();
        let mut c = ViewCoordinator::with_views(recorders(&log));
        c.finish_loading(
            LoadOutcome {
                dataset: Ok(dataset()),
                geography: Err(anyhow!("no such file")),
            },
            FilterPredicate::default(),
        );
        assert_eq!(c.status(), &LoadStatus::Ready);
        assert!(matches!(
            c.geography(),
            GeoStatus::Unavailable(reason) if reason.contains("no such file")
        ));
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn new_load_recovers_from_failure() {
        let mut c = ViewCoordinator::with_views(Vec::new());
        c.fail(&anyhow!("boom"));
        c.begin_loading();
        c.finish_loading(
            LoadOutcome {
                dataset: Ok(dataset()),
                geography: Ok(StateBoundaries::default()),
            },
            publics(),
        );
        assert_eq!(c.status(), &LoadStatus::Ready);
        assert_eq!(
            c.summary().map(FilterSummary::count_text).as_deref(),
            Some("Showing 2 of 4 institutions.")
        );
    }

    #[test]
    fn region_table_tracks_the_filter() {
        let mut c = ready(Vec::new());
        let rows: Vec<(String, usize)> = c
            .regions()
            .iter()
            .map(|r| (r.label.clone(), r.count))
            .collect();
        assert_eq!(rows, vec![("Southeast".to_string(), 2), ("Far West".to_string(), 2)]);
        assert_eq!(c.regions()[0].median, 0.5);

        c.request_filter(publics());
        c.run_deferred();
        let codes: BTreeSet<&str> = c.regions().iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, BTreeSet::from(["5", "8"]));
        assert!(c.regions().iter().all(|r| r.count == 1));
    }

    #[test]
    fn summary_groups_thousands() {
        let s = FilterSummary {
            shown: 1234,
            total: 6543,
            selection: String::new(),
        };
        assert_eq!(s.count_text(), "Showing 1,234 of 6,543 institutions.");
    }
}
