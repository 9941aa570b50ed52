use std::collections::BTreeMap;
use std::fmt;

use super::schema::{IdField, Metric};

// ---------------------------------------------------------------------------
// RawValue – a single untyped cell as it came out of the source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what CSV / JSON / Parquet readers yield.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => write!(f, "{s}"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Null => Ok(()),
        }
    }
}

/// One source row: column name → cell. Columns the loader did not find are absent.
pub type RawRow = BTreeMap<String, RawValue>;

// ---------------------------------------------------------------------------
// Record – one institution
// ---------------------------------------------------------------------------

/// Stable identity of a record within one data load.
///
/// Assigned from the row position before any rows are dropped, so it keeps
/// pointing at the same institution in every filtered or brushed subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordIndex(pub usize);

impl fmt::Display for RecordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub index: RecordIndex,
    pub unit_id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub control: String,
    pub region: String,
    metrics: [Option<f64>; Metric::COUNT],
}

impl Record {
    /// A record with all identifying fields empty and every metric absent.
    pub fn empty(index: RecordIndex) -> Self {
        Self {
            index,
            unit_id: String::new(),
            name: String::new(),
            city: String::new(),
            state: String::new(),
            control: String::new(),
            region: String::new(),
            metrics: [None; Metric::COUNT],
        }
    }

    pub fn field(&self, field: IdField) -> &str {
        match field {
            IdField::UnitId => &self.unit_id,
            IdField::Name => &self.name,
            IdField::City => &self.city,
            IdField::State => &self.state,
            IdField::Control => &self.control,
            IdField::Region => &self.region,
        }
    }

    pub fn field_mut(&mut self, field: IdField) -> &mut String {
        match field {
            IdField::UnitId => &mut self.unit_id,
            IdField::Name => &mut self.name,
            IdField::City => &mut self.city,
            IdField::State => &mut self.state,
            IdField::Control => &mut self.control,
            IdField::Region => &mut self.region,
        }
    }

    /// The metric value, if present. Never NaN or infinite.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics[metric.slot()]
    }

    /// Store a metric; non-finite values are stored as absent.
    pub fn set_metric(&mut self, metric: Metric, value: Option<f64>) {
        self.metrics[metric.slot()] = value.filter(|v| v.is_finite());
    }

    pub fn with_metric(mut self, metric: Metric, value: Option<f64>) -> Self {
        self.set_metric(metric, value);
        self
    }

    pub fn with_field(mut self, field: IdField, value: &str) -> Self {
        *self.field_mut(field) = value.trim().to_string();
        self
    }

    /// How many of `metrics` are present on this record.
    pub fn present_count(&self, metrics: &[Metric]) -> usize {
        metrics.iter().filter(|m| self.metric(**m).is_some()).count()
    }

    /// Display name, falling back to the index for unnamed rows.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Institution {}", self.index)
        } else {
            self.name.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete normalized load
// ---------------------------------------------------------------------------

/// All records of one load, ordered by index. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Build from records; they are sorted by index so lookups can bisect.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|r| r.index);
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[cfg(test)]
    pub fn get(&self, index: RecordIndex) -> Option<&Record> {
        self.records
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.records[pos])
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_metrics_are_stored_as_absent() {
        let r = Record::empty(RecordIndex(0))
            .with_metric(Metric::Cost, Some(f64::NAN))
            .with_metric(Metric::Debt, Some(f64::INFINITY))
            .with_metric(Metric::Earnings, Some(41_000.0));
        assert_eq!(r.metric(Metric::Cost), None);
        assert_eq!(r.metric(Metric::Debt), None);
        assert_eq!(r.metric(Metric::Earnings), Some(41_000.0));
        assert_eq!(r.present_count(&[Metric::Cost, Metric::Debt, Metric::Earnings]), 1);
    }

    #[test]
    fn dataset_lookup_by_index_survives_gaps() {
        let ds = Dataset::from_records(vec![
            Record::empty(RecordIndex(7)).with_field(IdField::Name, "Seven"),
            Record::empty(RecordIndex(2)).with_field(IdField::Name, " Two "),
        ]);
        assert_eq!(ds.records()[0].index, RecordIndex(2));
        assert_eq!(ds.get(RecordIndex(2)).map(|r| r.name.as_str()), Some("Two"));
        assert_eq!(ds.get(RecordIndex(7)).map(|r| r.name.as_str()), Some("Seven"));
        assert!(ds.get(RecordIndex(3)).is_none());
    }
}
