use super::model::{RawRow, RawValue, Record, RecordIndex};
use super::schema::{IdField, Metric, PARALLEL_AXES};

/// Default share of [`PARALLEL_AXES`] a record must carry to be kept.
pub const DEFAULT_MIN_PRESENT: f64 = 0.5;

/// Parse one numeric cell. Empty text, `NA` (any case) and non-finite
/// numbers are absent, never zero.
pub fn parse_metric(value: Option<&RawValue>) -> Option<f64> {
    match value? {
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("NA") {
                return None;
            }
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        RawValue::Integer(i) => Some(*i as f64),
        RawValue::Float(v) => Some(*v).filter(|v| v.is_finite()),
        RawValue::Bool(_) | RawValue::Null => None,
    }
}

/// Coerce an identifying cell to trimmed text; absent cells become "".
pub fn parse_field(value: Option<&RawValue>) -> String {
    match value {
        Some(RawValue::Text(s)) => s.trim().to_string(),
        Some(RawValue::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Convert raw rows into records. `index` is the row position in `rows`.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<Record> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| normalize_row(RecordIndex(i), row))
        .collect()
}

fn normalize_row(index: RecordIndex, row: &RawRow) -> Record {
    let mut record = Record::empty(index);
    for field in IdField::ALL {
        *record.field_mut(field) = parse_field(row.get(field.column()));
    }
    for metric in Metric::ALL {
        record.set_metric(metric, parse_metric(row.get(metric.column())));
    }
    record
}

/// Keep records carrying at least `min_present` of the `required` metrics.
pub fn retain_complete(records: Vec<Record>, required: &[Metric], min_present: f64) -> Vec<Record> {
    let needed = required.len() as f64 * min_present;
    records
        .into_iter()
        .filter(|r| r.present_count(required) as f64 >= needed)
        .collect()
}

/// Full normalization pass: typed records with sparse rows dropped.
pub fn normalize(rows: &[RawRow], min_present: f64) -> Vec<Record> {
    let records = normalize_rows(rows);
    let before = records.len();
    let kept = retain_complete(records, &PARALLEL_AXES, min_present);
    log::debug!(
        "normalized {before} rows, kept {} with at least {:.0}% of core metrics",
        kept.len(),
        min_present * 100.0
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, RawValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn missing_tokens_are_absent_not_zero() {
        assert_eq!(parse_metric(Some(&text(""))), None);
        assert_eq!(parse_metric(Some(&text("  "))), None);
        assert_eq!(parse_metric(Some(&text("NA"))), None);
        assert_eq!(parse_metric(Some(&text("na"))), None);
        assert_eq!(parse_metric(Some(&text("PrivacySuppressed"))), None);
        assert_eq!(parse_metric(Some(&text("inf"))), None);
        assert_eq!(parse_metric(Some(&RawValue::Float(f64::NAN))), None);
        assert_eq!(parse_metric(Some(&RawValue::Null)), None);
        assert_eq!(parse_metric(None), None);
        assert_eq!(parse_metric(Some(&text("0"))), Some(0.0));
        assert_eq!(parse_metric(Some(&text(" 0.25 "))), Some(0.25));
        assert_eq!(parse_metric(Some(&RawValue::Integer(1200))), Some(1200.0));
    }

    #[test]
    fn fields_are_trimmed_and_default_to_empty() {
        assert_eq!(parse_field(Some(&text("  Boston "))), "Boston");
        assert_eq!(parse_field(Some(&RawValue::Integer(3))), "3");
        assert_eq!(parse_field(Some(&RawValue::Null)), "");
        assert_eq!(parse_field(None), "");
    }

    #[test]
    fn index_is_input_position() {
        let rows = vec![
            row(&[("INSTNM", text("A"))]),
            row(&[("INSTNM", text("B"))]),
            row(&[("INSTNM", text("C"))]),
        ];
        let records = normalize_rows(&rows);
        let indices: Vec<usize> = records.iter().map(|r| r.index.0).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(records[2].name, "C");
    }

    #[test]
    fn sparse_rows_are_dropped_but_keep_original_indices() {
        let full = row(&[
            ("ADM_RATE", text("0.5")),
            ("SAT_AVG", text("1100")),
            ("PCTPELL", text("0.3")),
            ("COSTT4_A", text("20000")),
            ("MD_EARN_WNE_P10", text("40000")),
            ("DEBT_MDN", text("15000")),
        ]);
        // Three of six present: exactly the 50% threshold.
        let half = row(&[
            ("ADM_RATE", text("0.5")),
            ("SAT_AVG", text("NA")),
            ("PCTPELL", text("0.3")),
            ("COSTT4_A", text("20000")),
            // Metrics outside the required list do not count.
            ("C150_4", text("0.6")),
        ]);
        let sparse = row(&[("ADM_RATE", text("0.5")), ("C150_4", text("0.6"))]);

        let kept = normalize(&[sparse, full, half], DEFAULT_MIN_PRESENT);
        let indices: Vec<usize> = kept.iter().map(|r| r.index.0).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn renormalizing_normalized_values_is_a_fixed_point() {
        let rows = vec![row(&[
            ("INSTNM", text(" Alpha College ")),
            ("STABBR", text("MA")),
            ("CONTROL", RawValue::Integer(2)),
            ("ADM_RATE", text("0.125")),
            ("SAT_AVG", text("NA")),
            ("COSTT4_A", text("")),
            ("C150_4", text("0.81")),
        ])];
        let first = normalize_rows(&rows);

        let back: Vec<RawRow> = first
            .iter()
            .map(|r| {
                let mut out = RawRow::new();
                for f in IdField::ALL {
                    out.insert(f.column().to_string(), text(r.field(f)));
                }
                for m in Metric::ALL {
                    let cell = r.metric(m).map_or(RawValue::Null, RawValue::Float);
                    out.insert(m.column().to_string(), cell);
                }
                out
            })
            .collect();
        let second = normalize_rows(&back);

        assert_eq!(first, second);
        for m in Metric::ALL {
            if let Some(v) = second[0].metric(m) {
                assert!(v.is_finite());
            }
        }
    }
}
