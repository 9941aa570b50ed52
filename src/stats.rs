use std::collections::BTreeMap;

use crate::data::model::Record;
use crate::data::schema::{state_fips, IdField, Metric};

// ---------------------------------------------------------------------------
// Pearson correlation matrix
// ---------------------------------------------------------------------------

/// Square matrix of Pearson coefficients between `columns`.
///
/// Uses listwise deletion: only records where every requested column is
/// present take part. With fewer than two such records the result is the
/// all-zero matrix. A column with zero variance correlates as 0 with
/// everything, itself included.
pub fn correlation_matrix(records: &[&Record], columns: &[Metric]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let mut matrix = vec![vec![0.0; n]; n];

    let rows: Vec<Vec<f64>> = records
        .iter()
        .filter_map(|r| columns.iter().map(|c| r.metric(*c)).collect::<Option<Vec<f64>>>())
        .collect();
    if rows.len() < 2 {
        return matrix;
    }

    let count = rows.len() as f64;
    let means: Vec<f64> = (0..n)
        .map(|j| rows.iter().map(|row| row[j]).sum::<f64>() / count)
        .collect();
    let sum_sq: Vec<f64> = (0..n)
        .map(|j| rows.iter().map(|row| (row[j] - means[j]).powi(2)).sum())
        .collect();

    for i in 0..n {
        if sum_sq[i] > 0.0 {
            matrix[i][i] = 1.0;
        }
        for j in (i + 1)..n {
            let r = if sum_sq[i] == 0.0 || sum_sq[j] == 0.0 {
                0.0
            } else {
                let num: f64 = rows
                    .iter()
                    .map(|row| (row[i] - means[i]) * (row[j] - means[j]))
                    .sum();
                let r = num / (sum_sq[i] * sum_sq[j]).sqrt();
                if r.is_finite() {
                    r.clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            };
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// Grouped medians
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStat {
    pub median: f64,
    pub count: usize,
}

/// Median of `values`; `None` when empty. Even counts average the middle pair.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Median and count of `metric` per value of `group`, skipping records
/// where the metric is absent. Group keys are compared case-insensitively
/// and reported upper-cased.
pub fn grouped_median(
    records: &[&Record],
    group: IdField,
    metric: Metric,
) -> BTreeMap<String, GroupStat> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(v) = record.metric(metric) {
            buckets
                .entry(record.field(group).to_uppercase())
                .or_default()
                .push(v);
        }
    }
    buckets
        .into_iter()
        .filter_map(|(key, mut values)| {
            let count = values.len();
            median(&mut values).map(|median| (key, GroupStat { median, count }))
        })
        .collect()
}

/// Per-state medians of `metric`, keyed by FIPS code. States without a
/// known FIPS code are dropped.
pub fn state_medians(records: &[&Record], metric: Metric) -> BTreeMap<u32, GroupStat> {
    grouped_median(records, IdField::State, metric)
        .into_iter()
        .filter_map(|(abbr, stat)| state_fips(&abbr).map(|fips| (fips, stat)))
        .collect()
}

/// `(min, max)` over the present values of `metric`.
pub fn extent(records: &[&Record], metric: Metric) -> Option<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| r.metric(metric))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordIndex;

    fn rec(i: usize, values: &[(Metric, f64)]) -> Record {
        values
            .iter()
            .fold(Record::empty(RecordIndex(i)), |r, (m, v)| r.with_metric(*m, Some(*v)))
    }

    const COLS: [Metric; 3] = [Metric::AdmissionRate, Metric::SatAverage, Metric::Cost];

    fn row(i: usize, adm: f64, sat: f64, cost: f64) -> Record {
        rec(
            i,
            &[
                (Metric::AdmissionRate, adm),
                (Metric::SatAverage, sat),
                (Metric::Cost, cost),
            ],
        )
    }

    fn sample() -> Vec<Record> {
        vec![
            row(0, 0.9, 1000.0, 15000.0),
            row(1, 0.6, 1150.0, 30000.0),
            row(2, 0.3, 1300.0, 21000.0),
            row(3, 0.1, 1500.0, 70000.0),
        ]
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let data = sample();
        let refs: Vec<&Record> = data.iter().collect();
        let m = correlation_matrix(&refs, &COLS);
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
                assert!((-1.0..=1.0).contains(&m[i][j]));
            }
        }
        // Admission rate falls as SAT rises.
        assert!(m[0][1] < -0.9);
    }

    #[test]
    fn perfectly_linear_columns_correlate_to_one() {
        let data: Vec<Record> = (0..5)
            .map(|i| {
                let x = i as f64;
                rec(i, &[(Metric::Debt, x), (Metric::Earnings, 3.0 * x + 7.0)])
            })
            .collect();
        let refs: Vec<&Record> = data.iter().collect();
        let m = correlation_matrix(&refs, &[Metric::Debt, Metric::Earnings]);
        assert!((m[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn listwise_deletion_drops_incomplete_records() {
        let mut data = sample();
        // An outlier missing one column must not influence any cell.
        data.push(rec(9, &[(Metric::AdmissionRate, 50.0), (Metric::SatAverage, -9000.0)]));
        let with_outlier: Vec<&Record> = data.iter().collect();
        let without: Vec<&Record> = data[..4].iter().collect();
        assert_eq!(
            correlation_matrix(&with_outlier, &COLS),
            correlation_matrix(&without, &COLS)
        );
    }

    #[test]
    fn fewer_than_two_complete_records_is_zero_matrix() {
        let data = sample();
        let one: Vec<&Record> = data[..1].iter().collect();
        assert_eq!(correlation_matrix(&one, &COLS), vec![vec![0.0; 3]; 3]);
        assert_eq!(correlation_matrix(&[], &COLS), vec![vec![0.0; 3]; 3]);
        assert!(correlation_matrix(&one, &[]).is_empty());
    }

    #[test]
    fn constant_column_yields_zero_not_nan() {
        let data: Vec<Record> = (0..4)
            .map(|i| rec(i, &[(Metric::Debt, 10_000.0), (Metric::Earnings, i as f64)]))
            .collect();
        let refs: Vec<&Record> = data.iter().collect();
        let m = correlation_matrix(&refs, &[Metric::Debt, Metric::Earnings]);
        assert_eq!(m, vec![vec![0.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn medians_handle_odd_even_and_empty() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn grouped_median_skips_absent_values() {
        let data = vec![
            rec(0, &[(Metric::Completion, 0.5)]).with_field(IdField::Region, "1"),
            Record::empty(RecordIndex(1)).with_field(IdField::Region, "1"),
            rec(2, &[(Metric::Completion, 0.7)]).with_field(IdField::Region, "3"),
        ];
        let refs: Vec<&Record> = data.iter().collect();
        let groups = grouped_median(&refs, IdField::Region, Metric::Completion);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["1"], GroupStat { median: 0.5, count: 1 });
        assert_eq!(groups["3"], GroupStat { median: 0.7, count: 1 });
    }

    #[test]
    fn group_keys_ignore_case_and_map_to_fips() {
        let data = vec![
            rec(0, &[(Metric::Completion, 0.2)]).with_field(IdField::State, "ma"),
            rec(1, &[(Metric::Completion, 0.4)]).with_field(IdField::State, "MA"),
            rec(2, &[(Metric::Completion, 0.9)]).with_field(IdField::State, "PR"),
        ];
        let refs: Vec<&Record> = data.iter().collect();
        let groups = grouped_median(&refs, IdField::State, Metric::Completion);
        assert_eq!(groups["MA"].count, 2);
        let by_fips = state_medians(&refs, Metric::Completion);
        assert_eq!(by_fips.len(), 1);
        let ma = by_fips[&25];
        assert!((ma.median - 0.3).abs() < 1e-12);
        assert_eq!(ma.count, 2);
    }

    #[test]
    fn extent_ignores_absent() {
        let data = vec![
            rec(0, &[(Metric::Cost, 5.0)]),
            Record::empty(RecordIndex(1)),
            rec(2, &[(Metric::Cost, -1.0)]),
        ];
        let refs: Vec<&Record> = data.iter().collect();
        assert_eq!(extent(&refs, Metric::Cost), Some((-1.0, 5.0)));
        assert_eq!(extent(&refs, Metric::Debt), None);
    }
}
