use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, RawRow, RawValue};
use super::normalize::normalize;
use super::schema::retained_columns;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and normalize the institution table at `path`.
pub fn load_dataset(path: &Path, min_present: f64) -> Result<Dataset> {
    ensure_readable(path)?;
    let rows = load_rows(path, &retained_columns())
        .with_context(|| format!("loading {}", path.display()))?;
    let records = normalize(&rows, min_present);
    log::info!(
        "Loaded {} rows from {}, {} institutions kept",
        rows.len(),
        path.display(),
        records.len()
    );
    Ok(Dataset::from_records(records))
}

/// Read raw rows from a file, keeping only `columns`. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one institution per line (`NA` or empty for missing)
/// * `.json`    – `[{ "INSTNM": "...", "ADM_RATE": 0.5, ... }, ...]`
/// * `.parquet` – flat scalar columns named like the CSV header
pub fn load_rows(path: &Path, columns: &[&str]) -> Result<Vec<RawRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => load_csv(path, columns)?,
        "json" => load_json(path, columns)?,
        "parquet" | "pq" => load_parquet(path, columns)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string()).into()),
    };
    Ok(rows)
}

fn warn_missing(found: &[&str], columns: &[&str]) -> Result<()> {
    if found.is_empty() && !columns.is_empty() {
        return Err(LoadError::NoKnownColumns.into());
    }
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !found.contains(c))
        .collect();
    if !missing.is_empty() {
        log::warn!("columns missing from input, treated as absent: {missing:?}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, columns: &[&str]) -> Result<Vec<RawRow>> {
    // Ragged rows are tolerated; cells past the end of a short row are absent.
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    // (position in record, column name) for every retained column present.
    let wanted: Vec<(usize, &str)> = columns
        .iter()
        .filter_map(|c| headers.iter().position(|h| h.trim() == *c).map(|i| (i, *c)))
        .collect();
    let found: Vec<&str> = wanted.iter().map(|(_, c)| *c).collect();
    warn_missing(&found, columns)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: RawRow = wanted
            .iter()
            .map(|(i, name)| {
                let cell = record
                    .get(*i)
                    .map_or(RawValue::Null, |s| RawValue::Text(s.to_string()));
                (name.to_string(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path, columns: &[&str]) -> Result<Vec<RawRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let records = root.as_array().ok_or(LoadError::NotARowArray)?;

    let mut found: Vec<&str> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or(LoadError::RowNotAnObject { row: i })?;
        let mut row = RawRow::new();
        for col in columns {
            if let Some(val) = obj.get(*col) {
                if !found.contains(col) {
                    found.push(*col);
                }
                row.insert(col.to_string(), json_to_raw(val));
            }
        }
        rows.push(row);
    }
    if !rows.is_empty() {
        warn_missing(&found, columns)?;
    }
    Ok(rows)
}

fn json_to_raw(val: &JsonValue) -> RawValue {
    match val {
        JsonValue::String(s) => RawValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                RawValue::Float(f)
            } else {
                RawValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => RawValue::Bool(*b),
        JsonValue::Null => RawValue::Null,
        other => RawValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per source column.
/// Works with files written by Pandas (`df.to_parquet()`) and Polars.
fn load_parquet(path: &Path, columns: &[&str]) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    let mut checked_schema = false;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let wanted: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|c| schema.index_of(c).ok().map(|i| (i, *c)))
            .collect();
        if !checked_schema {
            let found: Vec<&str> = wanted.iter().map(|(_, c)| *c).collect();
            warn_missing(&found, columns)?;
            checked_schema = true;
        }

        for row in 0..batch.num_rows() {
            let raw: RawRow = wanted
                .iter()
                .map(|(i, name)| (name.to_string(), extract_raw_value(batch.column(*i), row)))
                .collect();
            rows.push(raw);
        }
    }

    Ok(rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_raw_value(col: &Arc<dyn Array>, row: usize) -> RawValue {
    if col.is_null(row) {
        return RawValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(RawValue::Null, |a| RawValue::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => RawValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(RawValue::Null, |a| RawValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(RawValue::Null, |a| RawValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(RawValue::Null, |a| RawValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(RawValue::Null, |a| RawValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(RawValue::Null, |a| RawValue::Bool(a.value(row))),
        other => {
            log::trace!("unsupported parquet type {other:?}, treating cell as absent");
            RawValue::Null
        }
    }
}

/// Fail early on paths that obviously cannot be read.
pub fn ensure_readable(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("{} does not exist or is not a file", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordIndex;
    use crate::data::normalize::DEFAULT_MIN_PRESENT;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "scorecard-explorer-{}-{name}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const CSV: &str = "\
UNITID,INSTNM,CITY,STABBR,CONTROL,REGION,EXTRA,ADM_RATE,SAT_AVG,PCTPELL,COSTT4_A,MD_EARN_WNE_P10,DEBT_MDN,C150_4
100,Alpha U, Boston ,MA,1,1,x,0.5,1200,0.3,25000,50000,20000,0.7
101,Sparse College,Reno,NV,3,8,x,NA,,NA,,,NA,0.2
102,Gamma Tech,Austin,TX,2,6,x,0.25,1400,0.1,60000,80000,NA,0.9
";

    #[test]
    fn csv_rows_keep_only_retained_columns() {
        let path = temp_file("rows.csv", CSV);
        let rows = load_rows(&path, &retained_columns()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(!rows[0].contains_key("EXTRA"));
        assert_eq!(rows[0].get("CITY"), Some(&RawValue::Text(" Boston ".into())));
        assert!(!rows[0].contains_key("UGDS"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn csv_dataset_drops_sparse_rows_and_keeps_indices() {
        let path = temp_file("dataset.csv", CSV);
        let ds = load_dataset(&path, DEFAULT_MIN_PRESENT).unwrap();
        let indices: Vec<RecordIndex> = ds.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![RecordIndex(0), RecordIndex(2)]);
        let gamma = ds.get(RecordIndex(2)).unwrap();
        assert_eq!(gamma.city, "Austin");
        assert_eq!(gamma.metric(crate::data::schema::Metric::Debt), None);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn short_csv_rows_read_as_absent_cells() {
        const RAGGED: &str = "\
UNITID,INSTNM,CITY,ADM_RATE,SAT_AVG
1,Alpha,Boston,0.5,1200
2,Beta
3,Gamma,Reno,0.2,1100,extra
";
        let path = temp_file("ragged.csv", RAGGED);
        let rows = load_rows(&path, &retained_columns()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get("INSTNM"), Some(&RawValue::Text("Beta".into())));
        assert_eq!(rows[1].get("CITY"), Some(&RawValue::Null));
        assert_eq!(rows[1].get("SAT_AVG"), Some(&RawValue::Null));
        assert_eq!(rows[2].get("SAT_AVG"), Some(&RawValue::Text("1100".into())));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn json_rows_accept_mixed_cells() {
        let path = temp_file(
            "rows.json",
            r#"[{"INSTNM": "Alpha", "CONTROL": 1, "ADM_RATE": 0.4, "SAT_AVG": null},
                {"INSTNM": "Beta", "CONTROL": "2", "ADM_RATE": "NA"}]"#,
        );
        let rows = load_rows(&path, &retained_columns()).unwrap();
        assert_eq!(rows[0].get("CONTROL"), Some(&RawValue::Integer(1)));
        assert_eq!(rows[0].get("ADM_RATE"), Some(&RawValue::Float(0.4)));
        assert_eq!(rows[0].get("SAT_AVG"), Some(&RawValue::Null));
        assert_eq!(rows[1].get("ADM_RATE"), Some(&RawValue::Text("NA".into())));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn parquet_cells_keep_their_arrow_types() {
        use arrow::array::ArrayRef;
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("INSTNM", DataType::Utf8, true),
            Field::new("CONTROL", DataType::Int32, false),
            Field::new("UNITID", DataType::Int64, false),
            Field::new("ADM_RATE", DataType::Float32, true),
            Field::new("SAT_AVG", DataType::Float64, true),
            Field::new("CITY", DataType::Boolean, true),
            Field::new("EXTRA", DataType::Utf8, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![Some("Alpha"), None])),
            Arc::new(Int32Array::from(vec![1, 3])),
            Arc::new(Int64Array::from(vec![100, 101])),
            Arc::new(Float32Array::from(vec![Some(0.5), None])),
            Arc::new(Float64Array::from(vec![None, Some(1210.0)])),
            Arc::new(BooleanArray::from(vec![Some(true), None])),
            Arc::new(StringArray::from(vec![Some("x"), Some("y")])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let path = std::env::temp_dir().join(format!(
            "scorecard-explorer-{}-rows.parquet",
            std::process::id()
        ));
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let rows = load_rows(&path, &retained_columns()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("EXTRA"));
        assert!(!rows[0].contains_key("UGDS"));
        assert_eq!(rows[0].get("INSTNM"), Some(&RawValue::Text("Alpha".into())));
        assert_eq!(rows[1].get("INSTNM"), Some(&RawValue::Null));
        assert_eq!(rows[1].get("CONTROL"), Some(&RawValue::Integer(3)));
        assert_eq!(rows[0].get("UNITID"), Some(&RawValue::Integer(100)));
        assert_eq!(rows[0].get("ADM_RATE"), Some(&RawValue::Float(0.5)));
        assert_eq!(rows[1].get("ADM_RATE"), Some(&RawValue::Null));
        assert_eq!(rows[0].get("SAT_AVG"), Some(&RawValue::Null));
        assert_eq!(rows[1].get("SAT_AVG"), Some(&RawValue::Float(1210.0)));
        assert_eq!(rows[0].get("CITY"), Some(&RawValue::Bool(true)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let path = temp_file("bad.json", r#"{"INSTNM": "Alpha"}"#);
        let err = load_rows(&path, &retained_columns()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::NotARowArray)
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_rows(Path::new("institutions.xlsx"), &retained_columns()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("scorecard-explorer-does-not-exist.csv");
        assert!(ensure_readable(&path).is_err());
        assert!(load_dataset(&path, DEFAULT_MIN_PRESENT).is_err());
    }
}
