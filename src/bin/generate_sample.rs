use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const ROWS: usize = 800;
const CSV_PATH: &str = "sample_scorecard.csv";
const PARQUET_PATH: &str = "sample_scorecard.parquet";

const ID_COLUMNS: [&str; 6] = ["UNITID", "INSTNM", "CITY", "STABBR", "CONTROL", "REGION"];

const METRIC_COLUMNS: [&str; 22] = [
    "ADM_RATE", "SAT_AVG", "UGDS", "COSTT4_A", "TUITIONFEE_IN", "TUITIONFEE_OUT",
    "INEXPFTE", "AVGFACSAL", "PCTPELL", "UGDS_WHITE", "UGDS_BLACK", "UGDS_HISP",
    "UGDS_ASIAN", "PPTUG_EF", "C150_4", "C200_4", "MD_EARN_WNE_P10", "DEBT_MDN",
    "GRAD_DEBT_MDN", "RPY_3YR_RT", "RET_FT4", "CDR3",
];

/// Columns kept on deliberately sparse rows; everything else is blank.
const SPARSE_KEEP: [&str; 2] = ["COSTT4_A", "C150_4"];

/// (postal code, BEA region code)
const STATES: [(&str, i64); 51] = [
    ("CT", 1), ("ME", 1), ("MA", 1), ("NH", 1), ("RI", 1), ("VT", 1),
    ("DE", 2), ("DC", 2), ("MD", 2), ("NJ", 2), ("NY", 2), ("PA", 2),
    ("IL", 3), ("IN", 3), ("MI", 3), ("OH", 3), ("WI", 3),
    ("IA", 4), ("KS", 4), ("MN", 4), ("MO", 4), ("NE", 4), ("ND", 4), ("SD", 4),
    ("AL", 5), ("AR", 5), ("FL", 5), ("GA", 5), ("KY", 5), ("LA", 5), ("MS", 5),
    ("NC", 5), ("SC", 5), ("TN", 5), ("VA", 5), ("WV", 5),
    ("AZ", 6), ("NM", 6), ("OK", 6), ("TX", 6),
    ("CO", 7), ("ID", 7), ("MT", 7), ("UT", 7), ("WY", 7),
    ("AK", 8), ("CA", 8), ("HI", 8), ("NV", 8), ("OR", 8), ("WA", 8),
];

const CITIES: [&str; 12] = [
    "Springfield", "Riverside", "Franklin", "Greenville", "Fairview", "Madison",
    "Georgetown", "Salem", "Clinton", "Oxford", "Arlington", "Ashland",
];

const NAME_PREFIXES: [&str; 8] = [
    "Northern", "Central", "Lakeside", "Summit", "Valley", "Eastern", "Pioneer", "Harbor",
];

const NAME_SUFFIXES: [(&str, i64); 6] = [
    ("State University", 1),
    ("Community College", 1),
    ("College", 2),
    ("University", 2),
    ("Institute of Technology", 3),
    ("Career College", 3),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

struct Institution {
    unit_id: i64,
    name: String,
    city: String,
    state: String,
    control: i64,
    region: i64,
    /// One slot per `METRIC_COLUMNS` entry.
    metrics: Vec<Option<f64>>,
}

fn fraction(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Metric values for one institution, in `METRIC_COLUMNS` order. A latent
/// "selectivity" drives most of them so the charts show real correlations.
fn generate_metrics(control: i64, rng: &mut SimpleRng) -> Vec<f64> {
    let s = rng.next_f64();
    let for_profit = control == 3;
    let public = control == 1;

    let adm_rate = fraction(0.95 - 0.8 * s + rng.gauss(0.0, 0.06)).max(0.04);
    let sat = (900.0 + 550.0 * s + rng.gauss(0.0, 40.0)).clamp(800.0, 1580.0);
    let enrollment = rng.gauss(8.0, 1.1).exp().round().max(50.0);
    let cost = match control {
        1 => 18_000.0 + 12_000.0 * s,
        2 => 35_000.0 + 45_000.0 * s,
        _ => 26_000.0 + 6_000.0 * rng.next_f64(),
    } + rng.gauss(0.0, 2_000.0);
    let tuition_in = if public { 6_000.0 + 6_000.0 * s } else { cost * 0.7 };
    let tuition_out = if public { tuition_in * 2.6 } else { tuition_in };
    let spend = 7_000.0 + 35_000.0 * s * s + rng.gauss(0.0, 1_500.0);
    let salary = 5_500.0 + 7_000.0 * s + rng.gauss(0.0, 400.0);
    let for_profit_bump = if for_profit { 0.12 } else { 0.0 };
    let pell = fraction(0.6 - 0.45 * s + 1.25 * for_profit_bump + rng.gauss(0.0, 0.05));

    let weights: Vec<f64> = (0..4).map(|_| rng.next_f64() + 0.1).collect();
    let total: f64 = weights.iter().sum::<f64>() / 0.95;
    let shares: Vec<f64> = weights.iter().map(|w| w / total).collect();

    let part_time = fraction(0.35 - 0.3 * s + rng.gauss(0.0, 0.05));
    let completion = fraction(0.25 + 0.65 * s - for_profit_bump + rng.gauss(0.0, 0.06));
    let completion_200 = fraction(completion + 0.04 + 0.03 * rng.next_f64());
    let earnings = 28_000.0 + 50_000.0 * s + rng.gauss(0.0, 4_000.0);
    let debt = 11_000.0 + 9_000.0 * rng.next_f64() + if for_profit { 5_000.0 } else { 0.0 };
    let grad_debt = debt * (1.2 + 0.2 * rng.next_f64());
    let repayment = fraction(0.3 + 0.5 * s + rng.gauss(0.0, 0.05));
    let retention = fraction(0.6 + 0.35 * s + rng.gauss(0.0, 0.04));
    let default_rate = fraction(0.16 - 0.13 * s + rng.gauss(0.0, 0.02));

    vec![
        adm_rate, sat, enrollment, cost, tuition_in, tuition_out, spend, salary, pell,
        shares[0], shares[1], shares[2], shares[3], part_time, completion, completion_200,
        earnings, debt, grad_debt, repayment, retention, default_rate,
    ]
}

fn generate(rng: &mut SimpleRng) -> Vec<Institution> {
    (0..ROWS)
        .map(|i| {
            let (suffix, control) = *rng.pick(&NAME_SUFFIXES);
            let (state, region) = *rng.pick(&STATES);
            let city = *rng.pick(&CITIES);
            let name = format!("{} {city} {suffix}", rng.pick(&NAME_PREFIXES));
            let values = generate_metrics(control, rng);
            let sparse = i % 40 == 39;
            let metrics = METRIC_COLUMNS
                .iter()
                .zip(values)
                .map(|(column, v)| {
                    let missing = if sparse {
                        !SPARSE_KEEP.contains(column)
                    } else if *column == "SAT_AVG" {
                        control != 2 && rng.chance(0.35)
                    } else {
                        rng.chance(0.06)
                    };
                    (!missing).then_some(v)
                })
                .collect();
            Institution {
                unit_id: 100_000 + i as i64 * 7,
                name,
                city: city.to_string(),
                state: state.to_string(),
                control,
                region,
                metrics,
            }
        })
        .collect()
}

fn format_metric(column: &str, value: f64) -> String {
    if value.abs() >= 100.0 || column == "UGDS" {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn write_csv(rows: &[Institution], rng: &mut SimpleRng) -> Result<()> {
    let mut writer = csv::Writer::from_path(CSV_PATH).context("creating CSV file")?;
    writer.write_record(ID_COLUMNS.iter().chain(METRIC_COLUMNS.iter()))?;
    for row in rows {
        let mut record = vec![
            row.unit_id.to_string(),
            row.name.clone(),
            row.city.clone(),
            row.state.clone(),
            row.control.to_string(),
            row.region.to_string(),
        ];
        for (column, value) in METRIC_COLUMNS.iter().zip(&row.metrics) {
            // The real export mixes both spellings of "missing".
            record.push(match value {
                Some(v) => format_metric(column, *v),
                None if rng.chance(0.5) => "NA".to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(rows: &[Institution]) -> Result<()> {
    let mut fields = vec![
        Field::new("UNITID", DataType::Int64, false),
        Field::new("INSTNM", DataType::Utf8, false),
        Field::new("CITY", DataType::Utf8, false),
        Field::new("STABBR", DataType::Utf8, false),
        Field::new("CONTROL", DataType::Int64, false),
        Field::new("REGION", DataType::Int64, false),
    ];
    fields.extend(METRIC_COLUMNS.iter().map(|c| Field::new(*c, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let strings = |f: fn(&Institution) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.unit_id).collect::<Vec<_>>())),
        strings(|r| r.name.as_str()),
        strings(|r| r.city.as_str()),
        strings(|r| r.state.as_str()),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.control).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.region).collect::<Vec<_>>())),
    ];
    for slot in 0..METRIC_COLUMNS.len() {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.metrics[slot]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(PARQUET_PATH).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    write_csv(&rows, &mut rng)?;
    write_parquet(&rows)?;

    let sparse = rows
        .iter()
        .filter(|r| r.metrics.iter().filter(|m| m.is_some()).count() <= SPARSE_KEEP.len())
        .count();
    println!(
        "Wrote {} institutions ({sparse} deliberately sparse) to {CSV_PATH} and {PARQUET_PATH}",
        rows.len()
    );
    Ok(())
}
