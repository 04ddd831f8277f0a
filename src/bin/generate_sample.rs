use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Minimal deterministic PRNG (SplitMix64)
struct SampleRng {
    state: u64,
}

impl SampleRng {
    fn new(seed: u64) -> Self {
        SampleRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One generated visit, in source column order.
#[derive(Serialize)]
struct Visit {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Group")]
    group: i64,
    #[serde(rename = "Sex")]
    sex: &'static str,
    #[serde(rename = "Age")]
    age: i64,
    #[serde(rename = "ExamDate")]
    exam_date: NaiveDate,
    #[serde(rename = "Hemoglobin")]
    hemoglobin: f64,
    #[serde(rename = "Ferritin")]
    ferritin: f64,
    #[serde(rename = "Protein")]
    protein: f64,
    #[serde(rename = "HeartRate")]
    heart_rate: i64,
    #[serde(rename = "SelfRatedHealth")]
    self_rated_health: i64,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn generate(rng: &mut SampleRng) -> Vec<Visit> {
    // (group, hemoglobin mean, ferritin mean) per study arm
    let arms = [(1, 118.0, 35.0), (2, 131.0, 70.0), (3, 142.0, 110.0)];
    let first_exam = NaiveDate::from_ymd_opt(2023, 1, 9).unwrap_or_default();

    let mut visits = Vec::new();
    for patient in 0..90 {
        let (group, hb_mean, fer_mean) = arms[patient % arms.len()];
        let sex = if rng.next_f64() < 0.5 { "F" } else { "M" };
        let sex_shift = if sex == "M" { 8.0 } else { 0.0 };
        let age = rng.range(18, 80);
        let start = rng.range(0, 120) as u64;

        for visit in 0..3u64 {
            let hemoglobin = rng.gauss(hb_mean + sex_shift, 9.0);
            let ferritin = rng.gauss(fer_mean, fer_mean * 0.3).max(3.0);
            let protein = rng.gauss(70.0, 5.5);
            // healthier blood work, better self-rating
            let score = 5.5 + (hemoglobin - 130.0) / 12.0 + rng.gauss(0.0, 1.2);

            visits.push(Visit {
                id: format!("P{:03}", patient + 1),
                group,
                sex,
                age,
                exam_date: first_exam + Days::new(start + visit * 90),
                hemoglobin: round1(hemoglobin),
                ferritin: round1(ferritin),
                protein: round1(protein),
                heart_rate: rng.gauss(74.0, 9.0).round() as i64,
                self_rated_health: score.round().clamp(1.0, 10.0) as i64,
            });
        }
    }
    visits
}

fn to_batch(visits: &[Visit]) -> Result<RecordBatch> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

    let schema = Arc::new(Schema::new(vec![
        Field::new("ID", DataType::Utf8, false),
        Field::new("Group", DataType::Int64, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("Age", DataType::Int64, false),
        Field::new("ExamDate", DataType::Date32, false),
        Field::new("Hemoglobin", DataType::Float64, false),
        Field::new("Ferritin", DataType::Float64, false),
        Field::new("Protein", DataType::Float64, false),
        Field::new("HeartRate", DataType::Int64, false),
        Field::new("SelfRatedHealth", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(visits.iter().map(|v| v.id.as_str()))),
        Arc::new(Int64Array::from_iter_values(visits.iter().map(|v| v.group))),
        Arc::new(StringArray::from_iter_values(visits.iter().map(|v| v.sex))),
        Arc::new(Int64Array::from_iter_values(visits.iter().map(|v| v.age))),
        Arc::new(Date32Array::from_iter_values(
            visits
                .iter()
                .map(|v| (v.exam_date - epoch).num_days() as i32),
        )),
        Arc::new(Float64Array::from_iter_values(visits.iter().map(|v| v.hemoglobin))),
        Arc::new(Float64Array::from_iter_values(visits.iter().map(|v| v.ferritin))),
        Arc::new(Float64Array::from_iter_values(visits.iter().map(|v| v.protein))),
        Arc::new(Int64Array::from_iter_values(visits.iter().map(|v| v.heart_rate))),
        Arc::new(Int64Array::from_iter_values(
            visits.iter().map(|v| v.self_rated_health),
        )),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn main() -> Result<()> {
    let mut rng = SampleRng::new(42);
    let visits = generate(&mut rng);

    // Parquet
    let parquet_path = "sample_data.parquet";
    let batch = to_batch(&visits)?;
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    // CSV with the same rows
    let csv_path = "sample_data.csv";
    let mut csv_writer = csv::Writer::from_path(csv_path).context("creating CSV output")?;
    for visit in &visits {
        csv_writer.serialize(visit)?;
    }
    csv_writer.flush()?;

    println!(
        "Wrote {} visits of {} patients to {parquet_path} and {csv_path}",
        visits.len(),
        visits.len() / 3
    );
    Ok(())
}
