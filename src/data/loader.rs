use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type, UInt64Type};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Dataset, Record};

/// Header names of the fixed source schema, in source order.
pub const COLUMNS: [&str; 10] = [
    "ID",
    "Group",
    "Sex",
    "Age",
    "ExamDate",
    "Hemoglobin",
    "Ferritin",
    "Protein",
    "HeartRate",
    "SelfRatedHealth",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a patient dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per schema field (recommended)
/// * `.json`    – `[{ "ID": ..., "Group": ..., ... }, ...]`
/// * `.csv`     – header row with the schema's column names
///
/// Any malformed row fails the whole load; there is no partial dataset.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    log::debug!("parsed {} rows from {}", records.len(), path.display());

    Dataset::from_records(records).with_context(|| format!("validating {}", path.display()))
}

// ---------------------------------------------------------------------------
// Row schema shared by the CSV and JSON loaders
// ---------------------------------------------------------------------------

/// A categorical JSON value that may be a string or a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Label {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

/// Exam dates arrive as text, or as epoch milliseconds in
/// `to_json(orient='records')` exports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateCell {
    EpochMillis(i64),
    Text(String),
}

/// A raw label cell, turned into the string stored on a [`Record`].
trait LabelCell {
    fn into_label(self) -> String;
}

/// CSV cells are kept verbatim: `007` and `7` are different identifiers.
impl LabelCell for String {
    fn into_label(self) -> String {
        self.trim().to_string()
    }
}

impl LabelCell for Label {
    fn into_label(self) -> String {
        match self {
            Label::Int(i) => i.to_string(),
            Label::UInt(u) => u.to_string(),
            Label::Float(f) => format_label(f),
            Label::Text(s) => s.trim().to_string(),
        }
    }
}

/// A raw exam-date cell.
trait DateField {
    fn into_date(self, row: usize) -> Result<NaiveDate>;
}

/// CSV dates are always text; a bare number like `20230402` is rejected.
impl DateField for String {
    fn into_date(self, row: usize) -> Result<NaiveDate> {
        parse_exam_date(&self).with_context(|| format!("Row {row}: bad ExamDate"))
    }
}

impl DateField for DateCell {
    fn into_date(self, row: usize) -> Result<NaiveDate> {
        match self {
            DateCell::EpochMillis(ms) => DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.date_naive())
                .with_context(|| format!("Row {row}: ExamDate {ms} out of range")),
            DateCell::Text(text) => text.into_date(row),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord<L, D> {
    #[serde(rename = "ID")]
    id: L,
    #[serde(rename = "Group")]
    group: L,
    #[serde(rename = "Sex")]
    sex: L,
    #[serde(rename = "Age")]
    age: f64,
    #[serde(rename = "ExamDate")]
    exam_date: D,
    #[serde(rename = "Hemoglobin")]
    hemoglobin: f64,
    #[serde(rename = "Ferritin")]
    ferritin: f64,
    #[serde(rename = "Protein")]
    protein: f64,
    #[serde(rename = "HeartRate")]
    heart_rate: f64,
    #[serde(rename = "SelfRatedHealth")]
    self_rated_health: f64,
}

/// JSON keeps value types, so numbers and epoch dates are meaningful.
type JsonRecord = RawRecord<Label, DateCell>;

/// CSV cells carry no type; labels and dates are read as text.
type CsvRecord = RawRecord<String, String>;

impl<L: LabelCell, D: DateField> RawRecord<L, D> {
    fn into_record(self, row: usize) -> Result<Record> {
        Ok(Record {
            exam_date: self.exam_date.into_date(row)?,
            id: self.id.into_label(),
            group: self.group.into_label(),
            sex: self.sex.into_label(),
            age: self.age,
            hemoglobin: self.hemoglobin,
            ferritin: self.ferritin,
            protein: self.protein,
            heart_rate: self.heart_rate,
            self_rated_health: self.self_rated_health,
        })
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "ID": 1, "Group": 1, "Sex": "M", "Age": 34, "ExamDate": "2023-04-02",
///     "Hemoglobin": 141.0, "Ferritin": 88.5, "Protein": 71.2,
///     "HeartRate": 68, "SelfRatedHealth": 7 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rows: Vec<JsonRecord> = serde_json::from_str(&text).context("parsing JSON")?;

    rows.into_iter()
        .enumerate()
        .map(|(i, raw)| raw.into_record(i))
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the schema's column names, any order.
/// Extra columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;

    let headers = reader.headers().context("reading CSV headers")?.clone();
    for col in COLUMNS {
        if !headers.iter().any(|h| h == col) {
            bail!("CSV missing '{col}' column");
        }
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<CsvRecord>().enumerate() {
        let raw = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(raw.into_record(row_no)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per schema field.
///
/// Label columns may be strings, dictionaries or numbers; numeric columns any
/// integer or float type; `ExamDate` a Date32/Date64/Timestamp or text column.
/// Works with files written by both **Pandas** and **Polars**.
fn load_parquet(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let ids = extract_labels(&batch, "ID")?;
        let groups = extract_labels(&batch, "Group")?;
        let sexes = extract_labels(&batch, "Sex")?;
        let ages = extract_f64(&batch, "Age")?;
        let dates = extract_dates(&batch, "ExamDate")?;
        let hemoglobin = extract_f64(&batch, "Hemoglobin")?;
        let ferritin = extract_f64(&batch, "Ferritin")?;
        let protein = extract_f64(&batch, "Protein")?;
        let heart_rate = extract_f64(&batch, "HeartRate")?;
        let health = extract_f64(&batch, "SelfRatedHealth")?;

        for row in 0..batch.num_rows() {
            records.push(Record {
                id: ids[row].clone(),
                group: groups[row].clone(),
                sex: sexes[row].clone(),
                age: ages[row],
                exam_date: dates[row],
                hemoglobin: hemoglobin[row],
                ferritin: ferritin[row],
                protein: protein[row],
                heart_rate: heart_rate[row],
                self_rated_health: health[row],
            });
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

fn ensure_no_nulls(col: &ArrayRef, name: &str) -> Result<()> {
    if col.null_count() > 0 {
        let row = (0..col.len()).find(|&i| col.is_null(i)).unwrap_or(0);
        bail!("Row {row}: null value in '{name}'");
    }
    Ok(())
}

/// Read a categorical column as display strings.
fn extract_labels(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let col = column_by_name(batch, name)?;
    ensure_no_nulls(col, name)?;
    match col.data_type() {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let ints = cast(col, &DataType::Int64).with_context(|| format!("casting '{name}'"))?;
            Ok(ints
                .as_primitive::<Int64Type>()
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect())
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let ints = cast(col, &DataType::UInt64).with_context(|| format!("casting '{name}'"))?;
            Ok(ints
                .as_primitive::<UInt64Type>()
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect())
        }
        DataType::Float32 | DataType::Float64 => Ok(f64_values(col, name)?
            .into_iter()
            .map(format_label)
            .collect()),
        _ => {
            let text = cast(col, &DataType::Utf8)
                .with_context(|| format!("'{name}' cannot be read as text"))?;
            Ok(text
                .as_string::<i32>()
                .iter()
                .map(|v| v.unwrap_or_default().trim().to_string())
                .collect())
        }
    }
}

/// Read a numeric column as `f64`.
fn extract_f64(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let col = column_by_name(batch, name)?;
    ensure_no_nulls(col, name)?;
    f64_values(col, name)
}

fn f64_values(col: &ArrayRef, name: &str) -> Result<Vec<f64>> {
    let floats = cast(col, &DataType::Float64)
        .with_context(|| format!("'{name}' is not numeric ({:?})", col.data_type()))?;
    Ok(floats.as_primitive::<Float64Type>().values().to_vec())
}

/// Read the exam-date column, normalising to calendar dates.
fn extract_dates(batch: &RecordBatch, name: &str) -> Result<Vec<NaiveDate>> {
    let col = column_by_name(batch, name)?;
    ensure_no_nulls(col, name)?;
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let text = cast(col, &DataType::Utf8).with_context(|| format!("casting '{name}'"))?;
            text.as_string::<i32>()
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    parse_exam_date(v.unwrap_or_default())
                        .with_context(|| format!("Row {row}: bad {name}"))
                })
                .collect()
        }
        _ => {
            let days = cast(col, &DataType::Date32)
                .with_context(|| format!("'{name}' is not a date ({:?})", col.data_type()))?;
            let days = days.as_primitive::<Date32Type>();
            (0..days.len())
                .map(|row| {
                    days.value_as_date(row)
                        .with_context(|| format!("Row {row}: {name} out of range"))
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse an exam date written in any of the accepted text layouts.
pub fn parse_exam_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    bail!("'{text}' is not a recognised date")
}

/// Render a numeric label without a spurious fractional part (`1.0` → `1`).
fn format_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 4, 2).unwrap();
        for text in [
            "2023-04-02",
            "02.04.2023",
            "04/02/2023",
            "2023-04-02 08:15:00",
            "2023-04-02T08:15:00.250",
            "2023-04-02T08:15:00+03:00",
        ] {
            assert_eq!(parse_exam_date(text).unwrap(), expected, "{text}");
        }
        assert!(parse_exam_date("yesterday").is_err());
    }

    #[test]
    fn numeric_labels_drop_trailing_zero() {
        assert_eq!(format_label(3.0), "3");
        assert_eq!(format_label(2.5), "2.5");
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("table.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}
