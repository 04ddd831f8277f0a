use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Record – one patient visit (one row of the source table)
// ---------------------------------------------------------------------------

/// A single patient-visit observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Patient / visit identifier.
    pub id: String,
    /// Study-arm label used for selection.
    pub group: String,
    pub sex: String,
    pub age: f64,
    pub exam_date: NaiveDate,
    pub hemoglobin: f64,
    pub ferritin: f64,
    pub protein: f64,
    pub heart_rate: f64,
    pub self_rated_health: f64,
}

impl Record {
    /// Numeric columns paired with their source header names.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 6] {
        [
            ("Age", self.age),
            ("Hemoglobin", self.hemoglobin),
            ("Ferritin", self.ferritin),
            ("Protein", self.protein),
            ("HeartRate", self.heart_rate),
            ("SelfRatedHealth", self.self_rated_health),
        ]
    }
}

/// Rejection reasons for rows that do not fit the fixed schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record {id}: {field} is not a finite number ({value})")]
    NonFinite {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("record {id}: empty group label")]
    EmptyGroup { id: String },
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full, validated dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
    /// Sorted distinct group labels.
    groups: BTreeSet<String>,
}

/// One entry of the group multi-select offered to a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOption {
    pub value: String,
    pub label: String,
}

impl Dataset {
    /// Validate records and build the group index.
    pub fn from_records(records: Vec<Record>) -> Result<Self, RecordError> {
        let mut groups = BTreeSet::new();
        for rec in &records {
            if let Some((field, value)) = rec
                .numeric_fields()
                .into_iter()
                .find(|(_, v)| !v.is_finite())
            {
                return Err(RecordError::NonFinite {
                    id: rec.id.clone(),
                    field,
                    value,
                });
            }
            if rec.group.is_empty() {
                return Err(RecordError::EmptyGroup { id: rec.id.clone() });
            }
            groups.insert(rec.group.clone());
        }
        Ok(Dataset { records, groups })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Sorted distinct group labels.
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Options for a group checklist, in sorted order.
    pub fn group_options(&self) -> Vec<GroupOption> {
        self.groups
            .iter()
            .map(|g| GroupOption {
                value: g.clone(),
                label: format!("Group {g}"),
            })
            .collect()
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
