use serde::{Deserialize, Serialize};

use crate::models::enums::FieldSource;

/// A single piece of extracted evidence.
///
/// Rows are append-only: a field may appear multiple times per case, and the
/// assembler picks the latest row with the highest confidence per name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFieldItem {
    pub field_name: String,
    pub field_value: String,
    /// Confidence in [0, 1]; a failed validation halves it but keeps the row.
    pub confidence: f64,
    pub source: FieldSource,
}

impl ExtractedFieldItem {
    pub fn new(name: &str, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            field_name: name.to_string(),
            field_value: value.into(),
            confidence,
            source: FieldSource::Extraction,
        }
    }

    pub fn from_bank_analysis(name: &str, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            field_name: name.to_string(),
            field_value: value.into(),
            confidence,
            source: FieldSource::BankAnalysis,
        }
    }
}
