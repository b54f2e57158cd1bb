use serde::{Deserialize, Serialize};

use crate::models::enums::{DocumentKind, ProgramType};

/// Document coverage snapshot for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChecklist {
    pub program_type: ProgramType,
    /// Document kinds covered, either by a classified upload or by a manual
    /// override acting as a virtual document.
    pub available: Vec<DocumentKind>,
    /// Required kinds still missing.
    pub missing: Vec<DocumentKind>,
    /// Filenames of uploads that could not be classified.
    pub unreadable: Vec<String>,
    pub optional_present: Vec<DocumentKind>,
    /// (covered required slots / total required slots) x 100.
    pub completeness_score: f64,
}

/// Progressive data-capture prompt for a missing document.
///
/// When a document that feeds a feature slot is missing, the operator can be
/// asked for the value directly; the manual entry then covers the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualFieldPrompt {
    pub field_name: String,
    pub label: String,
    pub reason: String,
    pub field_type: String,
    pub current_value: Option<serde_json::Value>,
}
