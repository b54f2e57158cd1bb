use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{CaseStatus, EntityType, ProgramType};

/// Request payload for creating a new case.
///
/// Every field is optional: an operator may create an empty shell and fill
/// borrower descriptors later, or let GST autofill populate them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCaseRequest {
    pub borrower_name: Option<String>,
    pub entity_type: Option<EntityType>,
    pub program_type: Option<ProgramType>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,
    /// Requested loan amount in Lakhs.
    pub loan_amount_requested: Option<f64>,
}

/// Partial update of a case, including the manual override slots.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCaseRequest {
    pub borrower_name: Option<String>,
    pub entity_type: Option<EntityType>,
    pub program_type: Option<ProgramType>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,
    pub loan_amount_requested: Option<f64>,
    pub gstin: Option<String>,
    /// Manual CIBIL score, counted as covering the CIBIL report slot.
    pub cibil_score_manual: Option<i32>,
    /// Manual business vintage in years, covering the GST certificate slot.
    pub business_vintage_years: Option<f64>,
    /// Manual monthly turnover in rupees, covering the GST returns slot.
    pub monthly_turnover_manual: Option<f64>,
}

/// Full case representation returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResponse {
    pub id: Uuid,
    /// Human-readable id of the form `CASE-YYYYMMDD-NNNN`.
    pub case_id: String,
    pub status: CaseStatus,
    pub program_type: Option<ProgramType>,
    pub borrower_name: Option<String>,
    pub entity_type: Option<String>,
    pub completeness_score: f64,
    pub cibil_score_manual: Option<i32>,
    pub business_vintage_years: Option<f64>,
    pub monthly_turnover_manual: Option<f64>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,
    pub loan_amount_requested: Option<f64>,
    pub gstin: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Background-processing visibility for a case.
///
/// Surfaces document and job counts so callers can tell whether extraction
/// is safe to trigger and how many documents failed along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStatusSummary {
    pub case_id: String,
    pub status: CaseStatus,
    pub completeness_score: f64,
    pub documents_total: i64,
    pub documents_classified: i64,
    pub documents_failed: i64,
    pub jobs_pending: i64,
    pub jobs_failed: i64,
}
