use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::ProgramType;

/// The full policy row for one lender product, as consumed by the
/// eligibility engine.
///
/// Numeric policy figures follow the policy-sheet conventions:
/// `min_turnover_annual` and `max_ticket_size` are in Lakhs, `min_abb` is in
/// Lakhs as parsed from the sheet (converted to rupees by the caller when
/// compared against bank metrics).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LenderProductRule {
    pub lender_name: String,
    pub product_name: String,
    pub program_type: Option<ProgramType>,
    pub policy_available: bool,

    // Hard-filter thresholds
    pub min_vintage_years: Option<f64>,
    pub min_cibil_score: Option<i32>,
    pub min_turnover_annual: Option<f64>,
    pub max_ticket_size: Option<f64>,
    pub min_abb: Option<f64>,
    pub eligible_entity_types: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,

    // Derogatory-history rules
    pub no_30plus_dpd_months: Option<i32>,
    pub no_60plus_dpd_months: Option<i32>,
    pub no_90plus_dpd_months: Option<i32>,
    pub max_enquiries_rule: Option<String>,
    pub emi_bounce_rule: Option<String>,
    pub max_overdue_amount: Option<f64>,

    // Banking and documentation requirements
    pub banking_months_required: Option<i32>,
    pub ownership_proof_required: bool,
    pub gst_required: bool,
    pub kyc_documents: Option<String>,

    // Verification requirements
    pub tele_pd_required: bool,
    pub video_kyc_required: bool,
    pub fi_required: bool,

    // Commercial terms
    pub interest_rate_range: Option<String>,
    pub processing_fee_pct: Option<f64>,
    pub expected_tat_days: Option<i32>,
    pub tenor_min_months: Option<i32>,
    pub tenor_max_months: Option<i32>,
}

/// Lender listing row with aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LenderSummary {
    pub id: Uuid,
    pub lender_name: String,
    pub lender_code: String,
    pub is_active: bool,
    pub product_count: i64,
    pub pincode_count: i64,
}

/// Aggregate figures over the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub lender_count: i64,
    pub product_count: i64,
    pub products_with_policy: i64,
    pub pincode_count: i64,
}

/// Outcome of a policy CSV ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyIngestStats {
    pub rows_processed: i64,
    pub lenders_created: i64,
    pub products_created: i64,
    pub products_updated: i64,
    pub errors: i64,
}

/// Outcome of a pincode CSV ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PincodeIngestStats {
    pub lenders_mapped: i64,
    pub pincodes_created: i64,
    pub skipped_non_numeric: i64,
    pub errors: i64,
}
