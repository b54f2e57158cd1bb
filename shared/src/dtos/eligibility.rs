use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::enums::{ApprovalProbability, HardFilterStatus};

/// One component of the weighted eligibility score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub component: String,
    pub label: String,
    pub weight: u32,
    pub score: f64,
    pub weighted_contribution: f64,
    pub note: String,
}

/// Thresholds the product applied during hard filtering, echoed back for
/// explainability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LenderThresholds {
    pub min_cibil_score: Option<i32>,
    pub min_vintage_years: Option<f64>,
    pub min_turnover_annual: Option<f64>,
    pub max_ticket_size: Option<f64>,
    pub min_abb: Option<f64>,
}

/// Commercial terms surfaced with a match. Sparse policy rows are filled
/// from product-bucket fallbacks and per-lender overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LenderTerms {
    pub interest_rate_range: Option<String>,
    pub processing_fee_pct: Option<f64>,
    pub expected_tat_days: Option<i32>,
    pub tenor_min_months: Option<i32>,
    pub tenor_max_months: Option<i32>,
}

/// Explainability payload attached to passing results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExplainability {
    pub matched_signals: Vec<String>,
    pub score_breakdown: Vec<ScoreComponent>,
    pub lender_thresholds: LenderThresholds,
    pub lender_terms: LenderTerms,
}

/// Structured details of a hard-filter outcome.
///
/// Failing rows carry the reason map keyed by filter name; passing rows carry
/// the explainability payload. Serialized untagged so the stored JSON matches
/// whichever shape applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HardFilterDetails {
    Explainability(MatchExplainability),
    Failures(BTreeMap<String, String>),
}

impl HardFilterDetails {
    pub fn failures(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            HardFilterDetails::Failures(map) => Some(map),
            HardFilterDetails::Explainability(_) => None,
        }
    }

    pub fn explainability(&self) -> Option<&MatchExplainability> {
        match self {
            HardFilterDetails::Explainability(payload) => Some(payload),
            HardFilterDetails::Failures(_) => None,
        }
    }
}

/// Scoring outcome for one (case, lender product) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub lender_name: String,
    pub product_name: String,
    pub hard_filter_status: HardFilterStatus,
    pub details: HardFilterDetails,
    /// Present only on passing rows, in [0, 100].
    pub eligibility_score: Option<f64>,
    pub approval_probability: Option<ApprovalProbability>,
    /// Expected ticket bounds in Lakhs.
    pub expected_ticket_min: Option<f64>,
    pub expected_ticket_max: Option<f64>,
    /// Feature-completeness-derived confidence in [0, 1].
    pub confidence: f64,
    pub missing_for_improvement: Vec<String>,
    /// 1-based rank among passing rows; failing rows stay unranked.
    pub rank: Option<i32>,
}

/// A prioritized improvement derived from aggregated failure reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicRecommendation {
    /// Number of products this fix would unlock; drives the ordering.
    pub priority: i64,
    /// 1-based position after sorting by priority.
    pub priority_rank: i32,
    pub issue: String,
    pub current: Option<String>,
    pub target: Option<String>,
    pub impact: String,
    pub action: String,
    pub lenders_affected: Vec<String>,
}

/// Full scoring response for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub case_id: String,
    pub total_lenders_evaluated: i64,
    pub lenders_passed: i64,
    pub results: Vec<EligibilityResult>,
    /// Human-readable narrative lines, populated when nothing passed.
    pub rejection_reasons: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub dynamic_recommendations: Vec<DynamicRecommendation>,
}
