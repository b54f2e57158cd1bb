use serde::{Deserialize, Serialize};

use crate::dtos::checklist::DocumentChecklist;
use crate::dtos::eligibility::EligibilityResult;
use crate::dtos::features::BorrowerFeatureVector;

/// The complete report artifact for a case.
///
/// Serialized as JSON into `case_reports.report_data`; the PDF rendering and
/// the WhatsApp summary are both derived from this structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReportData {
    pub case_id: String,
    pub borrower_profile: BorrowerFeatureVector,
    pub checklist: DocumentChecklist,
    pub strengths: Vec<String>,
    pub risk_flags: Vec<String>,
    pub lender_matches: Vec<EligibilityResult>,
    pub submission_strategy: String,
    pub missing_data_advisory: Vec<String>,
    /// e.g. "₹7.5L - ₹50.0L", from the top-ranked passing product.
    pub expected_loan_range: Option<String>,
}
