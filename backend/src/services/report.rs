//! Case intelligence report assembly.
//!
//! Pulls together the borrower profile, the document checklist and the
//! eligibility results into the final deliverable: strengths, risk flags,
//! a submission strategy (LLM narrative with a deterministic fallback),
//! missing-data advisory and the expected loan range. The WhatsApp summary
//! is derived from the same structure.

use shared::dtos::{
    BorrowerFeatureVector, CaseReportData, DocumentChecklist, EligibilityResult,
    LenderProductRule,
};
use shared::models::enums::{ApprovalProbability, HardFilterStatus};

/// Detect and list borrower strengths.
pub fn compute_strengths(
    borrower: &BorrowerFeatureVector,
    lender_matches: &[EligibilityResult],
) -> Vec<String> {
    let mut strengths = Vec::new();

    if let Some(cibil) = borrower.cibil_score {
        if cibil >= 750 {
            strengths.push(format!("Excellent credit score ({})", cibil));
        } else if cibil >= 700 {
            strengths.push(format!("Good credit score ({})", cibil));
        }
    }

    if let Some(turnover) = borrower.annual_turnover {
        if turnover > 50.0 {
            strengths.push(format!("Strong annual turnover (₹{:.1}L)", turnover));
        }
    }

    if let Some(vintage) = borrower.business_vintage_years {
        if vintage > 5.0 {
            strengths.push(format!("Well-established business ({:.1} years)", vintage));
        }
    }

    if borrower.bounce_count_12m == Some(0) {
        strengths.push("Clean banking - zero bounces in 12 months".to_string());
    }

    if let Some(ratio) = borrower.cash_deposit_ratio {
        if ratio < 0.20 {
            strengths.push("Healthy banking - low cash deposit ratio".to_string());
        }
    }

    if let (Some(emi), Some(credit)) = (borrower.emi_outflow_monthly, borrower.monthly_credit_avg)
    {
        if credit > 0.0 && emi / credit * 100.0 < 40.0 {
            strengths.push("Low existing obligations".to_string());
        }
    }

    let high_probability_count = lender_matches
        .iter()
        .filter(|m| m.approval_probability == Some(ApprovalProbability::High))
        .count();
    if high_probability_count >= 3 {
        strengths.push(format!(
            "Strong profile - {} lenders matched with high probability",
            high_probability_count
        ));
    }

    strengths
}

/// Detect and list risk flags.
pub fn compute_risk_flags(
    borrower: &BorrowerFeatureVector,
    checklist: Option<&DocumentChecklist>,
    lender_matches: &[EligibilityResult],
) -> Vec<String> {
    let mut risks = Vec::new();

    if let Some(cibil) = borrower.cibil_score {
        if cibil < 650 {
            risks.push(format!("Low credit score ({}) - limits lender options", cibil));
        }
    }

    if let Some(vintage) = borrower.business_vintage_years {
        if vintage < 2.0 {
            risks.push(format!("Low business vintage ({:.1} years)", vintage));
        }
    }

    if let Some(bounces) = borrower.bounce_count_12m {
        if bounces > 3 {
            risks.push(format!(
                "Banking concern - {} bounced cheques in 12 months",
                bounces
            ));
        }
    }

    if let Some(ratio) = borrower.cash_deposit_ratio {
        if ratio > 0.40 {
            risks.push(format!(
                "High cash deposit ratio ({}%) - some lenders may flag this",
                (ratio * 100.0) as i32
            ));
        }
    }

    if let (Some(emi), Some(credit)) = (borrower.emi_outflow_monthly, borrower.monthly_credit_avg)
    {
        if credit > 0.0 {
            let foir = emi / credit * 100.0;
            if foir > 55.0 {
                risks.push(format!("High existing debt obligations (FOIR: {:.0}%)", foir));
            }
        }
    }

    if let Some(checklist) = checklist {
        if !checklist.missing.is_empty() {
            risks.push(format!(
                "Incomplete documentation - {} required docs missing",
                checklist.missing.len()
            ));
        }
    }

    let passed_count = lender_matches
        .iter()
        .filter(|m| m.hard_filter_status == HardFilterStatus::Pass)
        .count();
    if passed_count == 0 {
        risks.push(format!(
            "No eligible lenders found - consider improving {}",
            suggest_improvements(borrower)
        ));
    }

    risks
}

/// Profile dimensions worth improving when nothing matched.
fn suggest_improvements(borrower: &BorrowerFeatureVector) -> String {
    let mut suggestions = Vec::new();

    if borrower.cibil_score.map(|c| c < 675).unwrap_or(false) {
        suggestions.push("credit score");
    }
    if borrower
        .business_vintage_years
        .map(|v| v < 2.0)
        .unwrap_or(false)
    {
        suggestions.push("business vintage");
    }
    if borrower.gstin.is_none() {
        suggestions.push("GST registration");
    }
    if borrower.bounce_count_12m.map(|b| b > 2).unwrap_or(false) {
        suggestions.push("banking behavior");
    }

    if suggestions.is_empty() {
        "overall profile".to_string()
    } else {
        suggestions.join(", ")
    }
}

/// Special handling notes for a lender product, folded into the strategy.
pub fn special_requirements_note(product: &LenderProductRule) -> Option<String> {
    let mut notes = Vec::new();
    if product.video_kyc_required {
        notes.push("requires Video KYC");
    }
    if product.ownership_proof_required {
        notes.push("needs ownership proof");
    }
    if product.gst_required {
        notes.push("GST mandatory");
    }
    if product.tele_pd_required {
        notes.push("telephonic verification required");
    }
    if product.fi_required {
        notes.push("field investigation required");
    }

    if notes.is_empty() {
        None
    } else {
        Some(notes.join(", "))
    }
}

fn safe_score(value: Option<f64>) -> String {
    match value {
        Some(score) => format!("{:.0}/100", score),
        None => "N/A".to_string(),
    }
}

fn safe_ticket_range(min_ticket: Option<f64>, max_ticket: Option<f64>) -> String {
    match (min_ticket, max_ticket) {
        (Some(min), Some(max)) => format!("₹{:.1}L-₹{:.1}L", min, max),
        (None, Some(max)) => format!("Up to ₹{:.1}L", max),
        (Some(min), None) => format!("From ₹{:.1}L", min),
        (None, None) => "Policy based".to_string(),
    }
}

/// Message used when no product passed the hard filters.
pub const NO_MATCH_STRATEGY: &str = "No lenders currently match this profile. \
Focus on improving the identified risk areas before submission.";

/// System prompt for the narrative strategy call.
pub const STRATEGY_SYSTEM_PROMPT: &str = "You are a seasoned business loan strategist with \
15+ years of experience. You craft compelling, story-driven submission plans that combine \
data-driven insights with strategic storytelling. Your narratives build confidence, provide \
clarity, and turn complex eligibility analysis into actionable wisdom.";

/// Build the user prompt for the LLM narrative strategy from the top match,
/// up to five alternates and the top lender's special requirements.
pub fn build_strategy_prompt(
    borrower: &BorrowerFeatureVector,
    passed: &[EligibilityResult],
    special_notes: Option<&str>,
) -> String {
    let top = &passed[0];

    let credit_profile = match borrower.cibil_score {
        Some(c) if c >= 750 => "excellent",
        Some(c) if c >= 700 => "good",
        _ => "moderate",
    };
    let business_maturity = match borrower.business_vintage_years {
        Some(v) if v >= 5.0 => "well-established",
        Some(v) if v >= 2.0 => "growing",
        _ => "emerging",
    };

    let lender_context: Vec<String> = passed
        .iter()
        .take(5)
        .enumerate()
        .map(|(index, m)| {
            format!(
                "{}. {} - {}: Score {}, Probability {}, Ticket {}",
                index + 1,
                m.lender_name,
                m.product_name,
                safe_score(m.eligibility_score),
                m.approval_probability
                    .map(|p| p.as_str().to_uppercase())
                    .unwrap_or_else(|| "N/A".to_string()),
                safe_ticket_range(m.expected_ticket_min, m.expected_ticket_max)
            )
        })
        .collect();

    format!(
        "You are a senior business loan consultant crafting a strategic submission plan.\n\n\
**THE BORROWER:**\n\
{} operates as a {} with {} years of market presence, a {} enterprise in the {} sector. \
Credit standing: {} (CIBIL: {}). Monthly cash flow: ₹{:.2} Lakhs. \
Average bank balance: ₹{:.2} Lakhs.\n\n\
**THE OPPORTUNITY LANDSCAPE:**\n\
Eligibility analysis identified {} compatible lenders, ranked by match strength:\n{}\n\n\
**SPECIAL CONSIDERATIONS FOR PRIMARY TARGET:**\n{}\n\n\
**YOUR TASK:**\n\
Write a 3-4 paragraph strategic narrative: (1) why {} {} is the ideal first move, citing the \
eligibility score ({}) and the realistic ticket range ({}); (2) the submission playbook, \
documents to prepare and requirements to satisfy; (3) the 2-3 backup lenders and when to \
pivot to each; (4) proactive mitigation of any profile weaknesses. Flowing prose, no bullet \
points, 250-350 words, professional but conversational.",
        borrower.full_name.as_deref().unwrap_or("The borrower"),
        borrower
            .entity_type
            .map(|e| e.as_str().to_string())
            .unwrap_or_else(|| "business entity".to_string()),
        borrower
            .business_vintage_years
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        business_maturity,
        borrower.industry_type.as_deref().unwrap_or("business"),
        credit_profile,
        borrower
            .cibil_score
            .map(|c| c.to_string())
            .unwrap_or_else(|| "pending".to_string()),
        borrower
            .monthly_turnover
            .or(borrower.monthly_credit_avg)
            .unwrap_or(0.0)
            / 100_000.0,
        borrower.avg_monthly_balance.unwrap_or(0.0) / 100_000.0,
        passed.len(),
        lender_context.join("\n"),
        special_notes.unwrap_or("No special requirements noted"),
        top.lender_name,
        top.product_name,
        safe_score(top.eligibility_score),
        safe_ticket_range(top.expected_ticket_min, top.expected_ticket_max),
    )
}

/// Deterministic bullet-point strategy used when the LLM is unreachable or
/// unconfigured.
pub fn fallback_strategy(passed: &[EligibilityResult], special_notes: Option<&str>) -> String {
    if passed.is_empty() {
        return NO_MATCH_STRATEGY.to_string();
    }

    let top = &passed[0];
    let mut parts = Vec::new();

    parts.push(format!(
        "**Primary Target:** {} - {}\n- Eligibility Score: {}\n- Approval Probability: {}\n- Expected Ticket: {}\n",
        top.lender_name,
        top.product_name,
        safe_score(top.eligibility_score),
        top.approval_probability
            .map(|p| p.as_str().to_uppercase())
            .unwrap_or_else(|| "N/A".to_string()),
        safe_ticket_range(top.expected_ticket_min, top.expected_ticket_max)
    ));

    if let Some(notes) = special_notes {
        parts.push(format!("- **Note:** {}\n", notes));
    }

    let approach_order = &passed[1..passed.len().min(5)];
    if !approach_order.is_empty() {
        parts.push("\n**Suggested Approach Order:**".to_string());
        for (index, m) in approach_order.iter().enumerate() {
            parts.push(format!(
                "\n{}. {} - {} (Score: {}, Probability: {})",
                index + 2,
                m.lender_name,
                m.product_name,
                m.eligibility_score
                    .map(|s| format!("{:.0}", s))
                    .unwrap_or_else(|| "N/A".to_string()),
                m.approval_probability
                    .map(|p| p.as_str().to_uppercase())
                    .unwrap_or_else(|| "N/A".to_string())
            ));
        }
    }

    parts.push(
        "\n\n**General Strategy:**\n\
- Submit to the primary target first for best chances\n\
- Prepare all required documents before submission\n\
- If rejected, address feedback before approaching backup lenders"
            .to_string(),
    );

    parts.join("")
}

/// Advisory list of data the report had to do without.
pub fn missing_data_advisory(
    borrower: &BorrowerFeatureVector,
    checklist: Option<&DocumentChecklist>,
) -> Vec<String> {
    let mut advisory = Vec::new();

    if borrower.cibil_score.is_none() {
        advisory.push("CIBIL score not available".to_string());
    }
    if borrower.annual_turnover.is_none() {
        advisory.push("Annual turnover not available".to_string());
    }
    if borrower.business_vintage_years.is_none() {
        advisory.push("Business vintage not available".to_string());
    }
    if let Some(checklist) = checklist {
        for kind in &checklist.missing {
            advisory.push(format!("{} document missing", kind.label()));
        }
    }

    advisory
}

/// Expected loan range string from the top-ranked passing result.
pub fn expected_loan_range(lender_matches: &[EligibilityResult]) -> Option<String> {
    lender_matches
        .iter()
        .find(|m| m.hard_filter_status == HardFilterStatus::Pass)
        .and_then(|top| match (top.expected_ticket_min, top.expected_ticket_max) {
            (Some(min), Some(max)) => Some(format!("₹{:.1}L - ₹{:.1}L", min, max)),
            _ => None,
        })
}

/// Assemble the full report payload from its parts.
pub fn assemble_report(
    case_id: &str,
    borrower: BorrowerFeatureVector,
    checklist: DocumentChecklist,
    lender_matches: Vec<EligibilityResult>,
    submission_strategy: String,
) -> CaseReportData {
    let strengths = compute_strengths(&borrower, &lender_matches);
    let risk_flags = compute_risk_flags(&borrower, Some(&checklist), &lender_matches);
    let advisory = missing_data_advisory(&borrower, Some(&checklist));
    let loan_range = expected_loan_range(&lender_matches);

    CaseReportData {
        case_id: case_id.to_string(),
        borrower_profile: borrower,
        checklist,
        strengths,
        risk_flags,
        lender_matches,
        submission_strategy,
        missing_data_advisory: advisory,
        expected_loan_range: loan_range,
    }
}

/// WhatsApp-friendly plaintext rendering of the report.
pub fn whatsapp_summary(report: &CaseReportData) -> String {
    let borrower = &report.borrower_profile;
    let mut lines = vec![
        format!("📄 *CASE: {}*", report.case_id),
        "━━━━━━━━━━━━━━━━━━━━".to_string(),
        String::new(),
    ];

    lines.push("👤 *BORROWER*".to_string());
    lines.push(borrower.full_name.clone().unwrap_or_else(|| "N/A".to_string()));
    lines.push(format!(
        "{} | {}",
        borrower
            .entity_type
            .map(|e| e.as_str().to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        borrower
            .business_vintage_years
            .map(|v| format!("{:.1}yr", v))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    lines.push(String::new());

    lines.push("📊 *FINANCIAL SNAPSHOT*".to_string());
    lines.push(format!(
        "• CIBIL: {}",
        borrower
            .cibil_score
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    ));
    lines.push(format!(
        "• Turnover: {}",
        borrower
            .annual_turnover
            .map(|t| format!("₹{:.1}L", t))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    lines.push(format!(
        "• ABB: {}",
        borrower
            .avg_monthly_balance
            .map(|b| format!("₹{:.1}L", b / 100_000.0))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    lines.push(String::new());

    if !report.strengths.is_empty() {
        lines.push("💪 *STRENGTHS*".to_string());
        for strength in &report.strengths {
            lines.push(format!("✓ {}", strength));
        }
        lines.push(String::new());
    }

    if !report.risk_flags.is_empty() {
        lines.push("⚠️ *RISK FLAGS*".to_string());
        for risk in &report.risk_flags {
            lines.push(format!("• {}", risk));
        }
        lines.push(String::new());
    }

    if !report.submission_strategy.is_empty() {
        lines.push("📋 *SUBMISSION STRATEGY*".to_string());
        lines.push(report.submission_strategy.clone());
        lines.push(String::new());
    }

    let passed: Vec<&EligibilityResult> = report
        .lender_matches
        .iter()
        .filter(|m| m.hard_filter_status == HardFilterStatus::Pass)
        .collect();

    if passed.is_empty() {
        lines.push("❌ No lenders matched - profile needs improvement".to_string());
        lines.push(String::new());
    } else {
        lines.push(format!("🎯 *TOP MATCHES ({} lenders)*", passed.len()));
        lines.push(String::new());

        for (index, m) in passed.iter().take(5).enumerate() {
            lines.push(format!(
                "*{}. {}* - {}",
                index + 1,
                m.lender_name,
                m.product_name
            ));

            let mut details = Vec::new();
            if let Some(score) = m.eligibility_score {
                details.push(format!("Score: {}/100", score as i64));
            }
            if let Some(probability) = m.approval_probability {
                details.push(format!("Probability: {}", probability.as_str().to_uppercase()));
            }
            if !details.is_empty() {
                lines.push(format!("   {}", details.join(" | ")));
            }
            if let (Some(min), Some(max)) = (m.expected_ticket_min, m.expected_ticket_max) {
                lines.push(format!("   Expected Ticket: ₹{:.1}L-₹{:.1}L", min, max));
            }
            lines.push(String::new());
        }

        if passed.len() > 5 {
            lines.push(format!("   ...and {} more lenders", passed.len() - 5));
            lines.push(String::new());
        }
    }

    if !report.checklist.missing.is_empty() {
        lines.push("📎 *MISSING DOCUMENTS*".to_string());
        for kind in report.checklist.missing.iter().take(5) {
            lines.push(format!("• {}", kind.label()));
        }
        if report.checklist.missing.len() > 5 {
            lines.push(format!(
                "_...and {} more_",
                report.checklist.missing.len() - 5
            ));
        }
        lines.push(String::new());
    }

    lines.push("━━━━━━━━━━━━━━━━━━━━".to_string());
    lines.push("💡 _Complete report in dashboard_".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::dtos::{HardFilterDetails, LenderTerms, LenderThresholds, MatchExplainability};
    use shared::models::enums::{DocumentKind, EntityType, ProgramType};
    use std::collections::BTreeMap;

    fn strong_borrower() -> BorrowerFeatureVector {
        BorrowerFeatureVector {
            full_name: Some("RAVI KUMAR".into()),
            entity_type: Some(EntityType::Proprietorship),
            business_vintage_years: Some(8.0),
            gstin: Some("27AABCU9603R1ZM".into()),
            pincode: Some("400001".into()),
            annual_turnover: Some(120.0),
            avg_monthly_balance: Some(400_000.0),
            monthly_credit_avg: Some(1_000_000.0),
            emi_outflow_monthly: Some(150_000.0),
            bounce_count_12m: Some(0),
            cash_deposit_ratio: Some(0.15),
            cibil_score: Some(780),
            feature_completeness: 85.0,
            ..Default::default()
        }
    }

    fn pass_result(lender: &str, score: f64, probability: ApprovalProbability) -> EligibilityResult {
        EligibilityResult {
            lender_name: lender.to_string(),
            product_name: "BL".to_string(),
            hard_filter_status: HardFilterStatus::Pass,
            details: HardFilterDetails::Explainability(MatchExplainability {
                matched_signals: vec!["CIBIL: 780".to_string()],
                score_breakdown: Vec::new(),
                lender_thresholds: LenderThresholds::default(),
                lender_terms: LenderTerms::default(),
            }),
            eligibility_score: Some(score),
            approval_probability: Some(probability),
            expected_ticket_min: Some(4.5),
            expected_ticket_max: Some(30.0),
            confidence: 0.85,
            missing_for_improvement: Vec::new(),
            rank: Some(1),
        }
    }

    fn fail_result(lender: &str) -> EligibilityResult {
        EligibilityResult {
            lender_name: lender.to_string(),
            product_name: "BL".to_string(),
            hard_filter_status: HardFilterStatus::Fail,
            details: HardFilterDetails::Failures(BTreeMap::from([(
                "cibil_score".to_string(),
                "CIBIL 620 < required 700".to_string(),
            )])),
            eligibility_score: None,
            approval_probability: None,
            expected_ticket_min: None,
            expected_ticket_max: None,
            confidence: 0.4,
            missing_for_improvement: Vec::new(),
            rank: None,
        }
    }

    fn full_checklist() -> DocumentChecklist {
        DocumentChecklist {
            program_type: ProgramType::Banking,
            available: vec![
                DocumentKind::BankStatement,
                DocumentKind::Aadhaar,
                DocumentKind::GstCertificate,
                DocumentKind::CibilReport,
                DocumentKind::PanPersonal,
            ],
            missing: Vec::new(),
            unreadable: Vec::new(),
            optional_present: Vec::new(),
            completeness_score: 100.0,
        }
    }

    #[test]
    fn strong_borrower_has_excellent_credit_strength_and_no_risks() {
        let borrower = strong_borrower();
        let matches = vec![
            pass_result("A", 92.0, ApprovalProbability::High),
            pass_result("B", 88.0, ApprovalProbability::High),
            pass_result("C", 81.0, ApprovalProbability::High),
        ];

        let strengths = compute_strengths(&borrower, &matches);
        assert!(strengths.iter().any(|s| s.contains("Excellent credit score")));
        assert!(strengths.iter().any(|s| s.contains("zero bounces")));
        assert!(strengths.iter().any(|s| s.contains("3 lenders matched")));

        let risks = compute_risk_flags(&borrower, Some(&full_checklist()), &matches);
        assert!(risks.is_empty(), "unexpected risks: {:?}", risks);
    }

    #[test]
    fn weak_borrower_collects_risk_flags() {
        let borrower = BorrowerFeatureVector {
            cibil_score: Some(620),
            business_vintage_years: Some(1.5),
            bounce_count_12m: Some(5),
            cash_deposit_ratio: Some(0.55),
            feature_completeness: 30.0,
            ..Default::default()
        };
        let mut checklist = full_checklist();
        checklist.missing = vec![DocumentKind::BankStatement, DocumentKind::CibilReport];
        let matches = vec![fail_result("A"), fail_result("B")];

        let risks = compute_risk_flags(&borrower, Some(&checklist), &matches);
        assert!(risks.iter().any(|r| r.contains("Low credit score")));
        assert!(risks.iter().any(|r| r.contains("Low business vintage")));
        assert!(risks.iter().any(|r| r.contains("Incomplete documentation")));
        assert!(risks.iter().any(|r| r.contains("No eligible lenders found")));
    }

    #[test]
    fn fallback_strategy_names_the_top_lender() {
        let matches = vec![
            pass_result("Tata Capital", 92.0, ApprovalProbability::High),
            pass_result("IIFL", 80.0, ApprovalProbability::High),
        ];
        let strategy = fallback_strategy(&matches, Some("requires Video KYC"));
        assert!(strategy.contains("**Primary Target:** Tata Capital - BL"));
        assert!(strategy.contains("requires Video KYC"));
        assert!(strategy.contains("2. IIFL - BL"));
        assert!(strategy.contains("General Strategy"));
    }

    #[test]
    fn fallback_strategy_handles_zero_matches() {
        assert_eq!(fallback_strategy(&[], None), NO_MATCH_STRATEGY);
    }

    #[test]
    fn strategy_prompt_references_top_and_alternates() {
        let borrower = strong_borrower();
        let matches = vec![
            pass_result("Tata Capital", 92.0, ApprovalProbability::High),
            pass_result("IIFL", 80.0, ApprovalProbability::High),
        ];
        let prompt = build_strategy_prompt(&borrower, &matches, None);
        assert!(prompt.contains("Tata Capital"));
        assert!(prompt.contains("2. IIFL"));
        assert!(prompt.contains("92/100"));
    }

    #[test]
    fn special_requirements_note_joins_flags() {
        let product = LenderProductRule {
            video_kyc_required: true,
            gst_required: true,
            ..Default::default()
        };
        assert_eq!(
            special_requirements_note(&product).as_deref(),
            Some("requires Video KYC, GST mandatory")
        );
        assert_eq!(special_requirements_note(&LenderProductRule::default()), None);
    }

    #[test]
    fn report_assembly_sets_expected_range_from_top_pass() {
        let borrower = strong_borrower();
        let matches = vec![pass_result("Tata Capital", 92.0, ApprovalProbability::High)];
        let report = assemble_report(
            "CASE-20250601-0001",
            borrower,
            full_checklist(),
            matches,
            "strategy text".to_string(),
        );
        assert_eq!(report.expected_loan_range.as_deref(), Some("₹4.5L - ₹30.0L"));
        assert!(report.missing_data_advisory.is_empty());
    }

    #[test]
    fn whatsapp_summary_contains_case_header_and_matches() {
        let borrower = strong_borrower();
        let matches = vec![pass_result("Tata Capital", 92.0, ApprovalProbability::High)];
        let report = assemble_report(
            "CASE-20250601-0001",
            borrower,
            full_checklist(),
            matches,
            "strategy".to_string(),
        );
        let summary = whatsapp_summary(&report);
        assert!(summary.contains("CASE: CASE-20250601-0001"));
        assert!(summary.contains("TOP MATCHES (1 lenders)"));
        assert!(summary.contains("Tata Capital"));
        assert!(summary.contains("CIBIL: 780"));
    }
}
