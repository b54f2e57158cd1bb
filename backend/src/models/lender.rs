//! Lender product row hydration.

use sqlx::mysql::MySqlRow;
use sqlx::Row;
use std::str::FromStr;

use shared::dtos::LenderProductRule;
use shared::models::enums::ProgramType;

/// Hydrate a scoring rule from a joined `lender_products` + `lenders` row.
///
/// Expects the row to carry `lender_name` from the join; entity types are
/// stored as a JSON array of canonical strings.
pub fn product_rule_from_row(row: &MySqlRow) -> Result<LenderProductRule, sqlx::Error> {
    let program_type: Option<String> = row.get("program_type");
    let entity_types_raw: Option<String> = row.try_get("eligible_entity_types").unwrap_or(None);
    let eligible_entity_types: Vec<String> = entity_types_raw
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();

    Ok(LenderProductRule {
        lender_name: row.get("lender_name"),
        product_name: row.get("product_name"),
        program_type: program_type
            .as_deref()
            .and_then(|value| ProgramType::from_str(value).ok()),
        policy_available: row.get("policy_available"),
        min_vintage_years: row.get("min_vintage_years"),
        min_cibil_score: row.get("min_cibil_score"),
        min_turnover_annual: row.get("min_turnover_annual"),
        max_ticket_size: row.get("max_ticket_size"),
        min_abb: row.get("min_abb"),
        eligible_entity_types,
        age_min: row.get("age_min"),
        age_max: row.get("age_max"),
        no_30plus_dpd_months: row.get("no_30plus_dpd_months"),
        no_60plus_dpd_months: row.get("no_60plus_dpd_months"),
        no_90plus_dpd_months: row.get("no_90plus_dpd_months"),
        max_enquiries_rule: row.get("max_enquiries_rule"),
        emi_bounce_rule: row.get("emi_bounce_rule"),
        max_overdue_amount: row.get("max_overdue_amount"),
        banking_months_required: row.get("banking_months_required"),
        ownership_proof_required: row.get("ownership_proof_required"),
        gst_required: row.get("gst_required"),
        kyc_documents: row.get("kyc_documents"),
        tele_pd_required: row.get("tele_pd_required"),
        video_kyc_required: row.get("video_kyc_required"),
        fi_required: row.get("fi_required"),
        interest_rate_range: row.get("interest_rate_range"),
        processing_fee_pct: row.get("processing_fee_pct"),
        expected_tat_days: row.get("expected_tat_days"),
        tenor_min_months: row.get("tenor_min_months"),
        tenor_max_months: row.get("tenor_max_months"),
    })
}
