//! Borrower feature vector assembly.
//!
//! Merges extracted evidence with manual overrides from the case row into
//! the canonical 21-slot feature vector. Per slot, in order:
//!
//! 1. an extracted value at or above the confidence threshold,
//! 2. a manual override from the case (GST-cache values fold in here),
//! 3. any extracted value regardless of confidence,
//! 4. unset.
//!
//! Assembly is a pure function of (extracted rows, manual overlay,
//! threshold), so re-running it for an unchanged case yields an identical
//! vector.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

use shared::dtos::{BorrowerFeatureVector, ExtractedFieldItem};
use shared::models::enums::EntityType;

/// Default minimum confidence for extraction to beat a manual override.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Feature slot names, in vector order.
const FIELD_NAMES: [&str; 21] = [
    "full_name",
    "pan_number",
    "aadhaar_number",
    "dob",
    "entity_type",
    "business_vintage_years",
    "gstin",
    "industry_type",
    "pincode",
    "annual_turnover",
    "avg_monthly_balance",
    "monthly_credit_avg",
    "monthly_turnover",
    "emi_outflow_monthly",
    "bounce_count_12m",
    "cash_deposit_ratio",
    "itr_total_income",
    "cibil_score",
    "active_loan_count",
    "overdue_count",
    "enquiry_count_6m",
];

/// Manual values mirrored from the case row, plus the cached GST payload.
#[derive(Debug, Clone, Default)]
pub struct ManualOverlay {
    pub borrower_name: Option<String>,
    pub entity_type: Option<String>,
    pub business_vintage_years: Option<f64>,
    pub gstin: Option<String>,
    pub cibil_score_manual: Option<i32>,
    pub monthly_turnover_manual: Option<f64>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,
    pub gst_data: Option<Value>,
}

impl ManualOverlay {
    /// Manual value for a feature slot, as a string. GST-cache values fill
    /// slots the operator left empty; by the time assembly runs the
    /// processor has usually already written them onto the case row itself.
    fn value_for(&self, field_name: &str) -> Option<String> {
        let gst = self.gst_data.as_ref().and_then(Value::as_object);

        match field_name {
            "full_name" => self
                .borrower_name
                .clone()
                .or_else(|| {
                    gst.and_then(|payload| {
                        ["borrower_name", "tradename", "trade_name", "name"]
                            .iter()
                            .find_map(|key| payload.get(*key).and_then(Value::as_str))
                            .map(str::to_string)
                    })
                }),
            "entity_type" => self.entity_type.clone().or_else(|| {
                gst.and_then(|payload| payload.get("entity_type").and_then(Value::as_str))
                    .map(str::to_string)
            }),
            "business_vintage_years" => self
                .business_vintage_years
                .map(|v| v.to_string())
                .or_else(|| {
                    gst.and_then(|payload| payload.get("business_vintage_years"))
                        .and_then(Value::as_f64)
                        .map(|v| v.to_string())
                }),
            "gstin" => self.gstin.clone(),
            "cibil_score" => self.cibil_score_manual.map(|v| v.to_string()),
            "monthly_turnover" => self.monthly_turnover_manual.map(|v| v.to_string()),
            "industry_type" => self.industry_type.clone().or_else(|| {
                gst.and_then(|payload| {
                    [
                        "industry_type",
                        "business_type",
                        "nature_of_business",
                        "natureOfBusiness",
                    ]
                    .iter()
                    .find_map(|key| payload.get(*key).and_then(Value::as_str))
                    .map(str::to_string)
                })
            }),
            "pincode" => self.pincode.clone().or_else(|| {
                gst.and_then(|payload| payload.get("pincode")).map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            }),
            _ => None,
        }
    }
}

/// Normalize a free-text entity label into the canonical enum.
pub fn parse_entity_type(raw: &str) -> Option<EntityType> {
    let mut normalized = raw.trim().to_lowercase().replace('&', "and");
    normalized = normalized
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    while normalized.contains("__") {
        normalized = normalized.replace("__", "_");
    }
    let normalized = normalized.trim_matches('_');

    match normalized {
        "proprietorship" | "proprietor" | "sole_proprietorship" | "individual"
        | "self_employed" | "self_employed_non_professional" => Some(EntityType::Proprietorship),
        "partnership" | "partnership_firm" | "firm" => Some(EntityType::Partnership),
        "llp" | "limited_liability_partnership" => Some(EntityType::Llp),
        "pvt_ltd" | "private_limited" | "private_limited_company" | "opc"
        | "one_person_company" | "company" => Some(EntityType::PvtLtd),
        "public_ltd" | "public_limited" | "public_limited_company" => Some(EntityType::PublicLtd),
        "trust" => Some(EntityType::Trust),
        "society" | "ngo" => Some(EntityType::Society),
        "huf" => Some(EntityType::Huf),
        _ => None,
    }
}

/// Stateless assembler parameterized by the confidence threshold.
pub struct FeatureAssembler {
    confidence_threshold: f64,
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl FeatureAssembler {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Merge extracted fields and manual overlay into a feature vector.
    pub fn assemble(
        &self,
        overlay: &ManualOverlay,
        extracted_fields: &[ExtractedFieldItem],
    ) -> BorrowerFeatureVector {
        // Per field name keep the best row: highest confidence, with later
        // rows winning ties so fresh evidence supersedes stale evidence.
        let mut best_by_name: HashMap<&str, &ExtractedFieldItem> = HashMap::new();
        for field in extracted_fields {
            match best_by_name.get(field.field_name.as_str()) {
                Some(existing) if existing.confidence > field.confidence => {}
                _ => {
                    best_by_name.insert(field.field_name.as_str(), field);
                }
            }
        }

        let mut vector = BorrowerFeatureVector::default();

        for field_name in FIELD_NAMES {
            let extracted = best_by_name.get(field_name).copied();
            let manual = overlay.value_for(field_name);

            let resolved = self.resolve_value(extracted, manual);
            if let Some(value) = resolved {
                apply_slot(&mut vector, field_name, &value);
            }
        }

        // Bank credits are the authoritative monthly turnover when present.
        if let Some(credit_avg) = vector.monthly_credit_avg {
            vector.monthly_turnover = Some(credit_avg);
        }

        // Derive annual turnover in Lakhs from monthly rupees when no
        // explicit figure exists.
        if vector.annual_turnover.is_none() {
            if let Some(monthly) = vector.monthly_turnover {
                if monthly > 0.0 {
                    let lakhs = (monthly * 12.0 / 100_000.0 * 100.0).round() / 100.0;
                    vector.annual_turnover = Some(lakhs);
                }
            }
        }

        vector.recompute_completeness();
        vector
    }

    fn resolve_value(
        &self,
        extracted: Option<&ExtractedFieldItem>,
        manual: Option<String>,
    ) -> Option<String> {
        if let Some(field) = extracted {
            if field.confidence >= self.confidence_threshold {
                return Some(field.field_value.clone());
            }
        }
        if let Some(value) = manual {
            return Some(value);
        }
        extracted.map(|field| field.field_value.clone())
    }
}

fn parse_float(value: &str) -> Option<f64> {
    value.replace(',', "").trim().parse::<f64>().ok()
}

fn parse_int(value: &str) -> Option<i32> {
    // Tolerates "720.0" style values.
    parse_float(value).map(|v| v as i32)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let normalized = value.replace('-', "/");
    NaiveDate::parse_from_str(&normalized, "%d/%m/%Y").ok()
}

fn apply_slot(vector: &mut BorrowerFeatureVector, field_name: &str, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return;
    }

    match field_name {
        "full_name" => vector.full_name = Some(trimmed.to_string()),
        "pan_number" => vector.pan_number = Some(trimmed.to_string()),
        "aadhaar_number" => vector.aadhaar_number = Some(trimmed.replace(' ', "")),
        "dob" => vector.dob = parse_date(trimmed),
        "entity_type" => vector.entity_type = parse_entity_type(trimmed),
        "business_vintage_years" => vector.business_vintage_years = parse_float(trimmed),
        "gstin" => vector.gstin = Some(trimmed.to_string()),
        "industry_type" => vector.industry_type = Some(trimmed.to_string()),
        "pincode" => vector.pincode = Some(trimmed.to_string()),
        "annual_turnover" => vector.annual_turnover = parse_float(trimmed),
        "avg_monthly_balance" => vector.avg_monthly_balance = parse_float(trimmed),
        "monthly_credit_avg" => vector.monthly_credit_avg = parse_float(trimmed),
        "monthly_turnover" => vector.monthly_turnover = parse_float(trimmed),
        "emi_outflow_monthly" => vector.emi_outflow_monthly = parse_float(trimmed),
        "bounce_count_12m" => vector.bounce_count_12m = parse_int(trimmed),
        "cash_deposit_ratio" => vector.cash_deposit_ratio = parse_float(trimmed),
        "itr_total_income" => vector.itr_total_income = parse_float(trimmed),
        "cibil_score" => vector.cibil_score = parse_int(trimmed),
        "active_loan_count" => vector.active_loan_count = parse_int(trimmed),
        "overdue_count" => vector.overdue_count = parse_int(trimmed),
        "enquiry_count_6m" => vector.enquiry_count_6m = parse_int(trimmed),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::enums::FieldSource;

    fn field(name: &str, value: &str, confidence: f64) -> ExtractedFieldItem {
        ExtractedFieldItem {
            field_name: name.to_string(),
            field_value: value.to_string(),
            confidence,
            source: FieldSource::Extraction,
        }
    }

    #[test]
    fn confident_extraction_beats_manual_override() {
        let overlay = ManualOverlay {
            cibil_score_manual: Some(650),
            ..Default::default()
        };
        let fields = [field("cibil_score", "742", 0.85)];
        let vector = FeatureAssembler::default().assemble(&overlay, &fields);
        assert_eq!(vector.cibil_score, Some(742));
    }

    #[test]
    fn manual_override_beats_low_confidence_extraction() {
        let overlay = ManualOverlay {
            cibil_score_manual: Some(650),
            ..Default::default()
        };
        let fields = [field("cibil_score", "742", 0.3)];
        let vector = FeatureAssembler::default().assemble(&overlay, &fields);
        assert_eq!(vector.cibil_score, Some(650));
    }

    #[test]
    fn low_confidence_extraction_used_when_nothing_else_exists() {
        let fields = [field("pan_number", "ABCPE1234F", 0.2)];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.pan_number.as_deref(), Some("ABCPE1234F"));
    }

    #[test]
    fn highest_confidence_row_wins_per_field() {
        let fields = [
            field("cibil_score", "700", 0.6),
            field("cibil_score", "750", 0.9),
            field("cibil_score", "600", 0.55),
        ];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.cibil_score, Some(750));
    }

    #[test]
    fn equal_confidence_prefers_the_later_row() {
        let fields = [
            field("cibil_score", "700", 0.8),
            field("cibil_score", "710", 0.8),
        ];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.cibil_score, Some(710));
    }

    #[test]
    fn monthly_turnover_mirrors_monthly_credit_avg() {
        let fields = [
            field("monthly_credit_avg", "800000", 0.9),
            field("monthly_turnover", "123", 0.9),
        ];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.monthly_turnover, Some(800_000.0));
    }

    #[test]
    fn annual_turnover_derives_in_lakhs_when_absent() {
        let fields = [field("monthly_credit_avg", "800000", 0.9)];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        // 800000 * 12 / 100000 = 96 Lakhs
        assert_eq!(vector.annual_turnover, Some(96.0));
    }

    #[test]
    fn explicit_annual_turnover_is_not_overwritten() {
        let fields = [
            field("annual_turnover", "120", 0.8),
            field("monthly_credit_avg", "800000", 0.9),
        ];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.annual_turnover, Some(120.0));
    }

    #[test]
    fn entity_type_aliases_normalize() {
        assert_eq!(parse_entity_type("Pvt. Ltd"), Some(EntityType::PvtLtd));
        assert_eq!(
            parse_entity_type("Private Limited Company"),
            Some(EntityType::PvtLtd)
        );
        assert_eq!(
            parse_entity_type("Sole Proprietorship"),
            Some(EntityType::Proprietorship)
        );
        assert_eq!(parse_entity_type("NGO"), Some(EntityType::Society));
        assert_eq!(parse_entity_type("martian collective"), None);
    }

    #[test]
    fn dates_parse_both_separators() {
        let slash = [field("dob", "12/08/1985", 0.8)];
        let dash = [field("dob", "12-08-1985", 0.8)];
        let assembler = FeatureAssembler::default();
        let overlay = ManualOverlay::default();
        assert_eq!(
            assembler.assemble(&overlay, &slash).dob,
            NaiveDate::from_ymd_opt(1985, 8, 12)
        );
        assert_eq!(
            assembler.assemble(&overlay, &dash).dob,
            NaiveDate::from_ymd_opt(1985, 8, 12)
        );
    }

    #[test]
    fn integers_tolerate_trailing_decimal_zero() {
        let fields = [field("bounce_count_12m", "2.0", 0.9)];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        assert_eq!(vector.bounce_count_12m, Some(2));
    }

    #[test]
    fn gst_payload_fills_empty_manual_slots() {
        let overlay = ManualOverlay {
            gst_data: Some(json!({
                "borrower_name": "ACME TRADING CO",
                "entity_type": "proprietorship",
                "business_vintage_years": 6.5,
                "pincode": "400001",
                "industry_type": "trading"
            })),
            ..Default::default()
        };
        let vector = FeatureAssembler::default().assemble(&overlay, &[]);
        assert_eq!(vector.full_name.as_deref(), Some("ACME TRADING CO"));
        assert_eq!(vector.entity_type, Some(EntityType::Proprietorship));
        assert_eq!(vector.business_vintage_years, Some(6.5));
        assert_eq!(vector.pincode.as_deref(), Some("400001"));
        assert_eq!(vector.industry_type.as_deref(), Some("trading"));
    }

    #[test]
    fn manual_entry_wins_over_gst_payload() {
        let overlay = ManualOverlay {
            borrower_name: Some("MANUAL NAME".to_string()),
            gst_data: Some(json!({"borrower_name": "GST NAME"})),
            ..Default::default()
        };
        let vector = FeatureAssembler::default().assemble(&overlay, &[]);
        assert_eq!(vector.full_name.as_deref(), Some("MANUAL NAME"));
    }

    #[test]
    fn reassembly_is_deterministic() {
        let overlay = ManualOverlay {
            cibil_score_manual: Some(700),
            pincode: Some("411001".to_string()),
            ..Default::default()
        };
        let fields = [
            field("pan_number", "ABCPE1234F", 0.9),
            field("monthly_credit_avg", "500000", 0.8),
            field("bounce_count_12m", "1", 0.8),
        ];
        let assembler = FeatureAssembler::default();
        let first = assembler.assemble(&overlay, &fields);
        let second = assembler.assemble(&overlay, &fields);
        assert_eq!(first, second);
    }

    #[test]
    fn completeness_counts_filled_slots() {
        let fields = [
            field("pan_number", "ABCPE1234F", 0.9),
            field("cibil_score", "750", 0.85),
        ];
        let vector = FeatureAssembler::default().assemble(&ManualOverlay::default(), &fields);
        // 2 slots / 21 = 9.52
        assert_eq!(vector.feature_completeness, 9.52);
    }
}
