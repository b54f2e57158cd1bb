//! Eligibility matching engine.
//!
//! Three layers over the borrower feature vector and the lender product
//! rules:
//!
//! - Layer 1, hard filters: pincode coverage, CIBIL floor, entity type,
//!   vintage, turnover, age bounds, average bank balance. Any failure
//!   knocks the product out with a reason map.
//! - Layer 2, weighted scoring: six 0-100 components (CIBIL band 25%,
//!   turnover band 20%, vintage 15%, banking strength 20%, FOIR 10%,
//!   documentation 10%); missing components drop out and the remaining
//!   weights renormalize.
//! - Layer 3, post-processing: approval probability bands, expected ticket
//!   range, improvement suggestions, ranking, rejection analysis and
//!   dynamic recommendations.
//!
//! The engine is pure: callers supply the product rules, the set of lenders
//! covering the borrower's pincode, and today's date.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use shared::dtos::{
    BorrowerFeatureVector, DynamicRecommendation, EligibilityResult, HardFilterDetails,
    LenderProductRule, LenderTerms, LenderThresholds, MatchExplainability, ScoreComponent,
};
use shared::models::enums::{ApprovalProbability, HardFilterStatus};

/// Equivalence groups for entity-type matching between borrower values and
/// policy-sheet strings.
static ENTITY_EQUIVALENCE: LazyLock<Vec<(&'static str, Vec<&'static str>)>> =
    LazyLock::new(|| {
        vec![
            (
                "proprietorship",
                vec![
                    "proprietorship",
                    "proprietor",
                    "sole_proprietorship",
                    "individual",
                    "self_employed",
                    "self_employed_non_professional",
                ],
            ),
            ("partnership", vec!["partnership", "partnership_firm", "firm"]),
            ("llp", vec!["llp", "limited_liability_partnership"]),
            (
                "pvt_ltd",
                vec![
                    "pvt_ltd",
                    "private_limited",
                    "private_limited_company",
                    "opc",
                    "one_person_company",
                    "company",
                ],
            ),
            (
                "public_ltd",
                vec!["public_ltd", "public_limited", "public_limited_company"],
            ),
            ("trust", vec!["trust"]),
            ("society", vec!["society", "ngo"]),
            ("huf", vec!["huf"]),
        ]
    });

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("invalid number pattern"));

/// Commercial-terms fallbacks by product bucket, used to fill sparse policy
/// rows in the explainability payload.
fn product_terms_fallback(bucket: &str) -> LenderTerms {
    let (rate, fee, tat, tenor_min, tenor_max) = match bucket {
        "bl" => ("14% - 30%", 2.0, 5, 12, 48),
        "stbl" => ("13% - 26%", 1.5, 4, 12, 60),
        "sbl" => ("15% - 28%", 2.0, 4, 12, 60),
        "mtbl" => ("15% - 30%", 2.5, 5, 12, 60),
        "htbl" => ("10% - 16%", 1.0, 7, 60, 300),
        "pl" => ("11% - 28%", 2.0, 3, 12, 60),
        "hl" => ("8.5% - 11.5%", 0.5, 10, 60, 360),
        "lap" => ("10.5% - 16%", 1.0, 8, 36, 180),
        "od" => ("11% - 18%", 1.0, 3, 12, 36),
        "cc" => ("11% - 17%", 1.0, 3, 12, 36),
        "digital" => ("16% - 36%", 2.5, 2, 3, 36),
        _ => ("12% - 24%", 1.5, 5, 12, 60),
    };
    LenderTerms {
        interest_rate_range: Some(rate.to_string()),
        processing_fee_pct: Some(fee),
        expected_tat_days: Some(tat),
        tenor_min_months: Some(tenor_min),
        tenor_max_months: Some(tenor_max),
    }
}

/// Per-lender term overrides keyed by a token contained in the lender name.
fn lender_terms_override(lender_key: &str) -> Option<(&'static str, f64, i32)> {
    const OVERRIDES: &[(&str, &str, f64, i32)] = &[
        ("arthmate", "18% - 30%", 2.5, 3),
        ("abfl", "14% - 26%", 2.0, 5),
        ("bajaj", "13% - 30%", 2.0, 3),
        ("clix", "14% - 30%", 2.5, 4),
        ("credit saison", "16% - 28%", 2.0, 5),
        ("godrej", "13% - 24%", 1.5, 4),
        ("iifl", "14% - 28%", 2.0, 4),
        ("indifi", "16% - 30%", 2.5, 3),
        ("lendingkart", "18% - 36%", 2.5, 2),
        ("neogrowth", "16% - 30%", 2.5, 2),
        ("protium", "14% - 28%", 2.0, 4),
        ("tata", "12% - 28%", 2.0, 3),
        ("ambit", "14% - 26%", 2.0, 5),
        ("flexiloans", "18% - 34%", 2.5, 2),
    ];
    OVERRIDES
        .iter()
        .find(|(token, _, _, _)| lender_key.contains(token))
        .map(|(_, rate, fee, tat)| (*rate, *fee, *tat))
}

fn resolve_terms_bucket(product_name: &str) -> &'static str {
    let normalized = product_name.trim().to_lowercase();
    for key in [
        "stbl", "htbl", "mtbl", "sbl", "bl", "pl", "hl", "lap", "od", "cc", "digital",
    ] {
        if normalized.contains(key) {
            return match key {
                "stbl" => "stbl",
                "htbl" => "htbl",
                "mtbl" => "mtbl",
                "sbl" => "sbl",
                "bl" => "bl",
                "pl" => "pl",
                "hl" => "hl",
                "lap" => "lap",
                "od" => "od",
                "cc" => "cc",
                "digital" => "digital",
                _ => "default",
            };
        }
    }
    "default"
}

/// Fill missing commercial terms from lender overrides and product-bucket
/// fallbacks. Swapped tenor bounds are normalized.
pub fn build_lender_terms(
    lender_name: &str,
    product_name: &str,
    existing: LenderTerms,
) -> LenderTerms {
    let bucket_terms = product_terms_fallback(resolve_terms_bucket(product_name));
    let override_terms = lender_terms_override(&lender_name.trim().to_lowercase());

    let mut terms = existing;

    if terms.interest_rate_range.is_none() {
        terms.interest_rate_range = override_terms
            .map(|(rate, _, _)| rate.to_string())
            .or(bucket_terms.interest_rate_range);
    }
    if terms.processing_fee_pct.is_none() {
        terms.processing_fee_pct = override_terms
            .map(|(_, fee, _)| fee)
            .or(bucket_terms.processing_fee_pct);
    }
    if terms.expected_tat_days.is_none() {
        terms.expected_tat_days = override_terms
            .map(|(_, _, tat)| tat)
            .or(bucket_terms.expected_tat_days);
    }

    let mut tenor_min = terms.tenor_min_months.or(bucket_terms.tenor_min_months);
    let mut tenor_max = terms.tenor_max_months.or(bucket_terms.tenor_max_months);
    if let (Some(min), Some(max)) = (tenor_min, tenor_max) {
        if min > max {
            std::mem::swap(&mut tenor_min, &mut tenor_max);
        }
    }
    terms.tenor_min_months = tenor_min;
    terms.tenor_max_months = tenor_max;

    terms
}

fn normalize_entity_value(value: &str) -> String {
    let mut normalized = value.trim().to_lowercase().replace('&', "and");
    normalized = normalized
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    while normalized.contains("__") {
        normalized = normalized.replace("__", "_");
    }
    normalized.trim_matches('_').to_string()
}

/// Expand an entity label into its equivalence set.
fn entity_variants(value: &str) -> HashSet<String> {
    let normalized = normalize_entity_value(value);
    if normalized.is_empty() {
        return HashSet::new();
    }

    let mut variants = HashSet::from([normalized.clone()]);
    for (canonical, aliases) in ENTITY_EQUIVALENCE.iter() {
        if normalized == *canonical || aliases.contains(&normalized.as_str()) {
            variants.insert(canonical.to_string());
            variants.extend(aliases.iter().map(|a| a.to_string()));
        }
    }
    variants
}

/// Age in completed years at `today`.
pub fn calculate_age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply the hard filters for one product. Returns the status and, on
/// failure, a reason map keyed by filter name.
pub fn apply_hard_filters(
    borrower: &BorrowerFeatureVector,
    product: &LenderProductRule,
    pincode_coverage: &HashSet<String>,
    today: NaiveDate,
) -> (HardFilterStatus, BTreeMap<String, String>) {
    let mut failures = BTreeMap::new();

    if !product.policy_available {
        failures.insert("policy_available".to_string(), "Policy not available".to_string());
        return (HardFilterStatus::Fail, failures);
    }

    if let Some(pincode) = &borrower.pincode {
        if !pincode_coverage.contains(&product.lender_name.to_lowercase()) {
            failures.insert(
                "pincode".to_string(),
                format!("Pincode {} not serviceable", pincode),
            );
        }
    }

    if let (Some(min_cibil), Some(cibil)) = (product.min_cibil_score, borrower.cibil_score) {
        if cibil < min_cibil {
            failures.insert(
                "cibil_score".to_string(),
                format!("CIBIL {} < required {}", cibil, min_cibil),
            );
        }
    }

    if !product.eligible_entity_types.is_empty() {
        if let Some(entity) = borrower.entity_type {
            let borrower_variants = entity_variants(entity.as_str());
            let mut eligible_variants = HashSet::new();
            for raw in &product.eligible_entity_types {
                eligible_variants.extend(entity_variants(raw));
            }
            if borrower_variants.is_disjoint(&eligible_variants) {
                failures.insert(
                    "entity_type".to_string(),
                    format!(
                        "{} not in eligible types: {}",
                        entity.as_str(),
                        product.eligible_entity_types.join(", ")
                    ),
                );
            }
        }
    }

    if let (Some(min_vintage), Some(vintage)) =
        (product.min_vintage_years, borrower.business_vintage_years)
    {
        if vintage < min_vintage {
            failures.insert(
                "vintage".to_string(),
                format!("{}y < required {}y", vintage, min_vintage),
            );
        }
    }

    if let (Some(min_turnover), Some(turnover)) =
        (product.min_turnover_annual, borrower.annual_turnover)
    {
        if turnover < min_turnover {
            failures.insert(
                "turnover".to_string(),
                format!("₹{}L < required ₹{}L", turnover, min_turnover),
            );
        }
    }

    // Defensive normalization for malformed policy rows like "60-60".
    let mut age_min = product.age_min;
    let mut age_max = product.age_max;
    if let (Some(lo), Some(hi)) = (age_min, age_max) {
        let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
        if lo == hi {
            if lo >= 45 {
                age_min = None;
                age_max = Some(hi);
            } else {
                age_min = Some(lo);
                age_max = None;
            }
        } else {
            age_min = Some(lo);
            age_max = Some(hi);
        }
    }

    if let Some(dob) = borrower.dob {
        if age_min.is_some() || age_max.is_some() {
            let age = calculate_age(dob, today);
            if let Some(min) = age_min {
                if age < min {
                    failures.insert(
                        "age".to_string(),
                        format!("Age {} outside minimum {}", age, min),
                    );
                }
            }
            if !failures.contains_key("age") {
                if let Some(max) = age_max {
                    if age > max {
                        failures.insert(
                            "age".to_string(),
                            format!("Age {} outside maximum {}", age, max),
                        );
                    }
                }
            }
        }
    }

    // Policy sheets quote ABB in Lakhs; bank metrics are in rupees.
    if let (Some(min_abb), Some(balance)) = (product.min_abb, borrower.avg_monthly_balance) {
        let min_abb_rupees = min_abb * 100_000.0;
        if balance < min_abb_rupees {
            failures.insert(
                "abb".to_string(),
                format!(
                    "Avg balance ₹{:.0} < required ₹{:.0}",
                    balance, min_abb_rupees
                ),
            );
        }
    }

    let status = if failures.is_empty() {
        HardFilterStatus::Pass
    } else {
        HardFilterStatus::Fail
    };
    (status, failures)
}

/// CIBIL band sub-score:
/// 750+ = 100, 725-749 = 90, 700-724 = 75, 675-699 = 60, 650-674 = 40,
/// below 650 = 20.
pub fn score_cibil_band(cibil: Option<i32>) -> Option<f64> {
    let cibil = cibil?;
    Some(match cibil {
        c if c >= 750 => 100.0,
        c if c >= 725 => 90.0,
        c if c >= 700 => 75.0,
        c if c >= 675 => 60.0,
        c if c >= 650 => 40.0,
        _ => 20.0,
    })
}

/// Turnover sub-score from the ratio to the product's minimum.
pub fn score_turnover_band(annual_turnover: Option<f64>, min_turnover: Option<f64>) -> Option<f64> {
    let turnover = annual_turnover?;
    let min_turnover = min_turnover?;
    if min_turnover == 0.0 {
        return None;
    }

    let ratio = turnover / min_turnover;
    Some(match ratio {
        r if r >= 3.0 => 100.0,
        r if r >= 2.0 => 80.0,
        r if r >= 1.5 => 60.0,
        r if r >= 1.0 => 40.0,
        _ => 20.0,
    })
}

/// Vintage sub-score: 5y+ = 100, 3-5 = 80, 2-3 = 60, 1-2 = 40, else 20.
pub fn score_business_vintage(vintage_years: Option<f64>) -> Option<f64> {
    let vintage = vintage_years?;
    Some(match vintage {
        v if v >= 5.0 => 100.0,
        v if v >= 3.0 => 80.0,
        v if v >= 2.0 => 60.0,
        v if v >= 1.0 => 40.0,
        _ => 20.0,
    })
}

/// Banking-strength composite: average of up to three sub-scores (balance
/// vs ABB requirement, bounce tier, cash-deposit-ratio tier).
pub fn score_banking_strength(
    avg_balance: Option<f64>,
    bounce_count: Option<i32>,
    cash_ratio: Option<f64>,
    min_abb_lakhs: Option<f64>,
) -> Option<f64> {
    let mut sub_scores = Vec::new();

    if let (Some(balance), Some(min_abb)) = (avg_balance, min_abb_lakhs) {
        let min_abb_rupees = min_abb * 100_000.0;
        if min_abb_rupees > 0.0 {
            let ratio = balance / min_abb_rupees;
            sub_scores.push(match ratio {
                r if r >= 2.0 => 100.0,
                r if r >= 1.5 => 80.0,
                r if r >= 1.0 => 60.0,
                _ => 30.0,
            });
        }
    }

    if let Some(bounces) = bounce_count {
        sub_scores.push(match bounces {
            0 => 100.0,
            1..=2 => 70.0,
            _ => 30.0,
        });
    }

    if let Some(ratio) = cash_ratio {
        sub_scores.push(if ratio < 0.20 {
            100.0
        } else if ratio < 0.40 {
            60.0
        } else {
            30.0
        });
    }

    if sub_scores.is_empty() {
        return None;
    }
    Some(sub_scores.iter().sum::<f64>() / sub_scores.len() as f64)
}

/// FOIR sub-score: <30% = 100, 30-45% = 75, 45-55% = 50, 55-65% = 30,
/// above = 0.
pub fn score_foir(emi_outflow: Option<f64>, monthly_credit: Option<f64>) -> Option<f64> {
    let emi = emi_outflow?;
    let credit = monthly_credit?;
    if credit == 0.0 {
        return None;
    }

    let foir = emi / credit;
    Some(match foir {
        f if f < 0.30 => 100.0,
        f if f < 0.45 => 75.0,
        f if f < 0.55 => 50.0,
        f if f < 0.65 => 30.0,
        _ => 0.0,
    })
}

/// Documentation sub-score: share of the lender's required documents the
/// borrower can evidence (GST, ownership proof, PAN, Aadhaar).
pub fn score_documentation(
    borrower: &BorrowerFeatureVector,
    product: &LenderProductRule,
) -> Option<f64> {
    let mut required = 0usize;
    let mut available = 0usize;

    if product.gst_required {
        required += 1;
        if borrower.gstin.is_some() {
            available += 1;
        }
    }

    if product.ownership_proof_required {
        // Ownership proof has no feature-vector slot; count it as missing.
        required += 1;
    }

    if let Some(kyc) = &product.kyc_documents {
        let kyc = kyc.to_uppercase();
        if kyc.contains("PAN") {
            required += 1;
            if borrower.pan_number.is_some() {
                available += 1;
            }
        }
        if kyc.contains("AADHAAR") || kyc.contains("AADHAR") {
            required += 1;
            if borrower.aadhaar_number.is_some() {
                available += 1;
            }
        }
    }

    if required == 0 {
        return Some(100.0);
    }
    Some(round2(available as f64 / required as f64 * 100.0))
}

/// Weighted composite score with per-component breakdown. Missing
/// components drop out and the weights renormalize over what remains.
pub fn calculate_score_with_breakdown(
    borrower: &BorrowerFeatureVector,
    product: &LenderProductRule,
) -> (f64, Vec<ScoreComponent>) {
    let mut components = Vec::new();

    let mut add = |key: &str, label: &str, weight: u32, score: Option<f64>, note: String| {
        if let Some(score) = score {
            components.push(ScoreComponent {
                component: key.to_string(),
                label: label.to_string(),
                weight,
                score: round2(score),
                weighted_contribution: round2(score * weight as f64 / 100.0),
                note,
            });
        }
    };

    add(
        "cibil_band",
        "CIBIL Band",
        25,
        score_cibil_band(borrower.cibil_score),
        format!(
            "CIBIL considered: {}",
            borrower
                .cibil_score
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    );
    add(
        "turnover_band",
        "Turnover Band",
        20,
        score_turnover_band(borrower.annual_turnover, product.min_turnover_annual),
        format!(
            "Annual turnover: {}",
            borrower
                .annual_turnover
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    );
    add(
        "business_vintage",
        "Business Vintage",
        15,
        score_business_vintage(borrower.business_vintage_years),
        format!(
            "Vintage (years): {}",
            borrower
                .business_vintage_years
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    );
    add(
        "banking_strength",
        "Banking Strength",
        20,
        score_banking_strength(
            borrower.avg_monthly_balance,
            borrower.bounce_count_12m,
            borrower.cash_deposit_ratio,
            product.min_abb,
        ),
        "Based on average balance, bounce count, and cash deposit ratio".to_string(),
    );
    add(
        "foir",
        "FOIR",
        10,
        score_foir(borrower.emi_outflow_monthly, borrower.monthly_credit_avg),
        "Fixed obligations vs monthly inflow".to_string(),
    );
    add(
        "documentation",
        "Documentation",
        10,
        score_documentation(borrower, product),
        "Required document coverage for this lender".to_string(),
    );

    if components.is_empty() {
        return (0.0, components);
    }

    let total_weight: f64 = components.iter().map(|c| c.weight as f64).sum();
    let weighted_sum: f64 = components.iter().map(|c| c.score * c.weight as f64).sum();
    (round2(weighted_sum / total_weight), components)
}

/// Score-to-probability banding: >= 75 high, >= 50 medium, else low.
pub fn determine_approval_probability(score: f64) -> ApprovalProbability {
    if score >= 75.0 {
        ApprovalProbability::High
    } else if score >= 50.0 {
        ApprovalProbability::Medium
    } else {
        ApprovalProbability::Low
    }
}

/// Expected ticket range in Lakhs: the product cap, limited to a
/// score-dependent share of annual turnover (25/15/10%); the lower bound is
/// 15% of the upper bound.
pub fn calculate_ticket_range(
    borrower: &BorrowerFeatureVector,
    product: &LenderProductRule,
    score: f64,
) -> (Option<f64>, Option<f64>) {
    let turnover_share = if score >= 75.0 {
        0.25
    } else if score >= 50.0 {
        0.15
    } else {
        0.10
    };

    let max_ticket = match (product.max_ticket_size, borrower.annual_turnover) {
        (Some(cap), Some(turnover)) => Some(cap.min(turnover * 0.25)),
        (Some(cap), None) => Some(cap),
        (None, Some(turnover)) => Some(turnover * turnover_share),
        (None, None) => None,
    };

    let min_ticket = max_ticket.map(|max| max * 0.15);
    (min_ticket, max_ticket)
}

/// Suggestions for passing-but-unspectacular profiles.
pub fn identify_missing_for_improvement(
    borrower: &BorrowerFeatureVector,
    score: f64,
) -> Vec<String> {
    let mut missing = Vec::new();
    if score >= 75.0 {
        return missing;
    }

    if let Some(cibil) = borrower.cibil_score {
        if cibil < 725 {
            missing.push(format!("Improve CIBIL score (currently {})", cibil));
        }
    }
    if let Some(vintage) = borrower.business_vintage_years {
        if vintage < 3.0 {
            missing.push("Business vintage < 3 years".to_string());
        }
    }
    if let Some(bounces) = borrower.bounce_count_12m {
        if bounces > 2 {
            missing.push(format!("Reduce EMI bounces (currently {})", bounces));
        }
    }
    if borrower.gstin.is_none() {
        missing.push("Add GST registration".to_string());
    }
    if let Some(ratio) = borrower.cash_deposit_ratio {
        if ratio > 0.40 {
            missing.push("High cash deposit ratio (>40%)".to_string());
        }
    }

    missing
}

/// Score a borrower against a set of products. Passing rows come first,
/// ranked by score descending; failing rows follow unranked.
pub fn score_products(
    borrower: &BorrowerFeatureVector,
    products: &[LenderProductRule],
    pincode_coverage: &HashSet<String>,
    today: NaiveDate,
) -> Vec<EligibilityResult> {
    let mut passed = Vec::new();
    let mut failed = Vec::new();
    let confidence = borrower.feature_completeness / 100.0;

    for product in products {
        let (status, failures) = apply_hard_filters(borrower, product, pincode_coverage, today);

        if status == HardFilterStatus::Pass {
            let (score, breakdown) = calculate_score_with_breakdown(borrower, product);
            let probability = determine_approval_probability(score);
            let (min_ticket, max_ticket) = calculate_ticket_range(borrower, product, score);

            let explainability = MatchExplainability {
                matched_signals: vec![
                    format!(
                        "Entity type: {}",
                        borrower
                            .entity_type
                            .map(|e| e.as_str().to_string())
                            .unwrap_or_else(|| "N/A".to_string())
                    ),
                    format!(
                        "CIBIL: {}",
                        borrower
                            .cibil_score
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "N/A".to_string())
                    ),
                    format!(
                        "Business vintage: {} years",
                        borrower
                            .business_vintage_years
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "N/A".to_string())
                    ),
                    format!("Pincode: {}", borrower.pincode.as_deref().unwrap_or("N/A")),
                ],
                score_breakdown: breakdown,
                lender_thresholds: LenderThresholds {
                    min_cibil_score: product.min_cibil_score,
                    min_vintage_years: product.min_vintage_years,
                    min_turnover_annual: product.min_turnover_annual,
                    max_ticket_size: product.max_ticket_size,
                    min_abb: product.min_abb,
                },
                lender_terms: build_lender_terms(
                    &product.lender_name,
                    &product.product_name,
                    LenderTerms {
                        interest_rate_range: product.interest_rate_range.clone(),
                        processing_fee_pct: product.processing_fee_pct,
                        expected_tat_days: product.expected_tat_days,
                        tenor_min_months: product.tenor_min_months,
                        tenor_max_months: product.tenor_max_months,
                    },
                ),
            };

            passed.push(EligibilityResult {
                lender_name: product.lender_name.clone(),
                product_name: product.product_name.clone(),
                hard_filter_status: HardFilterStatus::Pass,
                details: HardFilterDetails::Explainability(explainability),
                eligibility_score: Some(score),
                approval_probability: Some(probability),
                expected_ticket_min: min_ticket,
                expected_ticket_max: max_ticket,
                confidence,
                missing_for_improvement: identify_missing_for_improvement(borrower, score),
                rank: None,
            });
        } else {
            failed.push(EligibilityResult {
                lender_name: product.lender_name.clone(),
                product_name: product.product_name.clone(),
                hard_filter_status: HardFilterStatus::Fail,
                details: HardFilterDetails::Failures(failures),
                eligibility_score: None,
                approval_probability: None,
                expected_ticket_min: None,
                expected_ticket_max: None,
                confidence,
                missing_for_improvement: Vec::new(),
                rank: None,
            });
        }
    }

    rank_results(&mut passed);
    passed.extend(failed);
    passed
}

/// Sort passing rows by score descending and assign 1-based ranks.
pub fn rank_results(results: &mut [EligibilityResult]) {
    results.sort_by(|a, b| {
        let a_score = a.eligibility_score.unwrap_or(-1.0);
        let b_score = b.eligibility_score.unwrap_or(-1.0);
        b_score
            .partial_cmp(&a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (index, result) in results.iter_mut().enumerate() {
        result.rank = Some(index as i32 + 1);
    }
}

/// First or second number in a failure string; the second is usually the
/// policy threshold ("CIBIL 620 < required 700" -> 700).
pub fn extract_number_from_string(text: &str) -> Option<f64> {
    let matches: Vec<f64> = NUMBER_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    if matches.len() >= 2 {
        Some(matches[1])
    } else {
        None
    }
}

/// Narrative rejection analysis for the zero-pass case: grouped reasons,
/// sorted by how many products hit them, plus actionable suggestions.
pub fn generate_rejection_analysis(
    borrower: &BorrowerFeatureVector,
    failed_results: &[EligibilityResult],
) -> (Vec<String>, Vec<String>) {
    struct ReasonGroup {
        count: usize,
        detail: String,
        lenders: Vec<String>,
    }

    let mut groups: BTreeMap<String, ReasonGroup> = BTreeMap::new();
    for result in failed_results {
        if let Some(failures) = result.details.failures() {
            for (key, detail) in failures {
                let group = groups.entry(key.clone()).or_insert_with(|| ReasonGroup {
                    count: 0,
                    detail: detail.clone(),
                    lenders: Vec::new(),
                });
                group.count += 1;
                group.lenders.push(result.lender_name.clone());
            }
        }
    }

    let mut sorted: Vec<(&String, &ReasonGroup)> = groups.iter().collect();
    sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    let mut reasons = Vec::new();
    let mut actions: Vec<String> = Vec::new();

    for (key, group) in sorted {
        if group.count == failed_results.len() {
            reasons.push(format!("{} (All lenders)", group.detail));
        } else {
            let mut lender_list = group.lenders.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
            if group.count > 3 {
                lender_list.push_str(&format!(" and {} more", group.count - 3));
            }
            reasons.push(format!("{} ({})", group.detail, lender_list));
        }

        let action = match key.as_str() {
            "cibil_score" => match borrower.cibil_score {
                Some(current) => match extract_number_from_string(&group.detail) {
                    Some(target) if target > current as f64 => Some(format!(
                        "Improve CIBIL score to {}+ (currently {})",
                        target, current
                    )),
                    _ => Some("Improve CIBIL score above 700".to_string()),
                },
                None => Some("Get CIBIL report and work on improving credit score".to_string()),
            },
            "vintage" => match borrower.business_vintage_years {
                Some(current) => extract_number_from_string(&group.detail)
                    .filter(|target| *target > current)
                    .map(|target| {
                        format!(
                            "Business needs {:.1} more years of operation (currently {:.1}y)",
                            target - current,
                            current
                        )
                    }),
                None => {
                    Some("Establish business for minimum 2-3 years before applying".to_string())
                }
            },
            "turnover" => match borrower.annual_turnover {
                Some(current) => extract_number_from_string(&group.detail)
                    .filter(|target| *target > current)
                    .map(|target| {
                        format!(
                            "Increase annual turnover to ₹{}L+ (currently ₹{}L)",
                            target, current
                        )
                    }),
                None => Some("Work on increasing business revenue/turnover".to_string()),
            },
            "entity_type" => Some(
                "Consider changing entity structure or target lenders accepting your entity type"
                    .to_string(),
            ),
            "pincode" => Some(
                "Expand business to serviceable locations or check with local lenders".to_string(),
            ),
            "age" => Some("Wait until you meet the age requirement for lenders".to_string()),
            _ => None,
        };
        if let Some(action) = action {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
    }

    if borrower.feature_completeness < 80.0 {
        actions.push(
            "Upload missing documents (CIBIL, bank statements, GST) for better matching"
                .to_string(),
        );
    }
    if borrower.cibil_score.is_none() {
        actions.push("Get CIBIL report - this is critical for eligibility".to_string());
    }
    if borrower.business_vintage_years.is_none() {
        actions.push("Provide GST certificate or business registration proof".to_string());
    }

    (reasons, actions)
}

/// Dynamic recommendations: per failure family, how many products the fix
/// unlocks, the target value extracted from the failure strings, and the
/// concrete action. Computed for every scoring run, not only zero-pass.
pub fn generate_dynamic_recommendations(
    borrower: &BorrowerFeatureVector,
    all_results: &[EligibilityResult],
    today: NaiveDate,
) -> Vec<DynamicRecommendation> {
    struct Analysis {
        count: i64,
        lenders: Vec<String>,
        targets: Vec<f64>,
        detail: String,
    }

    let failed: Vec<&EligibilityResult> = all_results
        .iter()
        .filter(|r| r.hard_filter_status == HardFilterStatus::Fail)
        .collect();
    if failed.is_empty() {
        return Vec::new();
    }

    let mut analysis: BTreeMap<String, Analysis> = BTreeMap::new();
    for result in &failed {
        if let Some(failures) = result.details.failures() {
            for (key, detail) in failures {
                let entry = analysis.entry(key.clone()).or_insert_with(|| Analysis {
                    count: 0,
                    lenders: Vec::new(),
                    targets: Vec::new(),
                    detail: detail.clone(),
                });
                entry.count += 1;
                entry.lenders.push(result.lender_name.clone());
                if let Some(target) = extract_number_from_string(detail) {
                    entry.targets.push(target);
                }
            }
        }
    }

    let mut recommendations = Vec::new();
    for (key, data) in analysis {
        let max_target = data
            .targets
            .iter()
            .copied()
            .fold(None::<f64>, |acc, t| Some(acc.map_or(t, |m| m.max(t))));

        let mut recommendation = DynamicRecommendation {
            priority: data.count,
            priority_rank: 0,
            issue: String::new(),
            current: None,
            target: None,
            impact: format!(
                "Would unlock {} more lender{}",
                data.count,
                if data.count > 1 { "s" } else { "" }
            ),
            action: String::new(),
            lenders_affected: data.lenders.into_iter().take(5).collect(),
        };

        match key.as_str() {
            "cibil_score" => {
                recommendation.issue = "CIBIL Score Too Low".to_string();
                recommendation.current = Some(
                    borrower
                        .cibil_score
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target =
                    Some(format!("{}", max_target.unwrap_or(700.0)));
                recommendation.action =
                    "Pay off existing dues, reduce credit utilization, dispute errors on credit report"
                        .to_string();
            }
            "vintage" => {
                recommendation.issue = "Business Vintage Below Requirement".to_string();
                recommendation.current = Some(
                    borrower
                        .business_vintage_years
                        .map(|v| format!("{:.1} years", v))
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target = Some(
                    max_target
                        .map(|t| format!("{:.1} years", t))
                        .unwrap_or_else(|| "3 years".to_string()),
                );
                recommendation.action =
                    "Wait for business to reach minimum vintage or provide older business registration documents"
                        .to_string();
            }
            "turnover" => {
                recommendation.issue = "Annual Turnover Below Requirement".to_string();
                recommendation.current = Some(
                    borrower
                        .annual_turnover
                        .map(|v| format!("₹{}L", v))
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target = Some(
                    max_target
                        .map(|t| format!("₹{}L", t))
                        .unwrap_or_else(|| "₹15L".to_string()),
                );
                recommendation.action =
                    "Grow business revenue, consolidate turnover from multiple entities, or provide ITR showing higher income"
                        .to_string();
            }
            "abb" => {
                recommendation.issue = "Average Bank Balance Too Low".to_string();
                recommendation.current = Some(
                    borrower
                        .avg_monthly_balance
                        .map(|v| format!("₹{:.0}", v))
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target = Some(
                    max_target
                        .map(|t| format!("₹{:.0}", t))
                        .unwrap_or_else(|| "₹100000".to_string()),
                );
                recommendation.action =
                    "Maintain higher minimum balance, reduce unnecessary outflows, consolidate funds from multiple accounts"
                        .to_string();
            }
            "entity_type" => {
                recommendation.issue = "Entity Type Not Accepted".to_string();
                recommendation.current = Some(
                    borrower
                        .entity_type
                        .map(|e| e.as_str().to_string())
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target =
                    Some("Proprietorship, Partnership, or Pvt Ltd".to_string());
                recommendation.action =
                    "Consider restructuring business entity or target lenders that accept your entity type"
                        .to_string();
            }
            "pincode" => {
                recommendation.issue = "Location Not Serviceable".to_string();
                recommendation.current = Some(
                    borrower
                        .pincode
                        .clone()
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target = Some("Serviceable location".to_string());
                recommendation.action =
                    "Expand business to metro cities, register office in serviceable pincode, or check regional lenders"
                        .to_string();
            }
            "age" => {
                recommendation.issue = "Age Outside Accepted Range".to_string();
                recommendation.current = Some(
                    borrower
                        .dob
                        .map(|dob| format!("{} years", calculate_age(dob, today)))
                        .unwrap_or_else(|| "Not available".to_string()),
                );
                recommendation.target = Some("21-65 years".to_string());
                recommendation.action =
                    "Wait until you meet age requirement or apply through co-applicant/guarantor"
                        .to_string();
            }
            other => {
                recommendation.issue = other
                    .split('_')
                    .map(|word| {
                        let mut chars = word.chars();
                        match chars.next() {
                            Some(first) => {
                                first.to_uppercase().collect::<String>() + chars.as_str()
                            }
                            None => String::new(),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                recommendation.action = format!("Address: {}", data.detail);
            }
        }

        recommendations.push(recommendation);
    }

    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
    for (index, recommendation) in recommendations.iter_mut().enumerate() {
        recommendation.priority_rank = index as i32 + 1;
    }
    recommendations
}

/// Rebuild the explainability payload on a loaded pass row whose stored
/// details are minimal or legacy-shaped.
pub fn normalize_pass_details(
    result: &mut EligibilityResult,
    borrower: Option<&BorrowerFeatureVector>,
) {
    let mut payload = match &result.details {
        HardFilterDetails::Explainability(existing) => existing.clone(),
        // Legacy or minimal rows: start from an empty payload and rebuild.
        HardFilterDetails::Failures(_) => MatchExplainability {
            matched_signals: Vec::new(),
            score_breakdown: Vec::new(),
            lender_thresholds: LenderThresholds::default(),
            lender_terms: LenderTerms::default(),
        },
    };

    if payload.matched_signals.is_empty() {
        payload.matched_signals = default_matched_signals(borrower, result.eligibility_score);
    }
    payload.lender_terms = build_lender_terms(
        &result.lender_name,
        &result.product_name,
        payload.lender_terms,
    );

    result.details = HardFilterDetails::Explainability(payload);
}

fn default_matched_signals(
    borrower: Option<&BorrowerFeatureVector>,
    score: Option<f64>,
) -> Vec<String> {
    let Some(borrower) = borrower else {
        return match score {
            Some(score) => vec![format!("Composite eligibility score: {}/100.", score.round())],
            None => vec!["All hard filters satisfied for this lender profile.".to_string()],
        };
    };

    let mut signals = Vec::new();
    if let Some(entity) = borrower.entity_type {
        signals.push(format!("Entity type accepted: {}", entity.as_str()));
    }
    if let Some(cibil) = borrower.cibil_score {
        signals.push(format!("CIBIL within lender threshold: {}", cibil));
    }
    if let Some(vintage) = borrower.business_vintage_years {
        signals.push(format!("Business vintage considered: {} years", vintage));
    }
    if let Some(turnover) = borrower.annual_turnover {
        signals.push(format!("Annual turnover considered: ₹{}L", turnover));
    }
    if let Some(pincode) = &borrower.pincode {
        signals.push(format!("Pincode serviceability passed: {}", pincode));
    }
    if let Some(score) = score {
        signals.push(format!("Composite eligibility score: {}/100", score.round()));
    }

    if signals.is_empty() {
        return vec!["All hard filters satisfied for this lender profile.".to_string()];
    }
    signals.truncate(6);
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::enums::EntityType;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn strong_borrower() -> BorrowerFeatureVector {
        let mut vector = BorrowerFeatureVector {
            full_name: Some("RAVI KUMAR".into()),
            pan_number: Some("ABCPE1234F".into()),
            aadhaar_number: Some("123412341234".into()),
            dob: NaiveDate::from_ymd_opt(1985, 3, 12),
            entity_type: Some(EntityType::Proprietorship),
            business_vintage_years: Some(8.0),
            gstin: Some("27AABCU9603R1ZM".into()),
            industry_type: Some("trading".into()),
            pincode: Some("400001".into()),
            annual_turnover: Some(120.0),
            avg_monthly_balance: Some(400_000.0),
            monthly_credit_avg: Some(1_000_000.0),
            monthly_turnover: Some(1_000_000.0),
            emi_outflow_monthly: Some(150_000.0),
            bounce_count_12m: Some(0),
            cash_deposit_ratio: Some(0.15),
            itr_total_income: Some(1_500_000.0),
            cibil_score: Some(780),
            active_loan_count: Some(1),
            overdue_count: Some(0),
            enquiry_count_6m: Some(2),
            feature_completeness: 0.0,
        };
        vector.recompute_completeness();
        vector
    }

    fn product(lender: &str, min_cibil: i32) -> LenderProductRule {
        LenderProductRule {
            lender_name: lender.to_string(),
            product_name: "BL".to_string(),
            policy_available: true,
            min_cibil_score: Some(min_cibil),
            min_vintage_years: Some(2.0),
            min_turnover_annual: Some(20.0),
            max_ticket_size: Some(50.0),
            min_abb: Some(1.0),
            eligible_entity_types: vec!["proprietorship".into(), "partnership".into()],
            age_min: Some(21),
            age_max: Some(65),
            gst_required: true,
            kyc_documents: Some("PAN, Aadhaar".into()),
            ..Default::default()
        }
    }

    fn coverage(lenders: &[&str]) -> HashSet<String> {
        lenders.iter().map(|l| l.to_lowercase()).collect()
    }

    #[test]
    fn cibil_band_boundaries_land_in_expected_bands() {
        assert_eq!(score_cibil_band(Some(750)), Some(100.0));
        assert_eq!(score_cibil_band(Some(749)), Some(90.0));
        assert_eq!(score_cibil_band(Some(725)), Some(90.0));
        assert_eq!(score_cibil_band(Some(724)), Some(75.0));
        assert_eq!(score_cibil_band(Some(700)), Some(75.0));
        assert_eq!(score_cibil_band(Some(699)), Some(60.0));
        assert_eq!(score_cibil_band(Some(675)), Some(60.0));
        assert_eq!(score_cibil_band(Some(674)), Some(40.0));
        assert_eq!(score_cibil_band(Some(650)), Some(40.0));
        assert_eq!(score_cibil_band(Some(649)), Some(20.0));
        assert_eq!(score_cibil_band(None), None);
    }

    #[test]
    fn probability_bands_follow_score_thresholds() {
        assert_eq!(determine_approval_probability(75.0), ApprovalProbability::High);
        assert_eq!(determine_approval_probability(74.99), ApprovalProbability::Medium);
        assert_eq!(determine_approval_probability(50.0), ApprovalProbability::Medium);
        assert_eq!(determine_approval_probability(49.99), ApprovalProbability::Low);
    }

    #[test]
    fn strong_borrower_passes_multiple_lenders_with_high_probability() {
        let borrower = strong_borrower();
        let products = vec![
            product("Tata Capital", 700),
            product("Godrej", 720),
            product("IIFL", 680),
            product("Lendingkart", 700),
        ];
        let lenders = coverage(&["Tata Capital", "Godrej", "IIFL", "Lendingkart"]);

        let results = score_products(&borrower, &products, &lenders, today());
        let high_passes: Vec<_> = results
            .iter()
            .filter(|r| {
                r.hard_filter_status == HardFilterStatus::Pass
                    && r.approval_probability == Some(ApprovalProbability::High)
            })
            .collect();
        assert!(high_passes.len() >= 3, "only {} high passes", high_passes.len());

        for result in &results {
            if result.hard_filter_status == HardFilterStatus::Pass {
                let score = result.eligibility_score.unwrap();
                assert!((0.0..=100.0).contains(&score));
                assert!(result.rank.is_some());
                if let Some(max_ticket) = result.expected_ticket_max {
                    assert!(max_ticket <= 50.0 + 1e-9);
                }
            } else {
                assert!(result.eligibility_score.is_none());
                assert!(result.rank.is_none());
            }
        }
    }

    #[test]
    fn ranking_is_dense_and_score_ordered() {
        let borrower = strong_borrower();
        let products = vec![
            product("Tata Capital", 700),
            product("Godrej", 760),
            product("IIFL", 680),
        ];
        let lenders = coverage(&["Tata Capital", "Godrej", "IIFL"]);
        let results = score_products(&borrower, &products, &lenders, today());

        let passes: Vec<_> = results
            .iter()
            .filter(|r| r.hard_filter_status == HardFilterStatus::Pass)
            .collect();
        for (index, result) in passes.iter().enumerate() {
            assert_eq!(result.rank, Some(index as i32 + 1));
            if index > 0 {
                assert!(
                    passes[index - 1].eligibility_score.unwrap()
                        >= result.eligibility_score.unwrap()
                );
            }
        }
    }

    #[test]
    fn weak_borrower_fails_with_cibil_and_vintage_reasons() {
        let mut borrower = strong_borrower();
        borrower.cibil_score = Some(620);
        borrower.business_vintage_years = Some(1.5);
        borrower.annual_turnover = Some(15.0);
        borrower.bounce_count_12m = Some(5);
        borrower.cash_deposit_ratio = Some(0.55);

        let products = vec![product("Tata Capital", 700), product("Godrej", 700)];
        let lenders = coverage(&["Tata Capital", "Godrej"]);
        let results = score_products(&borrower, &products, &lenders, today());

        assert!(results
            .iter()
            .all(|r| r.hard_filter_status == HardFilterStatus::Fail));

        let failed: Vec<EligibilityResult> = results.clone();
        let (reasons, actions) = generate_rejection_analysis(&borrower, &failed);
        assert!(reasons.iter().any(|r| r.contains("CIBIL 620 < required 700")));
        assert!(reasons.iter().any(|r| r.contains("All lenders")));
        assert!(!actions.is_empty());

        let recommendations = generate_dynamic_recommendations(&borrower, &results, today());
        assert_eq!(recommendations[0].priority_rank, 1);
        assert!(recommendations
            .iter()
            .any(|r| r.issue == "CIBIL Score Too Low"));
        let cibil_rec = recommendations
            .iter()
            .find(|r| r.issue == "CIBIL Score Too Low")
            .unwrap();
        assert_eq!(cibil_rec.target.as_deref(), Some("700"));
    }

    #[test]
    fn unserviceable_pincode_fails_everywhere() {
        let mut borrower = strong_borrower();
        borrower.pincode = Some("999999".into());

        let products = vec![product("Tata Capital", 700), product("IIFL", 680)];
        // Coverage set empty: nobody services this pincode.
        let results = score_products(&borrower, &products, &HashSet::new(), today());

        for result in &results {
            assert_eq!(result.hard_filter_status, HardFilterStatus::Fail);
            let failures = result.details.failures().unwrap();
            assert!(failures.contains_key("pincode"));
        }

        let recommendations = generate_dynamic_recommendations(&borrower, &results, today());
        assert!(recommendations
            .iter()
            .any(|r| r.issue == "Location Not Serviceable"));
    }

    #[test]
    fn policy_unavailable_short_circuits() {
        let borrower = strong_borrower();
        let mut p = product("Tata Capital", 700);
        p.policy_available = false;
        let (status, failures) =
            apply_hard_filters(&borrower, &p, &coverage(&["Tata Capital"]), today());
        assert_eq!(status, HardFilterStatus::Fail);
        assert_eq!(
            failures.get("policy_available").map(String::as_str),
            Some("Policy not available")
        );
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn degenerate_age_range_normalizes() {
        let mut borrower = strong_borrower();
        borrower.dob = NaiveDate::from_ymd_opt(1970, 1, 1); // age 55 at today()

        // "60-60" style row: high equal bounds become upper-bound-only.
        let mut p = product("Tata Capital", 700);
        p.age_min = Some(60);
        p.age_max = Some(60);
        let (status, failures) =
            apply_hard_filters(&borrower, &p, &coverage(&["Tata Capital"]), today());
        assert_eq!(status, HardFilterStatus::Pass, "failures: {:?}", failures);

        // "25-25" style row: low equal bounds become lower-bound-only.
        let mut p = product("Tata Capital", 700);
        p.age_min = Some(25);
        p.age_max = Some(25);
        let (status, _) =
            apply_hard_filters(&borrower, &p, &coverage(&["Tata Capital"]), today());
        assert_eq!(status, HardFilterStatus::Pass);
    }

    #[test]
    fn entity_equivalence_accepts_aliases() {
        let mut borrower = strong_borrower();
        borrower.entity_type = Some(EntityType::PvtLtd);

        let mut p = product("Tata Capital", 700);
        p.eligible_entity_types = vec!["Private Limited".to_string()];
        let (status, _) =
            apply_hard_filters(&borrower, &p, &coverage(&["Tata Capital"]), today());
        assert_eq!(status, HardFilterStatus::Pass);

        p.eligible_entity_types = vec!["trust".to_string()];
        let (status, failures) =
            apply_hard_filters(&borrower, &p, &coverage(&["Tata Capital"]), today());
        assert_eq!(status, HardFilterStatus::Fail);
        assert!(failures.contains_key("entity_type"));
    }

    #[test]
    fn foir_bands() {
        assert_eq!(score_foir(Some(29.0), Some(100.0)), Some(100.0));
        assert_eq!(score_foir(Some(30.0), Some(100.0)), Some(75.0));
        assert_eq!(score_foir(Some(54.0), Some(100.0)), Some(50.0));
        assert_eq!(score_foir(Some(64.0), Some(100.0)), Some(30.0));
        assert_eq!(score_foir(Some(70.0), Some(100.0)), Some(0.0));
        assert_eq!(score_foir(Some(10.0), Some(0.0)), None);
    }

    #[test]
    fn missing_components_renormalize_weights() {
        // Borrower with only a CIBIL score: the composite equals the CIBIL
        // band sub-score exactly (documentation also contributes since the
        // product requires docs the borrower lacks -> 0 score).
        let borrower = BorrowerFeatureVector {
            cibil_score: Some(780),
            feature_completeness: 4.76,
            ..Default::default()
        };
        let mut p = product("Tata Capital", 700);
        p.gst_required = false;
        p.kyc_documents = None;
        p.ownership_proof_required = false;

        let (score, components) = calculate_score_with_breakdown(&borrower, &p);
        // Components present: cibil (100) and documentation (100, nothing
        // required). Weighted: (100*25 + 100*10)/35 = 100.
        assert_eq!(score, 100.0);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn ticket_range_respects_product_cap_and_turnover_limit() {
        let borrower = strong_borrower(); // turnover 120L
        let p = product("Tata Capital", 700); // cap 50L
        let (min_ticket, max_ticket) = calculate_ticket_range(&borrower, &p, 85.0);
        // min(50, 120*0.25=30) = 30
        assert_eq!(max_ticket, Some(30.0));
        assert_eq!(min_ticket, Some(4.5));
    }

    #[test]
    fn second_number_is_extracted_as_target() {
        assert_eq!(extract_number_from_string("CIBIL 620 < required 700"), Some(700.0));
        assert_eq!(extract_number_from_string("₹15L < required ₹25L"), Some(25.0));
        assert_eq!(extract_number_from_string("Pincode 999999 not serviceable"), None);
    }

    #[test]
    fn normalize_pass_details_rebuilds_signals_and_terms() {
        let borrower = strong_borrower();
        let mut result = EligibilityResult {
            lender_name: "Lendingkart".to_string(),
            product_name: "Digital BL".to_string(),
            hard_filter_status: HardFilterStatus::Pass,
            details: HardFilterDetails::Failures(BTreeMap::new()),
            eligibility_score: Some(82.0),
            approval_probability: Some(ApprovalProbability::High),
            expected_ticket_min: Some(3.0),
            expected_ticket_max: Some(20.0),
            confidence: 0.9,
            missing_for_improvement: Vec::new(),
            rank: Some(1),
        };

        normalize_pass_details(&mut result, Some(&borrower));
        let payload = result.details.explainability().unwrap();
        assert!(!payload.matched_signals.is_empty());
        assert_eq!(
            payload.lender_terms.interest_rate_range.as_deref(),
            Some("18% - 36%")
        );
    }
}
