//! End-to-end pipeline scenarios over the pure engines.
//!
//! These tests drive the classifier, extractor, assembler, eligibility
//! engine and report analysis with constructed fixtures, checking the same
//! outcomes an operator would see for archetypal borrowers.

use chrono::NaiveDate;
use std::collections::HashSet;

use backend::services::classifier::DocumentClassifier;
use backend::services::eligibility::{
    generate_dynamic_recommendations, generate_rejection_analysis, score_products,
};
use backend::services::extractor::FieldExtractor;
use backend::services::features::{FeatureAssembler, ManualOverlay};
use backend::services::report::{compute_risk_flags, compute_strengths, fallback_strategy};
use shared::dtos::{DocumentChecklist, EligibilityResult, ExtractedFieldItem, LenderProductRule};
use shared::models::enums::{
    ApprovalProbability, DocumentKind, EntityType, HardFilterStatus, ProgramType,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn product(lender: &str, min_cibil: i32, min_vintage: f64, min_turnover: f64) -> LenderProductRule {
    LenderProductRule {
        lender_name: lender.to_string(),
        product_name: "BL".to_string(),
        policy_available: true,
        min_cibil_score: Some(min_cibil),
        min_vintage_years: Some(min_vintage),
        min_turnover_annual: Some(min_turnover),
        max_ticket_size: Some(50.0),
        min_abb: Some(1.0),
        eligible_entity_types: vec!["proprietorship".into(), "partnership".into(), "pvt_ltd".into()],
        age_min: Some(21),
        age_max: Some(65),
        gst_required: true,
        kyc_documents: Some("PAN, Aadhaar".into()),
        ..Default::default()
    }
}

fn knowledge_base() -> Vec<LenderProductRule> {
    vec![
        product("Tata Capital", 700, 2.0, 20.0),
        product("Godrej", 720, 3.0, 25.0),
        product("IIFL", 680, 2.0, 15.0),
        product("Lendingkart", 700, 1.0, 12.0),
        product("NeoGrowth", 650, 2.0, 18.0),
    ]
}

fn coverage_for(lenders: &[&str]) -> HashSet<String> {
    lenders.iter().map(|name| name.to_lowercase()).collect()
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

/// Build a feature vector from document texts the way the worker and the
/// extraction endpoint would: classify, extract, merge with bank-analysis
/// evidence and manual overlay.
fn assemble_from_documents(
    docs: &[(&str, &str)],
    bank_fields: &[ExtractedFieldItem],
    overlay: &ManualOverlay,
) -> shared::dtos::BorrowerFeatureVector {
    let classifier = DocumentClassifier::new();
    let extractor = FieldExtractor::new();

    let mut fields: Vec<ExtractedFieldItem> = Vec::new();
    for (filename, text) in docs {
        let classification = classifier.classify(text, Some(filename));
        fields.extend(extractor.extract_fields(text, classification.kind));
    }
    fields.extend_from_slice(bank_fields);

    FeatureAssembler::default().assemble(overlay, &fields)
}

#[test]
fn strong_borrower_full_docs_lands_high_probability_matches() {
    let cibil_text = "TransUnion CIBIL Credit Information Report\n\
                      Credit Score: 780\nActive Accounts: 1\nEnquiries: 2\n\
                      Account Summary Credit History Bureau";
    let pan_text = "Income Tax Department\nPermanent Account Number\nABCPE1234F\n\
                    Name: RAVI KUMAR\nDate of Birth: 12/03/1985\nFather's Name: X\nSignature";
    let gst_text = "Goods and Services Tax\nCertificate of Registration\n\
                    GSTIN: 27AABCU9603R1ZM\nLegal Name: KUMAR TRADING\n\
                    Date of Registration: 01/04/2017\nState Code: 27";

    let bank_fields = vec![
        ExtractedFieldItem::from_bank_analysis("avg_monthly_balance", "400000.00", 0.9),
        ExtractedFieldItem::from_bank_analysis("monthly_credit_avg", "1000000.00", 0.9),
        ExtractedFieldItem::from_bank_analysis("monthly_turnover", "1000000.00", 0.9),
        ExtractedFieldItem::from_bank_analysis("annual_turnover", "120.00", 0.9),
        ExtractedFieldItem::from_bank_analysis("emi_outflow_monthly", "150000.00", 0.9),
        ExtractedFieldItem::from_bank_analysis("bounce_count_12m", "0", 0.9),
        ExtractedFieldItem::from_bank_analysis("cash_deposit_ratio", "0.1500", 0.9),
    ];

    let overlay = ManualOverlay {
        entity_type: Some("proprietorship".to_string()),
        business_vintage_years: Some(8.0),
        pincode: Some("400001".to_string()),
        ..Default::default()
    };

    let borrower = assemble_from_documents(
        &[
            ("cibil_report.pdf", cibil_text),
            ("pan_card.pdf", pan_text),
            ("gst_certificate.pdf", gst_text),
        ],
        &bank_fields,
        &overlay,
    );

    assert_eq!(borrower.cibil_score, Some(780));
    assert_eq!(borrower.entity_type, Some(EntityType::Proprietorship));
    assert_eq!(borrower.gstin.as_deref(), Some("27AABCU9603R1ZM"));
    assert_eq!(borrower.annual_turnover, Some(120.0));

    let products = knowledge_base();
    let coverage = coverage_for(&["Tata Capital", "Godrej", "IIFL", "Lendingkart", "NeoGrowth"]);
    let results = score_products(&borrower, &products, &coverage, today());

    let high_matches: Vec<&EligibilityResult> = results
        .iter()
        .filter(|r| {
            r.hard_filter_status == HardFilterStatus::Pass
                && r.approval_probability == Some(ApprovalProbability::High)
        })
        .collect();
    assert!(
        high_matches.len() >= 3,
        "expected >= 3 high-probability matches, got {}",
        high_matches.len()
    );

    let strengths = compute_strengths(&borrower, &results);
    assert!(strengths.iter().any(|s| s.contains("Excellent credit score")));

    let risks = compute_risk_flags(&borrower, Some(&full_checklist()), &results);
    assert!(risks.is_empty(), "unexpected risks: {:?}", risks);

    let passed: Vec<EligibilityResult> = results
        .iter()
        .filter(|r| r.hard_filter_status == HardFilterStatus::Pass)
        .cloned()
        .collect();
    let strategy = fallback_strategy(&passed, None);
    assert!(strategy.contains(&passed[0].lender_name));
}

#[test]
fn weak_borrower_missing_docs_gets_rejection_analysis() {
    let borrower = {
        let overlay = ManualOverlay {
            entity_type: Some("proprietorship".to_string()),
            business_vintage_years: Some(1.5),
            pincode: Some("400001".to_string()),
            cibil_score_manual: Some(620),
            ..Default::default()
        };
        let fields = vec![
            ExtractedFieldItem::new("pan_number", "ABCPE1234F", 0.9),
            ExtractedFieldItem::new("aadhaar_number", "123412341234", 0.85),
            ExtractedFieldItem::from_bank_analysis("annual_turnover", "15.0", 0.9),
            ExtractedFieldItem::from_bank_analysis("avg_monthly_balance", "150000.0", 0.9),
            ExtractedFieldItem::from_bank_analysis("bounce_count_12m", "5", 0.9),
            ExtractedFieldItem::from_bank_analysis("cash_deposit_ratio", "0.55", 0.9),
        ];
        FeatureAssembler::default().assemble(&overlay, &fields)
    };

    let products = knowledge_base();
    let coverage = coverage_for(&["Tata Capital", "Godrej", "IIFL", "Lendingkart", "NeoGrowth"]);
    let results = score_products(&borrower, &products, &coverage, today());

    assert!(results
        .iter()
        .all(|r| r.hard_filter_status == HardFilterStatus::Fail));

    let (reasons, actions) = generate_rejection_analysis(&borrower, &results);
    assert!(reasons.iter().any(|r| r.contains("CIBIL 620")));
    assert!(reasons
        .iter()
        .any(|r| r.contains("required") && r.contains("y")));
    assert!(!actions.is_empty());

    let recommendations = generate_dynamic_recommendations(&borrower, &results, today());
    assert_eq!(recommendations[0].issue, "CIBIL Score Too Low");
    assert_eq!(recommendations[0].priority_rank, 1);

    let mut checklist = full_checklist();
    checklist.missing = vec![
        DocumentKind::BankStatement,
        DocumentKind::GstCertificate,
        DocumentKind::CibilReport,
    ];
    let risks = compute_risk_flags(&borrower, Some(&checklist), &results);
    assert!(risks.iter().any(|r| r.contains("Low credit score")));
    assert!(risks.iter().any(|r| r.contains("Incomplete documentation")));
}

#[test]
fn unserviceable_pincode_fails_every_product_with_pincode_reason() {
    let overlay = ManualOverlay {
        entity_type: Some("proprietorship".to_string()),
        business_vintage_years: Some(6.0),
        pincode: Some("999999".to_string()),
        cibil_score_manual: Some(750),
        ..Default::default()
    };
    let fields = vec![ExtractedFieldItem::from_bank_analysis(
        "annual_turnover",
        "80.0",
        0.9,
    )];
    let borrower = FeatureAssembler::default().assemble(&overlay, &fields);

    let products = knowledge_base();
    // No lender covers 999999.
    let results = score_products(&borrower, &products, &HashSet::new(), today());

    for result in &results {
        assert_eq!(result.hard_filter_status, HardFilterStatus::Fail);
        assert!(result.details.failures().unwrap().contains_key("pincode"));
    }

    let recommendations = generate_dynamic_recommendations(&borrower, &results, today());
    assert!(recommendations
        .iter()
        .any(|r| r.issue == "Location Not Serviceable"));
}

#[test]
fn rescoring_an_unchanged_case_is_deterministic() {
    let overlay = ManualOverlay {
        entity_type: Some("pvt ltd".to_string()),
        business_vintage_years: Some(4.0),
        pincode: Some("400001".to_string()),
        cibil_score_manual: Some(735),
        ..Default::default()
    };
    let fields = vec![
        ExtractedFieldItem::from_bank_analysis("annual_turnover", "60.0", 0.9),
        ExtractedFieldItem::from_bank_analysis("avg_monthly_balance", "220000.0", 0.9),
        ExtractedFieldItem::from_bank_analysis("monthly_credit_avg", "500000.0", 0.9),
        ExtractedFieldItem::from_bank_analysis("emi_outflow_monthly", "90000.0", 0.9),
        ExtractedFieldItem::from_bank_analysis("bounce_count_12m", "1", 0.9),
        ExtractedFieldItem::from_bank_analysis("cash_deposit_ratio", "0.18", 0.9),
    ];

    let assembler = FeatureAssembler::default();
    let first_vector = assembler.assemble(&overlay, &fields);
    let second_vector = assembler.assemble(&overlay, &fields);
    assert_eq!(first_vector, second_vector);

    let products = knowledge_base();
    let coverage = coverage_for(&["Tata Capital", "Godrej", "IIFL", "Lendingkart", "NeoGrowth"]);

    let first = score_products(&first_vector, &products, &coverage, today());
    let second = score_products(&second_vector, &products, &coverage, today());

    let ranked = |results: &[EligibilityResult]| -> Vec<(String, Option<i32>, Option<f64>)> {
        results
            .iter()
            .map(|r| (r.lender_name.clone(), r.rank, r.eligibility_score))
            .collect()
    };
    assert_eq!(ranked(&first), ranked(&second));
}
