//! Document checklist engine.
//!
//! Validates document coverage per program type, computes the case
//! completeness score, and produces progressive data-capture prompts for
//! missing documents. Manual overrides on the case count as virtual
//! documents: a manually entered CIBIL score covers the CIBIL report slot,
//! vintage covers the GST certificate, monthly turnover covers GST returns.

use std::collections::HashSet;

use serde_json::json;
use shared::dtos::{DocumentChecklist, ManualFieldPrompt};
use shared::models::enums::{DocumentKind, ProgramType};

/// Requirement sets for one program type.
pub struct ProgramRequirements {
    pub required: &'static [DocumentKind],
    /// At least one of these must be present; the group counts as a single
    /// checklist slot.
    pub required_any_of: &'static [DocumentKind],
    pub optional: &'static [DocumentKind],
}

pub fn program_requirements(program_type: ProgramType) -> ProgramRequirements {
    match program_type {
        ProgramType::Banking => ProgramRequirements {
            required: &[
                DocumentKind::BankStatement,
                DocumentKind::Aadhaar,
                DocumentKind::GstCertificate,
                DocumentKind::CibilReport,
            ],
            required_any_of: &[DocumentKind::PanPersonal, DocumentKind::PanBusiness],
            optional: &[
                DocumentKind::UdyamShopLicense,
                DocumentKind::PropertyDocuments,
                DocumentKind::GstReturns,
            ],
        },
        ProgramType::Income => ProgramRequirements {
            required: &[
                DocumentKind::Itr,
                DocumentKind::FinancialStatements,
                DocumentKind::Aadhaar,
                DocumentKind::CibilReport,
            ],
            required_any_of: &[DocumentKind::PanPersonal, DocumentKind::PanBusiness],
            optional: &[
                DocumentKind::UdyamShopLicense,
                DocumentKind::PropertyDocuments,
                DocumentKind::GstCertificate,
                DocumentKind::GstReturns,
            ],
        },
        ProgramType::Hybrid => ProgramRequirements {
            required: &[
                DocumentKind::BankStatement,
                DocumentKind::Itr,
                DocumentKind::GstCertificate,
                DocumentKind::CibilReport,
                DocumentKind::Aadhaar,
            ],
            required_any_of: &[DocumentKind::PanPersonal, DocumentKind::PanBusiness],
            optional: &[
                DocumentKind::UdyamShopLicense,
                DocumentKind::PropertyDocuments,
                DocumentKind::GstReturns,
                DocumentKind::FinancialStatements,
            ],
        },
    }
}

/// Manual override values mirrored from the case row.
#[derive(Debug, Clone, Default)]
pub struct ManualOverrides {
    pub cibil_score_manual: Option<i32>,
    pub business_vintage_years: Option<f64>,
    pub monthly_turnover_manual: Option<f64>,
}

impl ManualOverrides {
    /// Document slots covered by manual entries.
    fn virtual_documents(&self) -> Vec<DocumentKind> {
        let mut covered = Vec::new();
        if self.cibil_score_manual.map(|v| v > 0).unwrap_or(false) {
            covered.push(DocumentKind::CibilReport);
        }
        if self.business_vintage_years.map(|v| v > 0.0).unwrap_or(false) {
            covered.push(DocumentKind::GstCertificate);
        }
        if self.monthly_turnover_manual.map(|v| v > 0.0).unwrap_or(false) {
            covered.push(DocumentKind::GstReturns);
        }
        covered
    }
}

/// Build the checklist for a case from its classified documents and manual
/// overrides.
pub fn generate_checklist(
    program_type: ProgramType,
    classified: &[DocumentKind],
    unreadable: Vec<String>,
    overrides: &ManualOverrides,
) -> DocumentChecklist {
    let requirements = program_requirements(program_type);

    let mut available: HashSet<DocumentKind> = classified
        .iter()
        .copied()
        .filter(|kind| *kind != DocumentKind::Unknown)
        .collect();
    available.extend(overrides.virtual_documents());

    let mut missing: Vec<DocumentKind> = requirements
        .required
        .iter()
        .copied()
        .filter(|kind| !available.contains(kind))
        .collect();

    let any_of_satisfied = requirements
        .required_any_of
        .iter()
        .any(|kind| available.contains(kind));
    if !requirements.required_any_of.is_empty() && !any_of_satisfied {
        // All options are listed so the operator knows any one will do.
        missing.extend(requirements.required_any_of.iter().copied());
    }

    let optional_present: Vec<DocumentKind> = requirements
        .optional
        .iter()
        .copied()
        .filter(|kind| available.contains(kind))
        .collect();

    let completeness_score = calculate_completeness(
        &available,
        requirements.required,
        requirements.required_any_of,
    );

    let mut available: Vec<DocumentKind> = available.into_iter().collect();
    available.sort_by_key(|kind| kind.as_str());

    DocumentChecklist {
        program_type,
        available,
        missing,
        unreadable,
        optional_present,
        completeness_score,
    }
}

/// Completeness = earned points / total points, where each required document
/// is one point and the any-of group is one point collectively.
fn calculate_completeness(
    available: &HashSet<DocumentKind>,
    required: &[DocumentKind],
    required_any_of: &[DocumentKind],
) -> f64 {
    let mut total_points = required.len();
    let mut earned_points = required
        .iter()
        .filter(|kind| available.contains(kind))
        .count();

    if !required_any_of.is_empty() {
        total_points += 1;
        if required_any_of.iter().any(|kind| available.contains(kind)) {
            earned_points += 1;
        }
    }

    if total_points == 0 {
        return 0.0;
    }

    let pct = (earned_points as f64 / total_points as f64) * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Manual data-capture prompts for checklist gaps that have a manual slot.
pub fn manual_prompts_for_missing(
    missing: &[DocumentKind],
    overrides: &ManualOverrides,
) -> Vec<ManualFieldPrompt> {
    let mut prompts = Vec::new();

    for kind in missing {
        match kind {
            DocumentKind::CibilReport => prompts.push(ManualFieldPrompt {
                field_name: "cibil_score_manual".to_string(),
                label: "CIBIL Score".to_string(),
                reason: "CIBIL report not uploaded".to_string(),
                field_type: "number".to_string(),
                current_value: overrides.cibil_score_manual.map(|v| json!(v)),
            }),
            DocumentKind::GstCertificate => {
                prompts.push(ManualFieldPrompt {
                    field_name: "business_vintage_years".to_string(),
                    label: "Business Vintage (years)".to_string(),
                    reason: "GST certificate not uploaded".to_string(),
                    field_type: "number".to_string(),
                    current_value: overrides.business_vintage_years.map(|v| json!(v)),
                });
                prompts.push(ManualFieldPrompt {
                    field_name: "entity_type".to_string(),
                    label: "Entity Type".to_string(),
                    reason: "GST certificate not uploaded".to_string(),
                    field_type: "select".to_string(),
                    current_value: None,
                });
            }
            DocumentKind::GstReturns => prompts.push(ManualFieldPrompt {
                field_name: "monthly_turnover_manual".to_string(),
                label: "Approximate Monthly Turnover (₹)".to_string(),
                reason: "GST returns not uploaded".to_string(),
                field_type: "number".to_string(),
                current_value: overrides.monthly_turnover_manual.map(|v| json!(v)),
            }),
            _ => {}
        }
    }

    prompts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_banking_docs_score_100() {
        let classified = [
            DocumentKind::BankStatement,
            DocumentKind::Aadhaar,
            DocumentKind::GstCertificate,
            DocumentKind::CibilReport,
            DocumentKind::PanPersonal,
        ];
        let checklist = generate_checklist(
            ProgramType::Banking,
            &classified,
            Vec::new(),
            &ManualOverrides::default(),
        );
        assert_eq!(checklist.completeness_score, 100.0);
        assert!(checklist.missing.is_empty());
    }

    #[test]
    fn manual_cibil_score_covers_the_report_slot() {
        let classified = [
            DocumentKind::BankStatement,
            DocumentKind::Aadhaar,
            DocumentKind::GstCertificate,
            DocumentKind::PanPersonal,
        ];
        let overrides = ManualOverrides {
            cibil_score_manual: Some(720),
            ..Default::default()
        };
        let checklist =
            generate_checklist(ProgramType::Banking, &classified, Vec::new(), &overrides);
        assert_eq!(checklist.completeness_score, 100.0);
        assert!(!checklist.missing.contains(&DocumentKind::CibilReport));
    }

    #[test]
    fn missing_any_of_lists_both_pan_variants() {
        let classified = [
            DocumentKind::BankStatement,
            DocumentKind::Aadhaar,
            DocumentKind::GstCertificate,
            DocumentKind::CibilReport,
        ];
        let checklist = generate_checklist(
            ProgramType::Banking,
            &classified,
            Vec::new(),
            &ManualOverrides::default(),
        );
        assert!(checklist.missing.contains(&DocumentKind::PanPersonal));
        assert!(checklist.missing.contains(&DocumentKind::PanBusiness));
        // 4 of 5 slots covered.
        assert_eq!(checklist.completeness_score, 80.0);
    }

    #[test]
    fn completeness_score_stays_in_bounds() {
        let checklist = generate_checklist(
            ProgramType::Hybrid,
            &[],
            Vec::new(),
            &ManualOverrides::default(),
        );
        assert!(checklist.completeness_score >= 0.0);
        assert!(checklist.completeness_score <= 100.0);
        assert_eq!(checklist.completeness_score, 0.0);
    }

    #[test]
    fn unknown_kinds_do_not_count_as_available() {
        let checklist = generate_checklist(
            ProgramType::Banking,
            &[DocumentKind::Unknown],
            vec!["blurry_scan.jpg".to_string()],
            &ManualOverrides::default(),
        );
        assert!(checklist.available.is_empty());
        assert_eq!(checklist.unreadable, vec!["blurry_scan.jpg".to_string()]);
    }

    #[test]
    fn prompts_cover_manual_capable_slots_only() {
        let missing = [
            DocumentKind::CibilReport,
            DocumentKind::GstCertificate,
            DocumentKind::GstReturns,
            DocumentKind::BankStatement,
        ];
        let prompts = manual_prompts_for_missing(&missing, &ManualOverrides::default());
        // CIBIL -> 1 prompt, GST certificate -> 2, GST returns -> 1,
        // bank statement has no manual equivalent.
        assert_eq!(prompts.len(), 4);
        assert!(prompts.iter().any(|p| p.field_name == "cibil_score_manual"));
        assert!(prompts.iter().any(|p| p.field_name == "entity_type"));
        assert!(prompts
            .iter()
            .any(|p| p.field_name == "monthly_turnover_manual"));
    }
}
