//! PDF rendering for the case report.
//!
//! A4 layout: cover block, borrower profile, document status, strengths and
//! risks, the lender match table (rows banded by approval probability) and
//! the recommendation footer. Built-in Helvetica fonts only, so amounts are
//! written with an "Rs." prefix rather than the rupee glyph.

use chrono::{DateTime, Utc};
use printpdf::{
    path::{PaintMode, WindingOrder},
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};

use crate::error::{ServiceError, ServiceResult};
use shared::dtos::CaseReportData;
use shared::models::enums::{ApprovalProbability, HardFilterStatus};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const LINE_HEIGHT_MM: f32 = 6.0;

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor_y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> ServiceResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ServiceError::Internal(format!("pdf font: {}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ServiceError::Internal(format!("pdf font: {}", e)))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor_y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn ensure_space(&mut self, needed_mm: f32) {
        if self.cursor_y - needed_mm < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(LINE_HEIGHT_MM * 2.5);
        self.cursor_y -= LINE_HEIGHT_MM * 1.5;
        self.layer.use_text(
            text,
            14.0,
            Mm(MARGIN_MM),
            Mm(self.cursor_y),
            &self.bold,
        );
        self.cursor_y -= LINE_HEIGHT_MM * 0.5;
    }

    fn line(&mut self, text: &str) {
        self.ensure_space(LINE_HEIGHT_MM);
        self.cursor_y -= LINE_HEIGHT_MM;
        self.layer.use_text(
            text,
            10.0,
            Mm(MARGIN_MM),
            Mm(self.cursor_y),
            &self.regular,
        );
    }

    /// Wrap long prose at roughly 95 characters per line.
    fn paragraph(&mut self, text: &str) {
        for raw_line in text.lines() {
            let mut current = String::new();
            for word in raw_line.split_whitespace() {
                if current.len() + word.len() + 1 > 95 {
                    self.line(&current);
                    current = word.to_string();
                } else if current.is_empty() {
                    current = word.to_string();
                } else {
                    current.push(' ');
                    current.push_str(word);
                }
            }
            if !current.is_empty() {
                self.line(&current);
            }
        }
    }

    fn banded_row(&mut self, text: &str, color: Rgb) {
        self.ensure_space(LINE_HEIGHT_MM * 1.2);
        self.cursor_y -= LINE_HEIGHT_MM * 1.2;

        let rect = Rect::new(
            Mm(MARGIN_MM - 1.0),
            Mm(self.cursor_y - 1.5),
            Mm(PAGE_WIDTH_MM - MARGIN_MM + 1.0),
            Mm(self.cursor_y + 4.5),
        )
        .with_mode(PaintMode::Fill)
        .with_winding(WindingOrder::NonZero);
        self.layer.set_fill_color(Color::Rgb(color));
        self.layer.add_rect(rect);

        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None)));
        self.layer.use_text(
            text,
            9.5,
            Mm(MARGIN_MM),
            Mm(self.cursor_y),
            &self.regular,
        );
    }

    fn finish(self) -> ServiceResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| ServiceError::Internal(format!("pdf save: {}", e)))
    }
}

fn probability_band_color(probability: Option<ApprovalProbability>) -> Rgb {
    match probability {
        Some(ApprovalProbability::High) => Rgb::new(0.80, 0.93, 0.80, None),
        Some(ApprovalProbability::Medium) => Rgb::new(0.98, 0.92, 0.75, None),
        _ => Rgb::new(0.96, 0.80, 0.78, None),
    }
}

fn optional_number(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|v| format!("{:.1}{}", v, suffix))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Render the report to PDF bytes.
pub fn render_case_report_pdf(
    report: &CaseReportData,
    generated_at: DateTime<Utc>,
) -> ServiceResult<Vec<u8>> {
    let mut writer = PdfWriter::new(&format!("Case Report {}", report.case_id))?;
    let borrower = &report.borrower_profile;

    // Cover block
    writer.cursor_y -= LINE_HEIGHT_MM * 2.0;
    writer.layer.use_text(
        "Case Intelligence Report",
        22.0,
        Mm(MARGIN_MM),
        Mm(writer.cursor_y),
        &writer.bold,
    );
    writer.cursor_y -= LINE_HEIGHT_MM * 1.6;
    writer.line(&format!("Case: {}", report.case_id));
    writer.line(&format!(
        "Generated: {}",
        generated_at.format("%d %b %Y %H:%M UTC")
    ));

    // Borrower profile
    writer.heading("Borrower Profile");
    writer.line(&format!(
        "Name: {}",
        borrower.full_name.as_deref().unwrap_or("N/A")
    ));
    writer.line(&format!(
        "Entity: {} | Vintage: {}",
        borrower
            .entity_type
            .map(|e| e.as_str().to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        optional_number(borrower.business_vintage_years, " years")
    ));
    writer.line(&format!(
        "CIBIL: {} | Annual Turnover: {}",
        borrower
            .cibil_score
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        optional_number(borrower.annual_turnover, "L (Rs.)")
    ));
    writer.line(&format!(
        "Avg Monthly Balance: {} | Monthly Credits: {}",
        optional_number(borrower.avg_monthly_balance.map(|v| v / 100_000.0), "L (Rs.)"),
        optional_number(borrower.monthly_credit_avg.map(|v| v / 100_000.0), "L (Rs.)")
    ));
    writer.line(&format!(
        "GSTIN: {} | Pincode: {}",
        borrower.gstin.as_deref().unwrap_or("N/A"),
        borrower.pincode.as_deref().unwrap_or("N/A")
    ));

    // Document status
    writer.heading("Document Status");
    writer.line(&format!(
        "Program: {} | Completeness: {:.0}%",
        report.checklist.program_type.as_str(),
        report.checklist.completeness_score
    ));
    if !report.checklist.available.is_empty() {
        let names: Vec<String> = report
            .checklist
            .available
            .iter()
            .map(|k| k.label())
            .collect();
        writer.paragraph(&format!("Available: {}", names.join(", ")));
    }
    if !report.checklist.missing.is_empty() {
        let names: Vec<String> = report.checklist.missing.iter().map(|k| k.label()).collect();
        writer.paragraph(&format!("Missing: {}", names.join(", ")));
    }
    if !report.checklist.unreadable.is_empty() {
        writer.paragraph(&format!(
            "Unreadable: {}",
            report.checklist.unreadable.join(", ")
        ));
    }

    // Strengths and risks
    if !report.strengths.is_empty() {
        writer.heading("Strengths");
        for strength in &report.strengths {
            writer.line(&format!("+ {}", strength.replace('₹', "Rs.")));
        }
    }
    if !report.risk_flags.is_empty() {
        writer.heading("Risk Flags");
        for risk in &report.risk_flags {
            writer.line(&format!("! {}", risk.replace('₹', "Rs.")));
        }
    }

    // Lender match table
    writer.heading("Lender Matches");
    let passed: Vec<_> = report
        .lender_matches
        .iter()
        .filter(|m| m.hard_filter_status == HardFilterStatus::Pass)
        .collect();
    if passed.is_empty() {
        writer.line("No lenders passed the hard filters.");
    } else {
        for m in &passed {
            let row = format!(
                "#{} {} - {} | Score {} | {} | Ticket {}",
                m.rank.unwrap_or(0),
                m.lender_name,
                m.product_name,
                m.eligibility_score
                    .map(|s| format!("{:.0}", s))
                    .unwrap_or_else(|| "N/A".to_string()),
                m.approval_probability
                    .map(|p| p.as_str().to_uppercase())
                    .unwrap_or_else(|| "N/A".to_string()),
                match (m.expected_ticket_min, m.expected_ticket_max) {
                    (Some(min), Some(max)) => format!("Rs.{:.1}L-{:.1}L", min, max),
                    _ => "Policy based".to_string(),
                }
            );
            writer.banded_row(&row, probability_band_color(m.approval_probability));
        }
    }

    // Strategy and recommendations
    writer.heading("Submission Strategy");
    writer.paragraph(&report.submission_strategy.replace('₹', "Rs."));

    if !report.missing_data_advisory.is_empty() {
        writer.heading("Missing Data Advisory");
        for advisory in &report.missing_data_advisory {
            writer.line(&format!("- {}", advisory));
        }
    }

    if let Some(range) = &report.expected_loan_range {
        writer.heading("Expected Loan Range");
        writer.line(&range.replace('₹', "Rs."));
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::dtos::{BorrowerFeatureVector, DocumentChecklist};
    use shared::models::enums::ProgramType;

    fn minimal_report() -> CaseReportData {
        CaseReportData {
            case_id: "CASE-20250601-0001".to_string(),
            borrower_profile: BorrowerFeatureVector::default(),
            checklist: DocumentChecklist {
                program_type: ProgramType::Banking,
                available: Vec::new(),
                missing: Vec::new(),
                unreadable: Vec::new(),
                optional_present: Vec::new(),
                completeness_score: 0.0,
            },
            strengths: vec!["Excellent credit score (780)".to_string()],
            risk_flags: Vec::new(),
            lender_matches: Vec::new(),
            submission_strategy: "Approach the primary target first.".to_string(),
            missing_data_advisory: vec!["CIBIL score not available".to_string()],
            expected_loan_range: Some("₹4.5L - ₹30.0L".to_string()),
        }
    }

    #[test]
    fn renders_nonempty_pdf_bytes() {
        let bytes = render_case_report_pdf(
            &minimal_report(),
            DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
        .unwrap();
        assert!(bytes.len() > 500);
        assert_eq!(&bytes[..5], b"%PDF-");
    }
}
