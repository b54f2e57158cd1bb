//! Structured field extraction from OCR text.
//!
//! Each document kind has an anchored-regex extractor emitting
//! `{name, value, confidence}` triples. Every emitted field then runs
//! through a type-and-range validation; a failed validation halves the
//! confidence but keeps the row, since downstream merging prefers weak
//! evidence over none.

use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use shared::dtos::ExtractedFieldItem;
use shared::models::enums::DocumentKind;

/// Indian state codes embedded in the first two GSTIN digits.
pub static GSTIN_STATE_CODES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("01", "Jammu and Kashmir"),
            ("02", "Himachal Pradesh"),
            ("03", "Punjab"),
            ("04", "Chandigarh"),
            ("05", "Uttarakhand"),
            ("06", "Haryana"),
            ("07", "Delhi"),
            ("08", "Rajasthan"),
            ("09", "Uttar Pradesh"),
            ("10", "Bihar"),
            ("11", "Sikkim"),
            ("12", "Arunachal Pradesh"),
            ("13", "Nagaland"),
            ("14", "Manipur"),
            ("15", "Mizoram"),
            ("16", "Tripura"),
            ("17", "Meghalaya"),
            ("18", "Assam"),
            ("19", "West Bengal"),
            ("20", "Jharkhand"),
            ("21", "Odisha"),
            ("22", "Chhattisgarh"),
            ("23", "Madhya Pradesh"),
            ("24", "Gujarat"),
            ("25", "Daman and Diu"),
            ("26", "Dadra and Nagar Haveli"),
            ("27", "Maharashtra"),
            ("28", "Andhra Pradesh"),
            ("29", "Karnataka"),
            ("30", "Goa"),
            ("31", "Lakshadweep"),
            ("32", "Kerala"),
            ("33", "Tamil Nadu"),
            ("34", "Puducherry"),
            ("35", "Andaman and Nicobar Islands"),
            ("36", "Telangana"),
            ("37", "Andhra Pradesh"),
            ("38", "Ladakh"),
        ])
    });

static PAN_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}\d{4}[A-Z]$").expect("invalid PAN format pattern"));
static PAN_SEARCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{5}\d{4}[A-Z])\b").expect("invalid PAN search pattern"));
static GSTIN_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}[A-Z]{5}\d{4}[A-Z]\d[A-Z][0-9A-Z]$").expect("invalid GSTIN format pattern")
});
static GSTIN_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}[A-Z]{5}\d{4}[A-Z]\d[A-Z][0-9A-Z])\b")
        .expect("invalid GSTIN search pattern")
});
static AADHAAR_SEARCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}\s?\d{4}\s?\d{4})\b").expect("invalid aadhaar pattern"));
static NAME_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Name|NAME|name)\s*[:\-]?\s*([A-Z][A-Za-z\s]{2,50})").expect("invalid pattern")
});
static FALLBACK_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+ [A-Z][a-z]+(?:\s[A-Z][a-z]+)?)\b").expect("invalid pattern")
});
static DOB_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Date of Birth|DOB|Birth|Year of Birth)\s*[:\-]?\s*(\d{2}[/-]\d{2}[/-]\d{4})")
        .expect("invalid pattern")
});
static ADDRESS_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Address|ADDRESS|address)\s*[:\-]?\s*([A-Za-z0-9\s,\.\-/]+(?:\n[A-Za-z0-9\s,\.\-/]+){0,3})")
        .expect("invalid pattern")
});
static BUSINESS_NAME_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Legal Name|Trade Name|Business Name)\s*[:\-]?\s*([A-Z][A-Za-z0-9\s&\.\-]{2,100})")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Taxpayer Name|Name of Business)\s*[:\-]?\s*([A-Z][A-Za-z0-9\s&\.\-]{2,100})")
            .expect("invalid pattern"),
    ]
});
static REG_DATE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Date of Registration|Registration Date)\s*[:\-]?\s*(\d{2}[/-]\d{2}[/-]\d{4})")
        .expect("invalid pattern")
});
static TAXABLE_VALUE_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Total Taxable Value|Taxable Value)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Total Invoice Value|Invoice Value)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});
static CGST_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:CGST|Central GST)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
        .expect("invalid pattern")
});
static SGST_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:SGST|State GST)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
        .expect("invalid pattern")
});
static FILING_PERIOD_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Period|Tax Period|Return Period)\s*[:\-]?\s*(\d{2}[/-]\d{4})")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Month|Filing Month)\s*[:\-]?\s*([A-Za-z]+\s*\d{4})")
            .expect("invalid pattern"),
    ]
});
static CIBIL_SCORE_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Score|CIBIL Score|Credit Score)\s*[:\-]?\s*(\d{3})")
            .expect("invalid pattern"),
        Regex::new(r"\b([3-9]\d{2})\b").expect("invalid pattern"),
    ]
});
static ACTIVE_LOANS_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Active Accounts|Active Loans)\s*[:\-]?\s*(\d+)").expect("invalid pattern")
});
static OVERDUE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Overdue|Delinquent|DPD)\s*[:\-]?\s*(\d+)").expect("invalid pattern")
});
static ENQUIRY_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Enquiry|Enquiries|Credit Enquiries|Recent Enquiries)\s*[:\-]?\s*(\d+)")
        .expect("invalid pattern")
});
static ITR_INCOME_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Total Income|Gross Total Income)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:GTI)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});
static ASSESSMENT_YEAR_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Assessment Year|AY|A\.Y\.)\s*[:\-]?\s*(20\d{2}-\d{2})")
        .expect("invalid pattern")
});
static TAX_PAID_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Tax Paid|Total Tax Paid|Tax Payment)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Self Assessment Tax|Advance Tax)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});
static BUSINESS_INCOME_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Income from Business|Business Income|Profits and Gains)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
        .expect("invalid pattern")
});
static REVENUE_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Revenue|Total Revenue|Sales|Net Sales|Turnover)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Total Income|Gross Revenue)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});
static PROFIT_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Net Profit|Profit After Tax|PAT|Net Income)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Profit for the year|Net Earnings)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});
static NET_WORTH_ANCHORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:Net Worth|Shareholders Fund|Shareholders Equity|Total Equity)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
        Regex::new(r"(?i)(?:Owner's Equity|Capital and Reserves)\s*[:\-]?\s*(?:Rs\.?|INR)?\s*([0-9,]+\.?\d*)")
            .expect("invalid pattern"),
    ]
});

/// Validate a PAN: `[A-Z]{5}\d{4}[A-Z]` with the 4th character naming a
/// registered holder category.
pub fn validate_pan(pan: &str) -> bool {
    if pan.len() != 10 || !PAN_FORMAT.is_match(pan) {
        return false;
    }
    matches!(
        pan.as_bytes()[3],
        b'P' | b'C' | b'F' | b'H' | b'A' | b'T' | b'B' | b'L' | b'J' | b'G'
    )
}

/// Validate a GSTIN: format check, then state code, then the PAN embedded
/// at characters 3-12.
pub fn validate_gstin(gstin: &str) -> bool {
    if gstin.len() != 15 || !GSTIN_FORMAT.is_match(gstin) {
        return false;
    }
    if !GSTIN_STATE_CODES.contains_key(&gstin[..2]) {
        return false;
    }
    validate_pan(&gstin[2..12])
}

/// Stateless per-kind field extractor.
pub struct FieldExtractor;

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract fields from OCR text based on document kind. Unknown and
    /// unextractable kinds produce an empty list.
    pub fn extract_fields(&self, ocr_text: &str, kind: DocumentKind) -> Vec<ExtractedFieldItem> {
        if ocr_text.trim().is_empty() {
            return Vec::new();
        }

        let fields = match kind {
            DocumentKind::PanPersonal | DocumentKind::PanBusiness => self.extract_pan_card(ocr_text),
            DocumentKind::Aadhaar => self.extract_aadhaar(ocr_text),
            DocumentKind::GstCertificate => self.extract_gst_certificate(ocr_text),
            DocumentKind::GstReturns => self.extract_gst_returns(ocr_text),
            DocumentKind::CibilReport => self.extract_cibil_report(ocr_text),
            DocumentKind::Itr => self.extract_itr(ocr_text),
            DocumentKind::FinancialStatements => self.extract_financial_statements(ocr_text),
            _ => Vec::new(),
        };

        fields
            .into_iter()
            .map(|mut field| {
                if !validate_field(&field) {
                    field.confidence *= 0.5;
                }
                field
            })
            .collect()
    }

    fn extract_pan_card(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        if let Some(cap) = PAN_SEARCH.captures(text) {
            let pan = cap[1].to_string();
            let confidence = if validate_pan(&pan) { 0.9 } else { 0.6 };
            fields.push(ExtractedFieldItem::new("pan_number", pan, confidence));
        }

        if let Some(cap) = NAME_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "full_name",
                cap[1].trim().to_string(),
                0.75,
            ));
        }

        if let Some(cap) = DOB_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "dob",
                cap[1].replace('-', "/"),
                0.8,
            ));
        }

        fields
    }

    fn extract_aadhaar(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        if let Some(cap) = AADHAAR_SEARCH.captures(text) {
            let aadhaar = cap[1].replace(' ', "");
            if aadhaar.len() == 12 {
                fields.push(ExtractedFieldItem::new("aadhaar_number", aadhaar, 0.85));
            }
        }

        if let Some(cap) = NAME_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "full_name",
                cap[1].trim().to_string(),
                0.75,
            ));
        } else if let Some(cap) = FALLBACK_NAME.captures(text) {
            // Weaker signal: first prominent capitalized name in the text.
            fields.push(ExtractedFieldItem::new(
                "full_name",
                cap[1].to_string(),
                0.55,
            ));
        }

        if let Some(cap) = DOB_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "dob",
                cap[1].replace('-', "/"),
                0.8,
            ));
        }

        if let Some(cap) = ADDRESS_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "address",
                cap[1].trim().to_string(),
                0.65,
            ));
        }

        fields
    }

    fn extract_gst_certificate(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        if let Some(cap) = GSTIN_SEARCH.captures(text) {
            let gstin = cap[1].to_string();
            let confidence = if validate_gstin(&gstin) { 0.9 } else { 0.6 };

            // State derives from the first two digits regardless of the
            // overall structural check.
            if let Some(state) = GSTIN_STATE_CODES.get(&gstin[..2]) {
                fields.push(ExtractedFieldItem::new("state", state.to_string(), 0.95));
            }
            fields.push(ExtractedFieldItem::new("gstin", gstin, confidence));
        }

        for pattern in BUSINESS_NAME_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "business_name",
                    cap[1].trim().to_string(),
                    0.8,
                ));
                break;
            }
        }

        if let Some(cap) = REG_DATE_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "gst_registration_date",
                cap[1].replace('-', "/"),
                0.8,
            ));
        }

        fields
    }

    fn extract_gst_returns(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        for pattern in TAXABLE_VALUE_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "gst_taxable_value",
                    cap[1].replace(',', ""),
                    0.75,
                ));
                break;
            }
        }

        if let Some(cap) = CGST_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "gst_cgst_amount",
                cap[1].replace(',', ""),
                0.75,
            ));
        }

        if let Some(cap) = SGST_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "gst_sgst_amount",
                cap[1].replace(',', ""),
                0.75,
            ));
        }

        for pattern in FILING_PERIOD_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "gst_filing_period",
                    cap[1].to_string(),
                    0.7,
                ));
                break;
            }
        }

        fields
    }

    fn extract_cibil_report(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        for pattern in CIBIL_SCORE_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                if let Ok(score) = cap[1].parse::<i32>() {
                    if (300..=900).contains(&score) {
                        fields.push(ExtractedFieldItem::new(
                            "cibil_score",
                            score.to_string(),
                            0.85,
                        ));
                        break;
                    }
                }
            }
        }

        if let Some(cap) = ACTIVE_LOANS_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "active_loan_count",
                cap[1].to_string(),
                0.75,
            ));
        }

        if let Some(cap) = OVERDUE_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "overdue_count",
                cap[1].to_string(),
                0.75,
            ));
        }

        if let Some(cap) = ENQUIRY_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "enquiry_count_6m",
                cap[1].to_string(),
                0.7,
            ));
        }

        fields
    }

    fn extract_itr(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        for pattern in ITR_INCOME_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "itr_total_income",
                    cap[1].replace(',', ""),
                    0.8,
                ));
                break;
            }
        }

        if let Some(cap) = ASSESSMENT_YEAR_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "itr_assessment_year",
                cap[1].to_string(),
                0.85,
            ));
        }

        for pattern in TAX_PAID_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "itr_tax_paid",
                    cap[1].replace(',', ""),
                    0.75,
                ));
                break;
            }
        }

        if let Some(cap) = BUSINESS_INCOME_ANCHOR.captures(text) {
            fields.push(ExtractedFieldItem::new(
                "itr_business_income",
                cap[1].replace(',', ""),
                0.75,
            ));
        }

        fields
    }

    fn extract_financial_statements(&self, text: &str) -> Vec<ExtractedFieldItem> {
        let mut fields = Vec::new();

        for pattern in REVENUE_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "annual_turnover",
                    cap[1].replace(',', ""),
                    0.8,
                ));
                break;
            }
        }

        for pattern in PROFIT_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "net_profit",
                    cap[1].replace(',', ""),
                    0.75,
                ));
                break;
            }
        }

        for pattern in NET_WORTH_ANCHORS.iter() {
            if let Some(cap) = pattern.captures(text) {
                fields.push(ExtractedFieldItem::new(
                    "net_worth",
                    cap[1].replace(',', ""),
                    0.75,
                ));
                break;
            }
        }

        fields
    }
}

/// Type-and-range validation per field name.
fn validate_field(field: &ExtractedFieldItem) -> bool {
    if field.field_value.is_empty() {
        return false;
    }

    match field.field_name.as_str() {
        "pan_number" => validate_pan(&field.field_value),
        "gstin" => validate_gstin(&field.field_value),
        "aadhaar_number" => {
            let digits = field.field_value.replace(' ', "");
            digits.len() == 12 && digits.chars().all(|c| c.is_ascii_digit())
        }
        "cibil_score" => field
            .field_value
            .parse::<i32>()
            .map(|score| (300..=900).contains(&score))
            .unwrap_or(false),
        "dob" | "gst_registration_date" => {
            let normalized = field.field_value.replace('-', "/");
            NaiveDate::parse_from_str(&normalized, "%d/%m/%Y").is_ok()
        }
        "annual_turnover" | "itr_total_income" | "gst_taxable_value" | "active_loan_count"
        | "overdue_count" | "enquiry_count_6m" => field
            .field_value
            .replace(',', "")
            .parse::<f64>()
            .map(|value| value >= 0.0)
            .unwrap_or(false),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_fourth_character_x_fails_validation() {
        assert!(!validate_pan("ABCXE1234F"));
        assert!(validate_pan("ABCPE1234F"));
        assert!(validate_pan("AAACX1234F")); // 4th char C = company
    }

    #[test]
    fn gstin_state_code_99_fails_validation() {
        assert!(!validate_gstin("99AABCU9603R1ZM"));
        assert!(validate_gstin("27AABCU9603R1ZM"));
    }

    #[test]
    fn gstin_with_invalid_embedded_pan_fails() {
        // 4th char of the embedded PAN is X, not a valid holder category.
        assert!(!validate_gstin("27AABXU9603R1ZM"));
    }

    #[test]
    fn pan_card_extraction_emits_number_name_dob() {
        let text = "Income Tax Department\nPermanent Account Number\nABCPE1234F\n\
                    Name: RAVI KUMAR\nDate of Birth: 12/08/1985";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::PanPersonal);

        let pan = fields.iter().find(|f| f.field_name == "pan_number").unwrap();
        assert_eq!(pan.field_value, "ABCPE1234F");
        assert_eq!(pan.confidence, 0.9);

        let name = fields.iter().find(|f| f.field_name == "full_name").unwrap();
        assert!(name.field_value.starts_with("RAVI KUMAR"));

        let dob = fields.iter().find(|f| f.field_name == "dob").unwrap();
        assert_eq!(dob.field_value, "12/08/1985");
    }

    #[test]
    fn invalid_pan_still_emitted_at_reduced_confidence() {
        let text = "Permanent Account Number ABCXE1234F";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::PanPersonal);
        let pan = fields.iter().find(|f| f.field_name == "pan_number").unwrap();
        // 0.6 from the pattern, halved by failed validation.
        assert!((pan.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn gst_certificate_extraction_derives_state() {
        let text = "Certificate of Registration\nGSTIN: 27AABCU9603R1ZM\n\
                    Legal Name: ACME TRADING CO\nDate of Registration: 01/04/2018";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::GstCertificate);

        let gstin = fields.iter().find(|f| f.field_name == "gstin").unwrap();
        assert_eq!(gstin.confidence, 0.9);

        let state = fields.iter().find(|f| f.field_name == "state").unwrap();
        assert_eq!(state.field_value, "Maharashtra");

        assert!(fields.iter().any(|f| f.field_name == "business_name"));
        assert!(fields.iter().any(|f| f.field_name == "gst_registration_date"));
    }

    #[test]
    fn cibil_score_outside_range_is_not_emitted() {
        let text = "CIBIL Score: 950";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::CibilReport);
        assert!(fields.iter().all(|f| f.field_name != "cibil_score"));
    }

    #[test]
    fn cibil_extraction_reads_counts() {
        let text = "TransUnion CIBIL\nScore: 742\nActive Accounts: 3\n\
                    Overdue: 1\nEnquiries: 4";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::CibilReport);

        let score = fields.iter().find(|f| f.field_name == "cibil_score").unwrap();
        assert_eq!(score.field_value, "742");
        assert!(fields.iter().any(|f| f.field_name == "active_loan_count"));
        assert!(fields.iter().any(|f| f.field_name == "overdue_count"));
        assert!(fields.iter().any(|f| f.field_name == "enquiry_count_6m"));
    }

    #[test]
    fn itr_extraction_reads_assessment_year_format() {
        let text = "Income Tax Return ITR-3\nAssessment Year: 2023-24\n\
                    Gross Total Income Rs. 18,50,000\nTax Paid: 2,10,000";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::Itr);

        let ay = fields
            .iter()
            .find(|f| f.field_name == "itr_assessment_year")
            .unwrap();
        assert_eq!(ay.field_value, "2023-24");

        let income = fields
            .iter()
            .find(|f| f.field_name == "itr_total_income")
            .unwrap();
        assert_eq!(income.field_value, "1850000");
    }

    #[test]
    fn aadhaar_number_tolerates_spaces() {
        let text = "Government of India\nName: Suresh Patel\n1234 5678 9012\nDOB: 02/02/1990";
        let fields = FieldExtractor::new().extract_fields(text, DocumentKind::Aadhaar);
        let number = fields
            .iter()
            .find(|f| f.field_name == "aadhaar_number")
            .unwrap();
        assert_eq!(number.field_value, "123456789012");
    }

    #[test]
    fn empty_text_yields_no_fields() {
        let fields = FieldExtractor::new().extract_fields("   ", DocumentKind::PanPersonal);
        assert!(fields.is_empty());
    }

    #[test]
    fn financial_statement_extraction_reads_turnover() {
        let text = "Profit and Loss Account\nTurnover: 4,20,00,000\n\
                    Net Profit 32,00,000\nNet Worth: 1,10,00,000";
        let fields =
            FieldExtractor::new().extract_fields(text, DocumentKind::FinancialStatements);
        let turnover = fields
            .iter()
            .find(|f| f.field_name == "annual_turnover")
            .unwrap();
        assert_eq!(turnover.field_value, "42000000");
        assert!(fields.iter().any(|f| f.field_name == "net_profit"));
        assert!(fields.iter().any(|f| f.field_name == "net_worth"));
    }
}
