//! Document classification.
//!
//! Three layers, applied in order with early exit on high confidence:
//!
//! 1. Filename patterns: the strongest signal, worth 0.90 on a match.
//! 2. An optional ML scorer (TF-IDF style model loaded out of band); its
//!    prediction is accepted at >= 0.75.
//! 3. Keyword rules over the OCR text: score = matched / total patterns per
//!    kind, gated by a per-kind threshold.
//!
//! When filename and keyword layers agree the confidence combines as
//! `min(0.95, 0.6 * filename + 0.4 * keyword)`; a disagreeing filename wins
//! only when it beats the keyword score by at least 0.20.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use shared::models::enums::DocumentKind;

/// Minimum OCR length considered classifiable at all.
const MIN_TEXT_LEN: usize = 10;
const FILENAME_MATCH_CONFIDENCE: f64 = 0.90;
const ML_ACCEPT_THRESHOLD: f64 = 0.75;

/// Result of classifying one document.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub kind: DocumentKind,
    pub confidence: f64,
    /// Which layer produced the result: "filename", "ml", "keyword",
    /// "hybrid" or "empty_input".
    pub method: &'static str,
    /// Per-kind scores kept for debugging.
    pub scores: HashMap<String, f64>,
}

impl ClassificationResult {
    fn unknown(method: &'static str, scores: HashMap<String, f64>) -> Self {
        Self {
            kind: DocumentKind::Unknown,
            confidence: 0.0,
            method,
            scores,
        }
    }
}

/// Pluggable ML layer. The default build ships without a model, in which
/// case classification falls through to the keyword rules.
pub trait MlScorer: Send + Sync {
    /// Returns (predicted kind, probability, per-class probabilities).
    fn score(&self, ocr_text: &str) -> Option<(DocumentKind, f64, HashMap<String, f64>)>;
}

static FILENAME_PATTERNS: LazyLock<Vec<(DocumentKind, Vec<Regex>)>> = LazyLock::new(|| {
    let table: &[(DocumentKind, &[&str])] = &[
        (
            DocumentKind::BankStatement,
            &[
                r"(?i)(account?_?statement|acct_?stat|bank_?stat|statement.*account)",
                r"(?i)(hdfc|icici|sbi|axis|kotak|pnb|bob|idbi).*statement",
                r"(?i)statement.*\d{4,}",
            ],
        ),
        (
            DocumentKind::GstReturns,
            &[r"(?i)gstr[-_]?[139]b?", r"(?i)gst.*return", r"(?i)gstr"],
        ),
        (
            DocumentKind::GstCertificate,
            &[
                r"(?i)gst.*cert",
                r"(?i)gstin",
                r"(?i)gst.*registration",
                // Catches generic filenames like GST.pdf
                r"(?i)(^|[^a-z])gst([^a-z]|$)",
            ],
        ),
        (
            DocumentKind::UdyamShopLicense,
            &[r"(?i)udyam", r"(?i)msme.*cert", r"(?i)shop.*license"],
        ),
        (
            DocumentKind::PanPersonal,
            &[r"(?i)pan.*card", r"(?i)permanent.*account"],
        ),
        (DocumentKind::Aadhaar, &[r"(?i)aa?dh?aa?r", r"(?i)uid"]),
        (
            DocumentKind::CibilReport,
            &[r"(?i)cibil", r"(?i)credit.*report", r"(?i)transunion"],
        ),
        (
            DocumentKind::Itr,
            &[r"(?i)itr[-_]?\d", r"(?i)income.*tax.*return"],
        ),
    ];

    table
        .iter()
        .map(|(kind, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("invalid filename pattern"))
                .collect();
            (*kind, compiled)
        })
        .collect()
});

static KEYWORD_PATTERNS: LazyLock<Vec<(DocumentKind, Vec<Regex>, f64)>> = LazyLock::new(|| {
    let table: &[(DocumentKind, &[&str], f64)] = &[
        (
            DocumentKind::Aadhaar,
            &[
                r"(?i)UIDAI",
                r"(?i)Unique\s+Identification",
                r"(?i)Aa?dh?aa?r",
                r"(?i)enrolment",
                r"आधार",
                r"(?i)Government\s+of\s+India",
                r"(?i)Date\s+of\s+Birth|DOB",
                r"(?i)Address.*PIN",
                r"\d{4}\s+\d{4}\s+\d{4}",
                r"(?i)male|female",
            ],
            0.40,
        ),
        (
            DocumentKind::PanPersonal,
            &[
                r"(?i)Permanent\s+Account\s+Number",
                r"(?i)Income\s+Tax\s+Department",
                r"(?i)NSDL",
                r"[A-Z]{5}\d{4}[A-Z]",
                r"(?i)Father'?s\s+Name",
                r"(?i)Signature",
                r"(?i)Date\s+of\s+Birth",
            ],
            0.40,
        ),
        (
            DocumentKind::PanBusiness,
            &[
                r"(?i)Permanent\s+Account\s+Number",
                r"(?i)Income\s+Tax\s+Department",
                r"(?i)NSDL",
                r"[A-Z]{5}\d{4}[A-Z]",
                r"(?i)(Pvt\.?\s+Ltd|Private\s+Limited|LLP|Partnership|Proprietorship)",
                r"(?i)(Company|Firm|Business|Enterprise)",
            ],
            0.40,
        ),
        (
            DocumentKind::GstCertificate,
            &[
                r"(?i)GSTIN",
                r"(?i)Goods\s+and\s+Services\s+Tax",
                r"(?i)Certificate\s+of\s+Registration",
                r"(?i)GST\s+Registration",
                r"(?i)Tax\s+Payer",
                r"\d{2}[A-Z]{5}\d{4}[A-Z]\dZ[A-Z\d]",
                r"(?i)Date\s+of\s+(Registration|Liability)",
                r"(?i)State\s+Code",
            ],
            0.40,
        ),
        (
            DocumentKind::GstReturns,
            &[
                r"(?i)GSTR[-\s]?[139]B?",
                r"(?i)taxable\s+value",
                r"(?i)CGST",
                r"(?i)SGST",
                r"(?i)IGST",
                r"(?i)Return\s+Period",
                r"(?i)Filing\s+Status",
                r"(?i)Tax\s+(Amount|Liability)",
                r"(?i)Input\s+Tax\s+Credit",
                r"(?i)Form\s+GSTR",
            ],
            0.35,
        ),
        (
            DocumentKind::BankStatement,
            &[
                r"(?i)Opening\s+Balance",
                r"(?i)Closing\s+Balance",
                r"(?i)Statement\s+of\s+Account",
                r"(?i)Transaction",
                r"(?i)\b(debit|credit|dr\.?|cr\.?)\b",
                r"(?i)(HDFC|ICICI|SBI|State\s+Bank|Axis|Kotak|PNB|Bank\s+of|IDBI|YES\s+Bank)",
                r"(?i)Account\s+(Number|No\.?)",
                r"(?i)IFSC",
                r"(?i)Branch",
                r"(?i)\b(withdrawal|deposit)\b",
                r"(?i)Balance",
            ],
            0.35,
        ),
        (
            DocumentKind::Itr,
            &[
                r"(?i)Assessment\s+Year",
                r"(?i)Total\s+Income",
                r"(?i)ITR[-\s]?\d",
                r"(?i)Income\s+Tax\s+Return",
                r"(?i)Verification",
                r"(?i)Acknowledgement\s+Number",
                r"(?i)Tax\s+Payable",
                r"(?i)Gross\s+Total\s+Income",
                r"(?i)Deductions",
                r"(?i)PAN",
                r"(?i)Financial\s+Year",
            ],
            0.40,
        ),
        (
            DocumentKind::FinancialStatements,
            &[
                r"(?i)Balance\s+Sheet",
                r"(?i)Profit\s+(and|&)\s+Loss",
                r"(?i)Schedule",
                r"(?i)Audit\s+Report",
                r"(?i)Auditor",
                r"(?i)\b(Assets|Liabilities)\b",
                r"(?i)Equity",
                r"(?i)\b(Revenue|Expenditure)\b",
                r"(?i)Financial\s+(Year|Statement)",
                r"(?i)Chartered\s+Accountant",
            ],
            0.40,
        ),
        (
            DocumentKind::CibilReport,
            &[
                r"(?i)TransUnion",
                r"(?i)Credit\s+Score",
                r"(?i)Credit\s+Information",
                r"(?i)CIBIL",
                r"(?i)Account\s+Summary",
                r"(?i)Enquir(y|ies)",
                r"(?i)Credit\s+History",
                r"(?i)Score\s+Factors",
                r"(?i)Bureau",
            ],
            0.40,
        ),
        (
            DocumentKind::UdyamShopLicense,
            &[
                r"(?i)Udyam\s+Registration",
                r"(?i)MSME",
                r"(?i)Shop\s+(and|&)\s+Establishment",
                r"(?i)License",
                r"(?i)Micro,?\s+Small\s+(and|&)\s+Medium\s+Enterprise",
                r"(?i)Registration\s+(Number|Certificate)",
                r"(?i)Udyam",
                r"(?i)Ministry.*MSME",
            ],
            0.40,
        ),
        (
            DocumentKind::PropertyDocuments,
            &[
                r"(?i)Sale\s+Deed",
                r"(?i)Registry",
                r"(?i)Property\s+Tax",
                r"(?i)Conveyance",
                r"(?i)Sub-Registrar",
                r"(?i)Plot\s+No",
                r"(?i)Survey\s+Number",
                r"(?i)Property\s+(No|Number)",
                r"(?i)Stamp\s+Duty",
                r"(?i)Registration\s+Fee",
            ],
            0.40,
        ),
    ];

    table
        .iter()
        .map(|(kind, patterns, threshold)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("invalid keyword pattern"))
                .collect();
            (*kind, compiled, *threshold)
        })
        .collect()
});

static BUSINESS_INDICATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Pvt\.?\s+Ltd|Private\s+Limited|LLP|Partnership|Proprietorship|Company|Firm)")
        .expect("invalid business indicator pattern")
});

/// Stateless document classifier. Construct per request or share freely.
pub struct DocumentClassifier {
    ml: Option<Box<dyn MlScorer>>,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self { ml: None }
    }

    pub fn with_ml_scorer(scorer: Box<dyn MlScorer>) -> Self {
        Self { ml: Some(scorer) }
    }

    /// Classify a document from its OCR text and (optionally) filename.
    pub fn classify(&self, ocr_text: &str, filename: Option<&str>) -> ClassificationResult {
        // Filename alone is decisive when it produces a confident match.
        let filename_result = filename.and_then(|name| self.classify_from_filename(name));
        if let Some(result) = &filename_result {
            if result.confidence >= FILENAME_MATCH_CONFIDENCE {
                return result.clone();
            }
        }

        if ocr_text.trim().len() < MIN_TEXT_LEN {
            if let Some(result) = filename_result {
                if result.confidence >= 0.60 {
                    return result;
                }
            }
            return ClassificationResult::unknown("empty_input", HashMap::new());
        }

        let ml_result = self.ml.as_ref().and_then(|scorer| {
            scorer
                .score(ocr_text)
                .map(|(kind, confidence, scores)| ClassificationResult {
                    kind,
                    confidence,
                    method: "ml",
                    scores,
                })
        });
        if let Some(result) = &ml_result {
            if result.confidence >= ML_ACCEPT_THRESHOLD {
                return result.clone();
            }
        }

        let keyword_result = self.classify_with_keywords(ocr_text);

        if let Some(filename_result) = filename_result {
            if filename_result.kind == keyword_result.kind {
                let combined = (filename_result.confidence * 0.6
                    + keyword_result.confidence * 0.4)
                    .min(0.95);
                return ClassificationResult {
                    kind: keyword_result.kind,
                    confidence: combined,
                    method: "hybrid",
                    scores: keyword_result.scores,
                };
            }
            if filename_result.confidence > keyword_result.confidence + 0.20 {
                return filename_result;
            }
        }

        if let Some(ml_result) = ml_result {
            if ml_result.confidence > keyword_result.confidence {
                return ml_result;
            }
        }

        keyword_result
    }

    fn classify_from_filename(&self, filename: &str) -> Option<ClassificationResult> {
        if filename.is_empty() {
            return None;
        }

        let mut scores = HashMap::new();
        let mut best: Option<(DocumentKind, f64)> = None;

        for (kind, patterns) in FILENAME_PATTERNS.iter() {
            let matched = patterns.iter().any(|pattern| pattern.is_match(filename));
            let score = if matched { FILENAME_MATCH_CONFIDENCE } else { 0.0 };
            scores.insert(kind.as_str().to_string(), score);

            if score > best.map(|(_, s)| s).unwrap_or(0.0) {
                best = Some((*kind, score));
            }
        }

        match best {
            Some((kind, score)) if score >= 0.60 => Some(ClassificationResult {
                kind,
                confidence: score,
                method: "filename",
                scores,
            }),
            _ => None,
        }
    }

    fn classify_with_keywords(&self, ocr_text: &str) -> ClassificationResult {
        let mut scores: HashMap<String, f64> = HashMap::new();

        for (kind, patterns, _) in KEYWORD_PATTERNS.iter() {
            let matched = patterns
                .iter()
                .filter(|pattern| pattern.is_match(ocr_text))
                .count();
            let score = matched as f64 / patterns.len() as f64;
            scores.insert(kind.as_str().to_string(), score);
        }

        // PAN disambiguation: corporate suffixes push the score to the
        // business variant and zero the other, and vice versa.
        let personal_key = DocumentKind::PanPersonal.as_str();
        let business_key = DocumentKind::PanBusiness.as_str();
        let personal = scores.get(personal_key).copied().unwrap_or(0.0);
        let business = scores.get(business_key).copied().unwrap_or(0.0);
        if personal > 0.0 || business > 0.0 {
            if BUSINESS_INDICATORS.is_match(ocr_text) {
                scores.insert(business_key.to_string(), business.max(personal + 0.1));
                scores.insert(personal_key.to_string(), 0.0);
            } else {
                scores.insert(personal_key.to_string(), personal.max(business + 0.1));
                scores.insert(business_key.to_string(), 0.0);
            }
        }

        let mut best_kind: Option<DocumentKind> = None;
        let mut best_score = 0.0;
        for (kind, _, _) in KEYWORD_PATTERNS.iter() {
            let score = scores.get(kind.as_str()).copied().unwrap_or(0.0);
            if score > best_score {
                best_score = score;
                best_kind = Some(*kind);
            }
        }

        if let Some(kind) = best_kind {
            let threshold = KEYWORD_PATTERNS
                .iter()
                .find(|(k, _, _)| *k == kind)
                .map(|(_, _, t)| *t)
                .unwrap_or(1.0);
            if best_score >= threshold {
                return ClassificationResult {
                    kind,
                    confidence: best_score,
                    method: "keyword",
                    scores,
                };
            }
        }

        ClassificationResult {
            kind: DocumentKind::Unknown,
            confidence: best_score,
            method: "keyword",
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DocumentClassifier {
        DocumentClassifier::new()
    }

    #[test]
    fn gstr_filename_classifies_without_text() {
        let result = classifier().classify("", Some("GSTR-3B_march.pdf"));
        assert_eq!(result.kind, DocumentKind::GstReturns);
        assert_eq!(result.confidence, 0.90);
        assert_eq!(result.method, "filename");
    }

    #[test]
    fn bank_statement_filename_is_decisive() {
        let result = classifier().classify("", Some("HDFC_statement_2024.pdf"));
        assert_eq!(result.kind, DocumentKind::BankStatement);
        assert_eq!(result.method, "filename");
    }

    #[test]
    fn empty_text_without_filename_is_unknown_with_zero_confidence() {
        let result = classifier().classify("", None);
        assert_eq!(result.kind, DocumentKind::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, "empty_input");
    }

    #[test]
    fn short_text_is_treated_as_empty() {
        let result = classifier().classify("abc", None);
        assert_eq!(result.kind, DocumentKind::Unknown);
        assert_eq!(result.method, "empty_input");
    }

    #[test]
    fn bank_statement_text_classifies_by_keywords() {
        let text = "HDFC Bank Statement of Account\n\
                    Account Number: 50100123456\n\
                    IFSC: HDFC0000123 Branch: Andheri\n\
                    Opening Balance 1,00,000.00 Closing Balance 1,25,000.00\n\
                    Transaction details: withdrawal deposit debit credit";
        let result = classifier().classify(text, None);
        assert_eq!(result.kind, DocumentKind::BankStatement);
        assert_eq!(result.method, "keyword");
        assert!(result.confidence >= 0.35);
    }

    #[test]
    fn agreeing_filename_and_keywords_combine_into_hybrid() {
        let text = "TransUnion CIBIL Credit Score 760\n\
                    Credit Information Report\n\
                    Account Summary Enquiries Credit History Bureau";
        let result = classifier().classify(text, Some("cibil-report-jan.txt"));
        // "cibil" in the filename scores below 0.90 only for non-filename
        // kinds; here filename matches cibil_report at 0.90 and short-circuits.
        assert_eq!(result.kind, DocumentKind::CibilReport);
        assert!(result.confidence >= 0.90);
    }

    #[test]
    fn corporate_suffix_flips_pan_to_business() {
        let text = "Income Tax Department\nPermanent Account Number AAACX1234F\n\
                    Acme Widgets Pvt. Ltd Company";
        let result = classifier().classify(text, None);
        assert_eq!(result.kind, DocumentKind::PanBusiness);
    }

    #[test]
    fn personal_pan_stays_personal_without_corporate_suffix() {
        let text = "Income Tax Department\nPermanent Account Number ABCPE1234F\n\
                    Father's Name RAMESH\nDate of Birth 01/01/1980\nSignature";
        let result = classifier().classify(text, None);
        assert_eq!(result.kind, DocumentKind::PanPersonal);
    }

    #[test]
    fn confident_filename_beats_conflicting_text() {
        // A GSTR text paired with a filename that pattern-matches the GST
        // certificate family: the filename layer answers first.
        let text = "Form GSTR-3B Return Period 03/2024 taxable value 1,00,000\n\
                    CGST 9000 SGST 9000 IGST 0 Filing Status Filed\n\
                    Input Tax Credit Tax Liability";
        let result = classifier().classify(text, Some("gst_registration.pdf"));
        assert_eq!(result.kind, DocumentKind::GstCertificate);
        assert_eq!(result.method, "filename");
    }

    #[test]
    fn keyword_path_runs_when_filename_matches_nothing() {
        let text = "Form GSTR-3B Return Period 03/2024 taxable value 1,00,000\n\
                    CGST 9000 SGST 9000 IGST 0 Filing Status Filed\n\
                    Input Tax Credit Tax Liability";
        let result = classifier().classify(text, Some("scan0001.pdf"));
        assert_eq!(result.kind, DocumentKind::GstReturns);
        assert_eq!(result.method, "keyword");
    }
}
