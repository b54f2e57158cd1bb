use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a loan application case.
///
/// Stored as snake_case strings in the `cases.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Created,
    Processing,
    FeaturesExtracted,
    EligibilityScored,
    ReportGenerated,
    Failed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Created => "created",
            CaseStatus::Processing => "processing",
            CaseStatus::FeaturesExtracted => "features_extracted",
            CaseStatus::EligibilityScored => "eligibility_scored",
            CaseStatus::ReportGenerated => "report_generated",
            CaseStatus::Failed => "failed",
        }
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(CaseStatus::Created),
            "processing" => Ok(CaseStatus::Processing),
            "features_extracted" => Ok(CaseStatus::FeaturesExtracted),
            "eligibility_scored" => Ok(CaseStatus::EligibilityScored),
            "report_generated" => Ok(CaseStatus::ReportGenerated),
            "failed" => Ok(CaseStatus::Failed),
            other => Err(format!("unknown case status: {}", other)),
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan program determining the required-document set for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    Banking,
    Income,
    Hybrid,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::Banking => "banking",
            ProgramType::Income => "income",
            ProgramType::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ProgramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "banking" => Ok(ProgramType::Banking),
            "income" => Ok(ProgramType::Income),
            "hybrid" => Ok(ProgramType::Hybrid),
            other => Err(format!("unknown program type: {}", other)),
        }
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified kind of an uploaded document.
///
/// The set is closed: anything the classifier cannot place lands on
/// `Unknown` and surfaces in the checklist as unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Aadhaar,
    PanPersonal,
    PanBusiness,
    GstCertificate,
    GstReturns,
    BankStatement,
    Itr,
    FinancialStatements,
    CibilReport,
    UdyamShopLicense,
    PropertyDocuments,
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Aadhaar => "aadhaar",
            DocumentKind::PanPersonal => "pan_personal",
            DocumentKind::PanBusiness => "pan_business",
            DocumentKind::GstCertificate => "gst_certificate",
            DocumentKind::GstReturns => "gst_returns",
            DocumentKind::BankStatement => "bank_statement",
            DocumentKind::Itr => "itr",
            DocumentKind::FinancialStatements => "financial_statements",
            DocumentKind::CibilReport => "cibil_report",
            DocumentKind::UdyamShopLicense => "udyam_shop_license",
            DocumentKind::PropertyDocuments => "property_documents",
            DocumentKind::Unknown => "unknown",
        }
    }

    /// Human-readable label used in checklists and reports,
    /// e.g. `bank_statement` -> "Bank Statement".
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aadhaar" => Ok(DocumentKind::Aadhaar),
            "pan_personal" => Ok(DocumentKind::PanPersonal),
            "pan_business" => Ok(DocumentKind::PanBusiness),
            "gst_certificate" => Ok(DocumentKind::GstCertificate),
            "gst_returns" => Ok(DocumentKind::GstReturns),
            "bank_statement" => Ok(DocumentKind::BankStatement),
            "itr" => Ok(DocumentKind::Itr),
            "financial_statements" => Ok(DocumentKind::FinancialStatements),
            "cibil_report" => Ok(DocumentKind::CibilReport),
            "udyam_shop_license" => Ok(DocumentKind::UdyamShopLicense),
            "property_documents" => Ok(DocumentKind::PropertyDocuments),
            "unknown" => Ok(DocumentKind::Unknown),
            other => Err(format!("unknown document kind: {}", other)),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single document inside a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    OcrComplete,
    Classified,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::OcrComplete => "ocr_complete",
            DocumentStatus::Classified => "classified",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "ocr_complete" => Ok(DocumentStatus::OcrComplete),
            "classified" => Ok(DocumentStatus::Classified),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// State of a queued per-document processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// Outcome of the hard-filter layer for one (case, product) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum HardFilterStatus {
    Pass,
    Fail,
}

impl HardFilterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardFilterStatus::Pass => "pass",
            HardFilterStatus::Fail => "fail",
        }
    }
}

impl FromStr for HardFilterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(HardFilterStatus::Pass),
            "fail" => Ok(HardFilterStatus::Fail),
            other => Err(format!("unknown hard filter status: {}", other)),
        }
    }
}

/// Probability band derived from the weighted eligibility score.
///
/// `High` when score >= 75, `Medium` when 50 <= score < 75, `Low` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ApprovalProbability {
    High,
    Medium,
    Low,
}

impl ApprovalProbability {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalProbability::High => "high",
            ApprovalProbability::Medium => "medium",
            ApprovalProbability::Low => "low",
        }
    }
}

impl FromStr for ApprovalProbability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(ApprovalProbability::High),
            "medium" => Ok(ApprovalProbability::Medium),
            "low" => Ok(ApprovalProbability::Low),
            other => Err(format!("unknown approval probability: {}", other)),
        }
    }
}

/// Canonical borrower entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Proprietorship,
    Partnership,
    Llp,
    PvtLtd,
    PublicLtd,
    Trust,
    Society,
    Huf,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Proprietorship => "proprietorship",
            EntityType::Partnership => "partnership",
            EntityType::Llp => "llp",
            EntityType::PvtLtd => "pvt_ltd",
            EntityType::PublicLtd => "public_ltd",
            EntityType::Trust => "trust",
            EntityType::Society => "society",
            EntityType::Huf => "huf",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proprietorship" => Ok(EntityType::Proprietorship),
            "partnership" => Ok(EntityType::Partnership),
            "llp" => Ok(EntityType::Llp),
            "pvt_ltd" => Ok(EntityType::PvtLtd),
            "public_ltd" => Ok(EntityType::PublicLtd),
            "trust" => Ok(EntityType::Trust),
            "society" => Ok(EntityType::Society),
            "huf" => Ok(EntityType::Huf),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of an extracted field row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Extraction,
    BankAnalysis,
}

impl FieldSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Extraction => "extraction",
            FieldSource::BankAnalysis => "bank_analysis",
        }
    }
}

impl FromStr for FieldSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extraction" => Ok(FieldSource::Extraction),
            "bank_analysis" => Ok(FieldSource::BankAnalysis),
            other => Err(format!("unknown field source: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_status_round_trips_through_strings() {
        for status in [
            CaseStatus::Created,
            CaseStatus::Processing,
            CaseStatus::FeaturesExtracted,
            CaseStatus::EligibilityScored,
            CaseStatus::ReportGenerated,
            CaseStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), status);
        }
    }

    #[test]
    fn document_kind_labels_are_title_cased() {
        assert_eq!(DocumentKind::GstCertificate.label(), "Gst Certificate");
        assert_eq!(DocumentKind::BankStatement.label(), "Bank Statement");
    }

    #[test]
    fn unknown_strings_are_rejected() {
        assert!("definitely_not_a_status".parse::<CaseStatus>().is_err());
        assert!("xlsx".parse::<DocumentKind>().is_err());
    }
}
