//! Request/response schemas shared between the API layer and the pipeline.

pub mod bank;
pub mod cases;
pub mod checklist;
pub mod documents;
pub mod eligibility;
pub mod features;
pub mod fields;
pub mod lenders;
pub mod report;

pub use bank::{BankAnalysisResult, BankTransaction, MonthlySummary, ParserSummary};
pub use cases::{CaseResponse, CaseStatusSummary, CreateCaseRequest, UpdateCaseRequest};
pub use checklist::{DocumentChecklist, ManualFieldPrompt};
pub use documents::DocumentResponse;
pub use eligibility::{
    DynamicRecommendation, EligibilityResponse, EligibilityResult, HardFilterDetails,
    LenderTerms, LenderThresholds, MatchExplainability, ScoreComponent,
};
pub use features::{BorrowerFeatureVector, TOTAL_FEATURE_SLOTS};
pub use fields::ExtractedFieldItem;
pub use lenders::{
    KnowledgeBaseStats, LenderProductRule, LenderSummary, PincodeIngestStats, PolicyIngestStats,
};
pub use report::CaseReportData;
