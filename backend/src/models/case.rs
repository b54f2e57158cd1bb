//! Case row model.
//!
//! A case is the root aggregate: it owns documents, processing jobs,
//! extracted fields, the borrower feature vector, eligibility results and
//! reports, all of which cascade on delete.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use shared::dtos::CaseResponse;
use shared::models::enums::{CaseStatus, ProgramType};

/// One row of the `cases` table.
#[derive(Debug, Clone)]
pub struct CaseRow {
    pub id: Uuid,
    pub case_id: String,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub status: CaseStatus,
    pub program_type: Option<ProgramType>,
    pub borrower_name: Option<String>,
    pub entity_type: Option<String>,
    pub industry_type: Option<String>,
    pub pincode: Option<String>,
    pub business_vintage_years: Option<f64>,
    pub loan_amount_requested: Option<f64>,
    pub cibil_score_manual: Option<i32>,
    pub monthly_turnover_manual: Option<f64>,
    pub gstin: Option<String>,
    /// Cached GST authority payload, if a lookup has run for this case.
    pub gst_data: Option<Value>,
    pub completeness_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseRow {
    /// Hydrate from a `SELECT * FROM cases` row.
    pub fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        let id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let organization_id: Option<String> = row.get("organization_id");
        let status: String = row.get("status");
        let program_type: Option<String> = row.get("program_type");
        let gst_data: Option<String> = row.try_get("gst_data").unwrap_or(None);
        let created_at: NaiveDateTime = row.get("created_at");
        let updated_at: NaiveDateTime = row.get("updated_at");

        Ok(Self {
            id: parse_uuid(&id)?,
            case_id: row.get("case_id"),
            user_id: parse_uuid(&user_id)?,
            organization_id: organization_id.as_deref().map(parse_uuid).transpose()?,
            status: CaseStatus::from_str(&status).unwrap_or(CaseStatus::Created),
            program_type: program_type
                .as_deref()
                .and_then(|value| ProgramType::from_str(value).ok()),
            borrower_name: row.get("borrower_name"),
            entity_type: row.get("entity_type"),
            industry_type: row.get("industry_type"),
            pincode: row.get("pincode"),
            business_vintage_years: row.get("business_vintage_years"),
            loan_amount_requested: row.get("loan_amount_requested"),
            cibil_score_manual: row.get("cibil_score_manual"),
            monthly_turnover_manual: row.get("monthly_turnover_manual"),
            gstin: row.get("gstin"),
            gst_data: gst_data.and_then(|raw| serde_json::from_str(&raw).ok()),
            completeness_score: row.get("completeness_score"),
            created_at: DateTime::from_naive_utc_and_offset(created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(updated_at, Utc),
        })
    }

    pub fn to_response(&self) -> CaseResponse {
        CaseResponse {
            id: self.id,
            case_id: self.case_id.clone(),
            status: self.status,
            program_type: self.program_type,
            borrower_name: self.borrower_name.clone(),
            entity_type: self.entity_type.clone(),
            completeness_score: self.completeness_score,
            cibil_score_manual: self.cibil_score_manual,
            business_vintage_years: self.business_vintage_years,
            monthly_turnover_manual: self.monthly_turnover_manual,
            industry_type: self.industry_type.clone(),
            pincode: self.pincode.clone(),
            loan_amount_requested: self.loan_amount_requested,
            gstin: self.gstin.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
