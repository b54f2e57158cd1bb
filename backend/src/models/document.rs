//! Document and processing-job row models.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use shared::dtos::DocumentResponse;
use shared::models::enums::{DocumentKind, DocumentStatus, JobStatus};

use super::case::parse_uuid;

/// One row of the `documents` table.
///
/// `file_hash` is the SHA-256 of the file bytes; it is unique within a case
/// and drives duplicate detection at intake.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: Uuid,
    pub case_id: Uuid,
    pub original_filename: String,
    pub storage_key: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub file_hash: String,
    pub doc_kind: Option<DocumentKind>,
    pub classification_confidence: f64,
    pub ocr_text: Option<String>,
    pub page_count: Option<i32>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
}

impl DocumentRow {
    pub fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        let id: String = row.get("id");
        let case_id: String = row.get("case_id");
        let doc_kind: Option<String> = row.get("doc_kind");
        let status: String = row.get("status");
        let created_at: NaiveDateTime = row.get("created_at");

        Ok(Self {
            id: parse_uuid(&id)?,
            case_id: parse_uuid(&case_id)?,
            original_filename: row.get("original_filename"),
            storage_key: row.get("storage_key"),
            file_size_bytes: row.get("file_size_bytes"),
            mime_type: row.get("mime_type"),
            file_hash: row.get("file_hash"),
            doc_kind: doc_kind
                .as_deref()
                .and_then(|value| DocumentKind::from_str(value).ok()),
            classification_confidence: row.get("classification_confidence"),
            ocr_text: row.try_get("ocr_text").unwrap_or(None),
            page_count: row.get("page_count"),
            status: DocumentStatus::from_str(&status).unwrap_or(DocumentStatus::Uploaded),
            created_at: DateTime::from_naive_utc_and_offset(created_at, Utc),
        })
    }

    pub fn to_response(&self) -> DocumentResponse {
        DocumentResponse {
            id: self.id,
            original_filename: self.original_filename.clone(),
            doc_kind: self.doc_kind,
            classification_confidence: self.classification_confidence,
            status: self.status,
            file_size_bytes: self.file_size_bytes,
            created_at: self.created_at,
        }
    }
}

/// One row of the `document_processing_jobs` table.
///
/// A job owns the OCR -> classification -> extraction ordering for its
/// document. Retries are bounded by `max_attempts`.
#[derive(Debug, Clone)]
pub struct ProcessingJobRow {
    pub id: Uuid,
    pub case_id: Uuid,
    pub document_id: Uuid,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
}

impl ProcessingJobRow {
    pub fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        let id: String = row.get("id");
        let case_id: String = row.get("case_id");
        let document_id: String = row.get("document_id");
        let status: String = row.get("status");

        Ok(Self {
            id: parse_uuid(&id)?,
            case_id: parse_uuid(&case_id)?,
            document_id: parse_uuid(&document_id)?,
            status: match status.as_str() {
                "processing" => JobStatus::Processing,
                "done" => JobStatus::Done,
                "failed" => JobStatus::Failed,
                _ => JobStatus::Queued,
            },
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            last_error: row.get("last_error"),
        })
    }
}
