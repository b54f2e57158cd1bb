use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{DocumentKind, DocumentStatus};

/// Document representation returned by upload and listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub original_filename: String,
    pub doc_kind: Option<DocumentKind>,
    pub classification_confidence: f64,
    pub status: DocumentStatus,
    pub file_size_bytes: i64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}
