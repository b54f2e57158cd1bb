//! Per-document processing pipeline.
//!
//! A processing job owns the ordering for one document: filename-first
//! classification, the OCR decision, content reclassification, GST
//! autofill, and field extraction. Every stage is fenced: a failure is
//! logged and the next stage runs with whatever data exists, so one flaky
//! collaborator never voids the document.

use chrono::Utc;
use log::{error, info, warn};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::gst_api::{extract_gstin_from_filename, extract_gstin_from_text, GstApiClient};
use crate::models::DocumentRow;
use crate::ocr::OcrClient;
use crate::services::checklist::{generate_checklist, ManualOverrides};
use crate::services::classifier::DocumentClassifier;
use crate::services::extractor::FieldExtractor;
use crate::storage::FileStorage;
use shared::dtos::ExtractedFieldItem;
use shared::models::enums::{DocumentKind, ProgramType};

/// Everything a worker needs to run one document end to end.
pub struct ProcessorContext {
    pub pool: MySqlPool,
    pub storage: Arc<dyn FileStorage>,
    pub ocr: OcrClient,
    pub gst: GstApiClient,
    pub classifier: DocumentClassifier,
    pub extractor: FieldExtractor,
}

/// OCR skip rules: bank statements go straight to the statement analyzer,
/// GST returns with a GSTIN in the filename carry everything we need, and
/// "photo" images are not worth a full OCR pass.
pub fn should_skip_ocr(kind: DocumentKind, filename: &str) -> bool {
    match kind {
        DocumentKind::BankStatement => true,
        DocumentKind::GstReturns => extract_gstin_from_filename(filename).is_some(),
        _ => {
            let lower = filename.to_lowercase();
            lower.contains("photo")
                && (lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png"))
        }
    }
}

impl ProcessorContext {
    /// Run the full pipeline for one document.
    pub async fn process_document(&self, document_id: &Uuid) -> ServiceResult<()> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(document_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("document {} not found", document_id)))?;
        let document = DocumentRow::from_row(&row)?;

        // Stage 1: filename-first classification.
        let filename_result = self
            .classifier
            .classify("", Some(&document.original_filename));
        let mut current_kind = filename_result.kind;

        if current_kind != DocumentKind::Unknown {
            self.record_classification(&document.id, current_kind, filename_result.confidence)
                .await?;

            if matches!(
                current_kind,
                DocumentKind::GstCertificate | DocumentKind::GstReturns
            ) {
                if let Some(gstin) = extract_gstin_from_filename(&document.original_filename) {
                    self.apply_gst_data(&document.case_id, &gstin).await;
                }
            }
        }

        // Stage 2: OCR, unless the skip heuristics say otherwise.
        let mut ocr_text: Option<String> = None;
        if !should_skip_ocr(current_kind, &document.original_filename) && self.ocr.is_configured()
        {
            match self.storage.get(&document.storage_key).await {
                Ok(bytes) => {
                    if let Some(result) = self
                        .ocr
                        .recognize(&document.original_filename, bytes)
                        .await
                    {
                        sqlx::query(
                            "UPDATE documents SET ocr_text = ?, page_count = ?, status = 'ocr_complete' WHERE id = ?",
                        )
                        .bind(&result.text)
                        .bind(result.pages)
                        .bind(document.id.to_string())
                        .execute(&self.pool)
                        .await?;
                        ocr_text = Some(result.text);
                    }
                }
                Err(e) => {
                    warn!(
                        "File not readable for OCR ({}): {}",
                        document.storage_key, e
                    );
                }
            }
        } else {
            info!(
                "Skipping OCR for {} (kind={})",
                document.original_filename, current_kind
            );
        }

        // Stage 3: reclassify from content when OCR produced real text.
        if let Some(text) = ocr_text.as_deref() {
            if text.trim().len() > 3 {
                let content_result = self
                    .classifier
                    .classify(text, Some(&document.original_filename));
                if content_result.kind != DocumentKind::Unknown {
                    current_kind = content_result.kind;
                    self.record_classification(
                        &document.id,
                        content_result.kind,
                        content_result.confidence,
                    )
                    .await?;
                }

                if matches!(
                    current_kind,
                    DocumentKind::GstCertificate | DocumentKind::GstReturns
                ) {
                    if let Some(gstin) = extract_gstin_from_text(text) {
                        self.apply_gst_data(&document.case_id, &gstin).await;
                    }
                }
            }
        }

        // Stage 4: field extraction over whatever text exists.
        if current_kind != DocumentKind::Unknown {
            if let Some(text) = ocr_text.as_deref() {
                let fields = self.extractor.extract_fields(text, current_kind);
                if !fields.is_empty() {
                    self.save_extracted_fields(&document.case_id, Some(&document.id), &fields)
                        .await?;
                    info!(
                        "Extracted {} fields from {} ({})",
                        fields.len(),
                        document.original_filename,
                        current_kind
                    );
                }
            }
        }

        // Stage 5: coverage may have changed.
        if let Err(e) = refresh_case_completeness(&self.pool, &document.case_id).await {
            warn!(
                "Completeness refresh failed for case {}: {}",
                document.case_id, e
            );
        }

        Ok(())
    }

    async fn record_classification(
        &self,
        document_id: &Uuid,
        kind: DocumentKind,
        confidence: f64,
    ) -> ServiceResult<()> {
        sqlx::query(
            "UPDATE documents SET doc_kind = ?, classification_confidence = ?, status = 'classified' WHERE id = ?",
        )
        .bind(kind.as_str())
        .bind(confidence)
        .bind(document_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist extracted field rows. The history is append-only; readers
    /// pick the best row per field name.
    pub async fn save_extracted_fields(
        &self,
        case_id: &Uuid,
        document_id: Option<&Uuid>,
        fields: &[ExtractedFieldItem],
    ) -> ServiceResult<()> {
        for field in fields {
            sqlx::query(
                "INSERT INTO extracted_fields (id, case_id, document_id, field_name, field_value, confidence, source)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(case_id.to_string())
            .bind(document_id.map(|id| id.to_string()))
            .bind(&field.field_name)
            .bind(&field.field_value)
            .bind(field.confidence)
            .bind(field.source.as_str())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Fetch GST details for a GSTIN and fold them into the case.
    ///
    /// Idempotent per (case, GSTIN): the cached payload short-circuits the
    /// second document carrying the same number. Case-row writes serialize
    /// behind a row lock because parallel document jobs may land here
    /// concurrently. GST-sourced descriptors override manual entries except
    /// for industry, which only fills a gap.
    pub async fn apply_gst_data(&self, case_id: &Uuid, gstin: &str) {
        let result: ServiceResult<()> = async {
            let mut tx = self.pool.begin().await?;

            let case_row = sqlx::query(
                "SELECT gstin, gst_data, industry_type FROM cases WHERE id = ? FOR UPDATE",
            )
            .bind(case_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(case_row) = case_row else {
                return Err(ServiceError::NotFound(format!("case {} not found", case_id)));
            };

            let cached_gstin: Option<String> = case_row.get("gstin");
            let cached_data: Option<String> = case_row.try_get("gst_data").unwrap_or(None);
            if cached_gstin.as_deref() == Some(gstin) && cached_data.is_some() {
                info!("GST data already cached for case {}", case_id);
                tx.commit().await?;
                return Ok(());
            }

            let details = self.gst.fetch_company_details(gstin).await;

            match details {
                Some(details) => {
                    let industry: Option<String> = case_row.get("industry_type");
                    let payload = serde_json::to_string(&details)?;

                    sqlx::query(
                        "UPDATE cases SET
                            gstin = ?,
                            gst_data = ?,
                            gst_fetched_at = ?,
                            borrower_name = COALESCE(?, borrower_name),
                            entity_type = COALESCE(?, entity_type),
                            business_vintage_years = COALESCE(?, business_vintage_years),
                            pincode = COALESCE(?, pincode),
                            industry_type = COALESCE(industry_type, ?)
                         WHERE id = ?",
                    )
                    .bind(gstin)
                    .bind(&payload)
                    .bind(Utc::now().naive_utc())
                    .bind(&details.borrower_name)
                    .bind(&details.entity_type)
                    .bind(details.business_vintage_years)
                    .bind(&details.pincode)
                    .bind(&details.industry_type)
                    .bind(case_id.to_string())
                    .execute(&mut *tx)
                    .await?;

                    info!(
                        "Applied GST data to case {}: borrower={:?}, entity={:?}, industry_kept={:?}",
                        case_id, details.borrower_name, details.entity_type, industry
                    );
                }
                None => {
                    // Lookup failed: keep the GSTIN so the case still knows it.
                    sqlx::query("UPDATE cases SET gstin = ? WHERE id = ?")
                        .bind(gstin)
                        .bind(case_id.to_string())
                        .execute(&mut *tx)
                        .await?;
                }
            }

            tx.commit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!("GST autofill failed for case {}: {}", case_id, e);
        }
    }
}

/// Recompute and store the case completeness score from its documents and
/// manual overrides. No-op (score 0) while the program type is unset.
pub async fn refresh_case_completeness(pool: &MySqlPool, case_id: &Uuid) -> ServiceResult<f64> {
    let case_row = sqlx::query(
        "SELECT program_type, cibil_score_manual, business_vintage_years, monthly_turnover_manual
         FROM cases WHERE id = ?",
    )
    .bind(case_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ServiceError::NotFound(format!("case {} not found", case_id)))?;

    let program_type: Option<String> = case_row.get("program_type");
    let Some(program_type) = program_type
        .as_deref()
        .and_then(|value| ProgramType::from_str(value).ok())
    else {
        sqlx::query("UPDATE cases SET completeness_score = 0 WHERE id = ?")
            .bind(case_id.to_string())
            .execute(pool)
            .await?;
        return Ok(0.0);
    };

    let overrides = ManualOverrides {
        cibil_score_manual: case_row.get("cibil_score_manual"),
        business_vintage_years: case_row.get("business_vintage_years"),
        monthly_turnover_manual: case_row.get("monthly_turnover_manual"),
    };

    let doc_rows = sqlx::query("SELECT doc_kind, original_filename FROM documents WHERE case_id = ?")
        .bind(case_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut classified = Vec::new();
    let mut unreadable = Vec::new();
    for row in &doc_rows {
        let kind: Option<String> = row.get("doc_kind");
        match kind
            .as_deref()
            .and_then(|value| DocumentKind::from_str(value).ok())
        {
            Some(kind) if kind != DocumentKind::Unknown => classified.push(kind),
            _ => {
                let filename: String = row.get("original_filename");
                unreadable.push(filename);
            }
        }
    }

    let checklist = generate_checklist(program_type, &classified, unreadable, &overrides);

    sqlx::query("UPDATE cases SET completeness_score = ? WHERE id = ?")
        .bind(checklist.completeness_score)
        .bind(case_id.to_string())
        .execute(pool)
        .await?;

    if checklist.completeness_score < 30.0 {
        warn!(
            "Case {} completeness is {}% - missing critical documents",
            case_id, checklist.completeness_score
        );
    }

    Ok(checklist.completeness_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_statements_always_skip_ocr() {
        assert!(should_skip_ocr(
            DocumentKind::BankStatement,
            "hdfc_statement.pdf"
        ));
    }

    #[test]
    fn gst_returns_skip_ocr_only_with_filename_gstin() {
        assert!(should_skip_ocr(
            DocumentKind::GstReturns,
            "GSTR3B_27AABCU9603R1ZM.pdf"
        ));
        assert!(!should_skip_ocr(DocumentKind::GstReturns, "gstr3b_march.pdf"));
    }

    #[test]
    fn photo_images_skip_ocr() {
        assert!(should_skip_ocr(DocumentKind::Unknown, "shop_photo.jpg"));
        assert!(!should_skip_ocr(DocumentKind::Unknown, "shopfront.jpg"));
        assert!(!should_skip_ocr(DocumentKind::Unknown, "photo_notes.pdf"));
    }

    #[test]
    fn identity_documents_go_through_ocr() {
        assert!(!should_skip_ocr(DocumentKind::PanPersonal, "pan_card.pdf"));
        assert!(!should_skip_ocr(DocumentKind::Aadhaar, "aadhaar.pdf"));
        assert!(!should_skip_ocr(DocumentKind::CibilReport, "cibil.pdf"));
        assert!(!should_skip_ocr(
            DocumentKind::GstCertificate,
            "gst_certificate.pdf"
        ));
    }
}
