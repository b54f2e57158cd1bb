//! Extraction and feature-assembly handlers.
//!
//! Endpoints:
//!
//! - `POST /api/v1/extraction/case/{case_id}/extract` - run bank analysis
//!   and assemble the borrower feature vector
//! - `GET  /api/v1/extraction/case/{case_id}/fields` - raw extracted fields
//! - `GET  /api/v1/extraction/case/{case_id}/features` - the feature vector
//!
//! Triggering extraction while document jobs are still queued or processing
//! returns a 409: a half-processed case would produce a half-formed vector.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use log::{info, warn};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::cases::fetch_scoped_case;
use crate::handlers::operator_id;
use crate::models::CaseRow;
use crate::services::bank_analyzer::{
    analysis_to_fields, analyze_transactions, normalize_transactions,
};
use crate::services::bank_parser::{try_parse_local, ParsedStatements};
use crate::services::features::{FeatureAssembler, ManualOverlay};
use crate::AppState;
use shared::dtos::{BankAnalysisResult, BorrowerFeatureVector, ExtractedFieldItem};
use shared::models::enums::{EntityType, FieldSource};

/// Load every extracted field row for a case, oldest first.
pub(crate) async fn load_extracted_fields(
    pool: &MySqlPool,
    case_uuid: &Uuid,
) -> ServiceResult<Vec<ExtractedFieldItem>> {
    let rows = sqlx::query(
        "SELECT field_name, field_value, confidence, source
         FROM extracted_fields WHERE case_id = ? ORDER BY created_at",
    )
    .bind(case_uuid.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            ExtractedFieldItem {
                field_name: row.get("field_name"),
                field_value: row.get("field_value"),
                confidence: row.get("confidence"),
                source: FieldSource::from_str(&source).unwrap_or(FieldSource::Extraction),
            }
        })
        .collect())
}

/// Load the persisted feature vector for a case.
pub(crate) async fn load_feature_vector(
    pool: &MySqlPool,
    case_uuid: &Uuid,
) -> ServiceResult<Option<BorrowerFeatureVector>> {
    let row = sqlx::query("SELECT * FROM borrower_features WHERE case_id = ?")
        .bind(case_uuid.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let entity_type: Option<String> = row.get("entity_type");
    let dob: Option<NaiveDate> = row.get("dob");

    Ok(Some(BorrowerFeatureVector {
        full_name: row.get("full_name"),
        pan_number: row.get("pan_number"),
        aadhaar_number: row.get("aadhaar_number"),
        dob,
        entity_type: entity_type
            .as_deref()
            .and_then(|value| EntityType::from_str(value).ok()),
        business_vintage_years: row.get("business_vintage_years"),
        gstin: row.get("gstin"),
        industry_type: row.get("industry_type"),
        pincode: row.get("pincode"),
        annual_turnover: row.get("annual_turnover"),
        avg_monthly_balance: row.get("avg_monthly_balance"),
        monthly_credit_avg: row.get("monthly_credit_avg"),
        monthly_turnover: row.get("monthly_turnover"),
        emi_outflow_monthly: row.get("emi_outflow_monthly"),
        bounce_count_12m: row.get("bounce_count_12m"),
        cash_deposit_ratio: row.get("cash_deposit_ratio"),
        itr_total_income: row.get("itr_total_income"),
        cibil_score: row.get("cibil_score"),
        active_loan_count: row.get("active_loan_count"),
        overdue_count: row.get("overdue_count"),
        enquiry_count_6m: row.get("enquiry_count_6m"),
        feature_completeness: row.get("feature_completeness"),
    }))
}

/// Upsert the one-per-case feature vector row.
async fn save_feature_vector(
    pool: &MySqlPool,
    case: &CaseRow,
    vector: &BorrowerFeatureVector,
) -> ServiceResult<()> {
    sqlx::query(
        "INSERT INTO borrower_features (
            id, case_id, organization_id, full_name, pan_number, aadhaar_number, dob,
            entity_type, business_vintage_years, gstin, industry_type, pincode,
            annual_turnover, avg_monthly_balance, monthly_credit_avg, monthly_turnover,
            emi_outflow_monthly, bounce_count_12m, cash_deposit_ratio, itr_total_income,
            cibil_score, active_loan_count, overdue_count, enquiry_count_6m,
            feature_completeness
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON DUPLICATE KEY UPDATE
            full_name = VALUES(full_name),
            pan_number = VALUES(pan_number),
            aadhaar_number = VALUES(aadhaar_number),
            dob = VALUES(dob),
            entity_type = VALUES(entity_type),
            business_vintage_years = VALUES(business_vintage_years),
            gstin = VALUES(gstin),
            industry_type = VALUES(industry_type),
            pincode = VALUES(pincode),
            annual_turnover = VALUES(annual_turnover),
            avg_monthly_balance = VALUES(avg_monthly_balance),
            monthly_credit_avg = VALUES(monthly_credit_avg),
            monthly_turnover = VALUES(monthly_turnover),
            emi_outflow_monthly = VALUES(emi_outflow_monthly),
            bounce_count_12m = VALUES(bounce_count_12m),
            cash_deposit_ratio = VALUES(cash_deposit_ratio),
            itr_total_income = VALUES(itr_total_income),
            cibil_score = VALUES(cibil_score),
            active_loan_count = VALUES(active_loan_count),
            overdue_count = VALUES(overdue_count),
            enquiry_count_6m = VALUES(enquiry_count_6m),
            feature_completeness = VALUES(feature_completeness)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(case.id.to_string())
    .bind(case.organization_id.map(|id| id.to_string()))
    .bind(&vector.full_name)
    .bind(&vector.pan_number)
    .bind(&vector.aadhaar_number)
    .bind(vector.dob)
    .bind(vector.entity_type.map(|e| e.as_str().to_string()))
    .bind(vector.business_vintage_years)
    .bind(&vector.gstin)
    .bind(&vector.industry_type)
    .bind(&vector.pincode)
    .bind(vector.annual_turnover)
    .bind(vector.avg_monthly_balance)
    .bind(vector.monthly_credit_avg)
    .bind(vector.monthly_turnover)
    .bind(vector.emi_outflow_monthly)
    .bind(vector.bounce_count_12m)
    .bind(vector.cash_deposit_ratio)
    .bind(vector.itr_total_income)
    .bind(vector.cibil_score)
    .bind(vector.active_loan_count)
    .bind(vector.overdue_count)
    .bind(vector.enquiry_count_6m)
    .bind(vector.feature_completeness)
    .execute(pool)
    .await?;

    Ok(())
}

/// Run bank statement analysis for the case's classified statements.
///
/// Honors the per-PDF byte cap and the per-case statement-count cap (the
/// largest files win), runs under the configured wall-clock timeout, and
/// surfaces a timeout as a structured zero-confidence result.
async fn analyze_case_statements(
    data: &AppState,
    case: &CaseRow,
) -> ServiceResult<Option<BankAnalysisResult>> {
    let rows = sqlx::query(
        "SELECT storage_key, original_filename, file_size_bytes
         FROM documents
         WHERE case_id = ? AND doc_kind = 'bank_statement' AND status != 'failed'
         ORDER BY file_size_bytes DESC",
    )
    .bind(case.id.to_string())
    .fetch_all(&data.db_pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let byte_cap = data.settings.pipeline.bank_pdf_max_mb * 1024 * 1024;
    let count_cap = data.settings.pipeline.bank_statements_max_per_case;

    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    for row in rows.iter() {
        if files.len() >= count_cap {
            warn!(
                "Case {}: statement count cap reached, analyzing the largest {} files",
                case.case_id, count_cap
            );
            break;
        }
        let size: i64 = row.get("file_size_bytes");
        if size as u64 > byte_cap {
            warn!(
                "Case {}: statement {} exceeds the per-PDF cap, skipping",
                case.case_id,
                row.get::<String, _>("original_filename")
            );
            continue;
        }
        let key: String = row.get("storage_key");
        let filename: String = row.get("original_filename");
        match data.storage.get(&key).await {
            Ok(bytes) => files.push((filename, bytes)),
            Err(e) => warn!("Case {}: cannot read {}: {}", case.case_id, key, e),
        }
    }

    if files.is_empty() {
        return Ok(Some(BankAnalysisResult::empty("local_parser")));
    }

    let timeout = Duration::from_secs(data.settings.pipeline.bank_analysis_timeout_seconds);
    let analysis = tokio::time::timeout(timeout, async {
        // Remote parser preferred; local JSON-export fallback otherwise.
        let (parsed, source): (ParsedStatements, &str) = if data.bank_parser.is_configured() {
            match data.bank_parser.parse(&files).await {
                Ok(parsed) => (parsed, "credilo_remote"),
                Err(e) => {
                    warn!("Remote statement parser failed: {}", e);
                    match try_parse_local(&files) {
                        Some(parsed) => (parsed, "local_parser"),
                        None => return BankAnalysisResult::empty("credilo_remote"),
                    }
                }
            }
        } else {
            match try_parse_local(&files) {
                Some(parsed) => (parsed, "local_parser"),
                None => return BankAnalysisResult::empty("local_parser"),
            }
        };

        // Heavy normalization runs on a blocking thread so the timeout can
        // actually preempt long runs.
        let summary = parsed.summary.clone();
        let bank = parsed.bank_detected.clone();
        let account = parsed.account_number.clone();
        let source = source.to_string();
        tokio::task::spawn_blocking(move || {
            let transactions = normalize_transactions(&parsed.transactions);
            analyze_transactions(transactions, bank, account, &source, Some(summary))
        })
        .await
        .unwrap_or_else(|_| BankAnalysisResult::empty("local_parser"))
    })
    .await;

    match analysis {
        Ok(result) => Ok(Some(result)),
        Err(_) => {
            warn!(
                "Bank analysis timed out after {:?} for case {}",
                timeout, case.case_id
            );
            Ok(Some(BankAnalysisResult::empty("timeout")))
        }
    }
}

/// Trigger bank analysis plus feature assembly for a case.
pub async fn trigger_extraction(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("POST /api/v1/extraction/case/{}/extract", case_id);

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    // A half-processed case would assemble a half-formed vector.
    let pending = sqlx::query(
        "SELECT COUNT(*) AS pending FROM document_processing_jobs
         WHERE case_id = ? AND status IN ('queued', 'processing')",
    )
    .bind(case.id.to_string())
    .fetch_one(&data.db_pool)
    .await?;
    let pending_count: i64 = pending.get("pending");
    if pending_count > 0 {
        return Err(ServiceError::Conflict(format!(
            "{} document jobs still pending; retry when processing completes",
            pending_count
        )));
    }

    // Bank statement analysis first, so its fields join the merge.
    let bank_analysis = analyze_case_statements(&data, &case).await?;
    if let Some(analysis) = &bank_analysis {
        let fields = analysis_to_fields(analysis);
        for field in &fields {
            sqlx::query(
                "INSERT INTO extracted_fields (id, case_id, field_name, field_value, confidence, source)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(case.id.to_string())
            .bind(&field.field_name)
            .bind(&field.field_value)
            .bind(field.confidence)
            .bind(field.source.as_str())
            .execute(&data.db_pool)
            .await?;
        }
        info!(
            "Bank analysis for case {}: {} transactions, confidence {:.2}, source {}",
            case.case_id, analysis.transaction_count, analysis.confidence, analysis.source
        );
    }

    let extracted = load_extracted_fields(&data.db_pool, &case.id).await?;

    let overlay = ManualOverlay {
        borrower_name: case.borrower_name.clone(),
        entity_type: case.entity_type.clone(),
        business_vintage_years: case.business_vintage_years,
        gstin: case.gstin.clone(),
        cibil_score_manual: case.cibil_score_manual,
        monthly_turnover_manual: case.monthly_turnover_manual,
        industry_type: case.industry_type.clone(),
        pincode: case.pincode.clone(),
        gst_data: case.gst_data.clone(),
    };

    let assembler = FeatureAssembler::new(data.settings.pipeline.confidence_threshold);
    let vector = assembler.assemble(&overlay, &extracted);

    save_feature_vector(&data.db_pool, &case, &vector).await?;

    sqlx::query("UPDATE cases SET status = 'features_extracted' WHERE id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    info!(
        "Assembled feature vector for case {} (completeness {:.2}%)",
        case.case_id, vector.feature_completeness
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "case_id": case.case_id,
        "features": vector,
        "bank_analysis": bank_analysis,
    })))
}

/// Raw extracted field rows for a case.
pub async fn get_extracted_fields(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;
    let fields = load_extracted_fields(&data.db_pool, &case.id).await?;
    Ok(HttpResponse::Ok().json(fields))
}

/// The assembled feature vector for a case.
pub async fn get_feature_vector(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    match load_feature_vector(&data.db_pool, &case.id).await? {
        Some(vector) => Ok(HttpResponse::Ok().json(vector)),
        None => Err(ServiceError::NotFound(format!(
            "No feature vector for case {}; run extraction first",
            case_id
        ))),
    }
}
