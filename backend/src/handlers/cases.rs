//! Case lifecycle API handlers.
//!
//! Endpoints:
//!
//! - `POST   /api/v1/cases` - create a case with a fresh `CASE-...` id
//! - `GET    /api/v1/cases` - list the operator's cases
//! - `GET    /api/v1/cases/{case_id}` - case detail
//! - `PATCH  /api/v1/cases/{case_id}` - partial update / manual overrides
//! - `DELETE /api/v1/cases/{case_id}` - hard delete with storage cleanup
//! - `GET    /api/v1/cases/{case_id}/documents` - uploaded documents
//! - `GET    /api/v1/cases/{case_id}/status` - processing visibility
//! - `GET    /api/v1/cases/{case_id}/checklist` - document checklist
//! - `GET    /api/v1/cases/{case_id}/manual-prompts` - data-capture prompts
//! - `GET    /api/v1/cases/{case_id}/gst-data` - cached GST payload

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::operator_id;
use crate::models::{CaseRow, DocumentRow};
use crate::services::case_ids::{is_valid_case_id, next_case_id, MAX_ALLOCATION_ATTEMPTS};
use crate::services::checklist::{
    generate_checklist, manual_prompts_for_missing, ManualOverrides,
};
use crate::services::processor::refresh_case_completeness;
use crate::AppState;
use shared::dtos::{CaseStatusSummary, CreateCaseRequest, UpdateCaseRequest};
use shared::models::enums::DocumentKind;

fn validate_pincode(pincode: &Option<String>) -> ServiceResult<()> {
    if let Some(pincode) = pincode {
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::Validation(format!(
                "invalid pincode: {}",
                pincode
            )));
        }
    }
    Ok(())
}

/// Make sure the asserted operator exists so case rows can reference it.
/// User management proper lives outside this service.
async fn ensure_user(pool: &MySqlPool, user_id: &Uuid) -> ServiceResult<()> {
    sqlx::query("INSERT IGNORE INTO users (id, email) VALUES (?, ?)")
        .bind(user_id.to_string())
        .bind(format!("{}@operator.local", user_id))
        .execute(pool)
        .await?;
    Ok(())
}

/// Fetch a case by its human-readable id, scoped to the operator.
pub(crate) async fn fetch_scoped_case(
    pool: &MySqlPool,
    case_id: &str,
    user_id: &Uuid,
) -> ServiceResult<CaseRow> {
    if !is_valid_case_id(case_id) {
        return Err(ServiceError::Validation(format!(
            "malformed case id: {}",
            case_id
        )));
    }

    let row = sqlx::query("SELECT * FROM cases WHERE case_id = ? AND user_id = ?")
        .bind(case_id)
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Case {} not found", case_id)))?;

    Ok(CaseRow::from_row(&row)?)
}

pub(crate) fn overrides_from_case(case: &CaseRow) -> ManualOverrides {
    ManualOverrides {
        cibil_score_manual: case.cibil_score_manual,
        business_vintage_years: case.business_vintage_years,
        monthly_turnover_manual: case.monthly_turnover_manual,
    }
}

pub(crate) async fn load_case_document_kinds(
    pool: &MySqlPool,
    case_uuid: &Uuid,
) -> ServiceResult<(Vec<DocumentKind>, Vec<String>)> {
    let rows = sqlx::query("SELECT doc_kind, original_filename FROM documents WHERE case_id = ?")
        .bind(case_uuid.to_string())
        .fetch_all(pool)
        .await?;

    let mut classified = Vec::new();
    let mut unreadable = Vec::new();
    for row in &rows {
        let kind: Option<String> = row.get("doc_kind");
        match kind
            .as_deref()
            .and_then(|value| DocumentKind::from_str(value).ok())
        {
            Some(kind) if kind != DocumentKind::Unknown => classified.push(kind),
            _ => unreadable.push(row.get("original_filename")),
        }
    }
    Ok((classified, unreadable))
}

/// Creates a new case with a freshly allocated case id.
///
/// **Endpoint**: `POST /api/v1/cases`
///
/// Id allocation counts today's cases and retries on the unique-key
/// conflict, so concurrent creators serialize through the constraint.
pub async fn create_case(
    req: HttpRequest,
    body: web::Json<CreateCaseRequest>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("POST /api/v1/cases - creating case for operator {}", user_id);

    validate_pincode(&body.pincode)?;
    ensure_user(&data.db_pool, &user_id).await?;

    let today = Utc::now().date_naive();
    let mut attempt = 0u32;

    let case_id = loop {
        attempt += 1;
        let candidate = next_case_id(&data.db_pool, today).await?;
        let id = Uuid::new_v4();

        let result = sqlx::query(
            "INSERT INTO cases (id, case_id, user_id, status, program_type, borrower_name,
                                entity_type, industry_type, pincode, loan_amount_requested)
             VALUES (?, ?, ?, 'created', ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&candidate)
        .bind(user_id.to_string())
        .bind(body.program_type.map(|p| p.as_str().to_string()))
        .bind(&body.borrower_name)
        .bind(body.entity_type.map(|e| e.as_str().to_string()))
        .bind(&body.industry_type)
        .bind(&body.pincode)
        .bind(body.loan_amount_requested)
        .execute(&data.db_pool)
        .await;

        match result {
            Ok(_) => break candidate,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(
                    "Case id {} already taken (attempt {}), retrying",
                    candidate, attempt
                );
                if attempt >= MAX_ALLOCATION_ATTEMPTS {
                    return Err(ServiceError::Internal(
                        "could not allocate a case id".to_string(),
                    ));
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;
    if case.program_type.is_some() {
        let _ = refresh_case_completeness(&data.db_pool, &case.id).await;
    }

    info!("Created case {} for operator {}", case_id, user_id);
    Ok(HttpResponse::Created().json(case.to_response()))
}

/// Lists the operator's cases, newest first.
///
/// **Endpoint**: `GET /api/v1/cases`
pub async fn list_cases(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;

    let rows = sqlx::query("SELECT * FROM cases WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id.to_string())
        .fetch_all(&data.db_pool)
        .await?;

    let mut cases = Vec::with_capacity(rows.len());
    for row in &rows {
        cases.push(CaseRow::from_row(row)?.to_response());
    }

    Ok(HttpResponse::Ok().json(cases))
}

/// Case detail.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}`
pub async fn get_case(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(case.to_response()))
}

/// Partial case update, including the manual override slots.
///
/// **Endpoint**: `PATCH /api/v1/cases/{case_id}`
///
/// Absent fields are untouched; completeness is recomputed afterwards since
/// manual overrides count as virtual documents.
pub async fn update_case(
    req: HttpRequest,
    case_id: web::Path<String>,
    body: web::Json<UpdateCaseRequest>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("PATCH /api/v1/cases/{} - updating case", case_id);

    validate_pincode(&body.pincode)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    sqlx::query(
        "UPDATE cases SET
            borrower_name = COALESCE(?, borrower_name),
            entity_type = COALESCE(?, entity_type),
            program_type = COALESCE(?, program_type),
            industry_type = COALESCE(?, industry_type),
            pincode = COALESCE(?, pincode),
            loan_amount_requested = COALESCE(?, loan_amount_requested),
            gstin = COALESCE(?, gstin),
            cibil_score_manual = COALESCE(?, cibil_score_manual),
            business_vintage_years = COALESCE(?, business_vintage_years),
            monthly_turnover_manual = COALESCE(?, monthly_turnover_manual)
         WHERE id = ?",
    )
    .bind(&body.borrower_name)
    .bind(body.entity_type.map(|e| e.as_str().to_string()))
    .bind(body.program_type.map(|p| p.as_str().to_string()))
    .bind(&body.industry_type)
    .bind(&body.pincode)
    .bind(body.loan_amount_requested)
    .bind(&body.gstin)
    .bind(body.cibil_score_manual)
    .bind(body.business_vintage_years)
    .bind(body.monthly_turnover_manual)
    .bind(case.id.to_string())
    .execute(&data.db_pool)
    .await?;

    let _ = refresh_case_completeness(&data.db_pool, &case.id).await;

    let updated = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(updated.to_response()))
}

/// Hard-deletes a case, its dependents, and (best effort) its stored files.
///
/// **Endpoint**: `DELETE /api/v1/cases/{case_id}`
///
/// Storage cleanup failures are logged and never roll back the delete.
pub async fn delete_case(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("DELETE /api/v1/cases/{} - deleting case", case_id);

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let storage_keys: Vec<String> =
        sqlx::query("SELECT storage_key FROM documents WHERE case_id = ?")
            .bind(case.id.to_string())
            .fetch_all(&data.db_pool)
            .await?
            .iter()
            .map(|row| row.get("storage_key"))
            .collect();

    // Leads link to cases optionally; clear the linkage so the restrictive
    // foreign key cannot block the delete.
    if let Err(e) = sqlx::query("UPDATE leads SET case_id = NULL WHERE case_id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await
    {
        warn!("Could not clear lead linkage for case {}: {}", case_id, e);
    }

    sqlx::query("DELETE FROM cases WHERE id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    for key in storage_keys {
        if let Err(e) = data.storage.delete(&key).await {
            warn!("Storage cleanup failed for case {} file {}: {}", case_id, key, e);
        }
    }

    info!("Deleted case {}", case_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Lists the case's documents.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}/documents`
pub async fn get_case_documents(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let rows = sqlx::query("SELECT * FROM documents WHERE case_id = ? ORDER BY created_at")
        .bind(case.id.to_string())
        .fetch_all(&data.db_pool)
        .await?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in &rows {
        documents.push(DocumentRow::from_row(row)?.to_response());
    }

    Ok(HttpResponse::Ok().json(documents))
}

/// Background-processing visibility: document and job counts.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}/status`
pub async fn get_case_status(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let doc_counts = sqlx::query(
        "SELECT
            COUNT(*) AS total,
            CAST(SUM(CASE WHEN status = 'classified' THEN 1 ELSE 0 END) AS SIGNED) AS classified,
            CAST(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS SIGNED) AS failed
         FROM documents WHERE case_id = ?",
    )
    .bind(case.id.to_string())
    .fetch_one(&data.db_pool)
    .await?;

    let job_counts = sqlx::query(
        "SELECT
            CAST(SUM(CASE WHEN status IN ('queued', 'processing') THEN 1 ELSE 0 END) AS SIGNED) AS pending,
            CAST(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS SIGNED) AS failed
         FROM document_processing_jobs WHERE case_id = ?",
    )
    .bind(case.id.to_string())
    .fetch_one(&data.db_pool)
    .await?;

    let summary = CaseStatusSummary {
        case_id: case.case_id.clone(),
        status: case.status,
        completeness_score: case.completeness_score,
        documents_total: doc_counts.get("total"),
        documents_classified: doc_counts.try_get::<Option<i64>, _>("classified")?.unwrap_or(0),
        documents_failed: doc_counts.try_get::<Option<i64>, _>("failed")?.unwrap_or(0),
        jobs_pending: job_counts.try_get::<Option<i64>, _>("pending")?.unwrap_or(0),
        jobs_failed: job_counts.try_get::<Option<i64>, _>("failed")?.unwrap_or(0),
    };

    Ok(HttpResponse::Ok().json(summary))
}

/// Document checklist for the case's program type.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}/checklist`
pub async fn get_case_checklist(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let Some(program_type) = case.program_type else {
        return Err(ServiceError::Validation(
            "Program type must be set before generating checklist".to_string(),
        ));
    };

    let (classified, unreadable) = load_case_document_kinds(&data.db_pool, &case.id).await?;
    let checklist = generate_checklist(
        program_type,
        &classified,
        unreadable,
        &overrides_from_case(&case),
    );

    Ok(HttpResponse::Ok().json(checklist))
}

/// Progressive data-capture prompts for checklist gaps.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}/manual-prompts`
pub async fn get_manual_prompts(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let Some(program_type) = case.program_type else {
        return Ok(HttpResponse::Ok().json(Vec::<serde_json::Value>::new()));
    };

    let (classified, unreadable) = load_case_document_kinds(&data.db_pool, &case.id).await?;
    let overrides = overrides_from_case(&case);
    let checklist = generate_checklist(program_type, &classified, unreadable, &overrides);
    let prompts = manual_prompts_for_missing(&checklist.missing, &overrides);

    Ok(HttpResponse::Ok().json(prompts))
}

/// Cached GST authority payload for the case.
///
/// **Endpoint**: `GET /api/v1/cases/{case_id}/gst-data`
pub async fn get_gst_data(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    match (&case.gstin, &case.gst_data) {
        (Some(gstin), Some(payload)) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "gstin": gstin,
            "gst_data": payload,
        }))),
        (Some(gstin), None) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "gstin": gstin,
            "gst_data": null,
        }))),
        _ => Err(ServiceError::NotFound(format!(
            "No GST data recorded for case {}",
            case_id
        ))),
    }
}
