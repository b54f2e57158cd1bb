//! Report generation handlers.
//!
//! Endpoints:
//!
//! - `POST /api/v1/reports/case/{case_id}/generate` - assemble the report,
//!   render the PDF, persist both
//! - `GET  /api/v1/reports/case/{case_id}` - latest report payload
//! - `GET  /api/v1/reports/case/{case_id}/pdf` - the rendered PDF
//! - `GET  /api/v1/reports/case/{case_id}/whatsapp` - plaintext summary
//!
//! The submission strategy prefers the LLM narrative; any failure, timeout
//! or missing credential routes to the deterministic bullet fallback, so
//! report generation works fully offline.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::cases::{fetch_scoped_case, load_case_document_kinds, overrides_from_case};
use crate::handlers::eligibility::load_case_results;
use crate::handlers::extraction::load_feature_vector;
use crate::handlers::operator_id;
use crate::services::checklist::generate_checklist;
use crate::services::pdf::render_case_report_pdf;
use crate::services::report::{
    assemble_report, build_strategy_prompt, fallback_strategy, special_requirements_note,
    whatsapp_summary, NO_MATCH_STRATEGY, STRATEGY_SYSTEM_PROMPT,
};
use crate::AppState;
use shared::dtos::{BorrowerFeatureVector, CaseReportData, DocumentChecklist, EligibilityResult};
use shared::models::enums::{HardFilterStatus, ProgramType};

/// Special-requirement flags for the top lender, straight off its first
/// policy row.
async fn top_lender_special_notes(
    data: &AppState,
    lender_name: &str,
) -> ServiceResult<Option<String>> {
    let row = sqlx::query(
        "SELECT lp.*, l.lender_name
         FROM lender_products lp
         INNER JOIN lenders l ON lp.lender_id = l.id
         WHERE LOWER(l.lender_name) = LOWER(?)
         LIMIT 1",
    )
    .bind(lender_name)
    .fetch_optional(&data.db_pool)
    .await?;

    Ok(row
        .as_ref()
        .map(crate::models::lender::product_rule_from_row)
        .transpose()?
        .and_then(|product| special_requirements_note(&product)))
}

/// Build the submission strategy: LLM narrative preferred, deterministic
/// fallback always available.
async fn generate_submission_strategy(
    data: &AppState,
    borrower: &BorrowerFeatureVector,
    lender_matches: &[EligibilityResult],
) -> ServiceResult<String> {
    let passed: Vec<EligibilityResult> = lender_matches
        .iter()
        .filter(|m| m.hard_filter_status == HardFilterStatus::Pass)
        .cloned()
        .collect();

    if passed.is_empty() {
        return Ok(NO_MATCH_STRATEGY.to_string());
    }

    let special_notes = top_lender_special_notes(data, &passed[0].lender_name).await?;

    if !data.llm.is_configured() {
        warn!("LLM not configured, using fallback strategy format");
        return Ok(fallback_strategy(&passed, special_notes.as_deref()));
    }

    let prompt = build_strategy_prompt(borrower, &passed, special_notes.as_deref());
    match data.llm.complete(STRATEGY_SYSTEM_PROMPT, &prompt).await {
        Ok(narrative) => Ok(narrative),
        Err(e) => {
            warn!("LLM strategy failed, falling back: {}", e);
            Ok(fallback_strategy(&passed, special_notes.as_deref()))
        }
    }
}

async fn build_checklist(
    data: &AppState,
    case: &crate::models::CaseRow,
) -> ServiceResult<DocumentChecklist> {
    let program_type = case.program_type.unwrap_or(ProgramType::Banking);
    let (classified, unreadable) = load_case_document_kinds(&data.db_pool, &case.id).await?;
    Ok(generate_checklist(
        program_type,
        &classified,
        unreadable,
        &overrides_from_case(case),
    ))
}

/// Assemble and persist a new report version (JSON + PDF).
pub async fn generate_report(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("POST /api/v1/reports/case/{}/generate", case_id);

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    // Missing pieces degrade, they never block: a report over an empty
    // vector still renders with advisory notes.
    let borrower = load_feature_vector(&data.db_pool, &case.id)
        .await?
        .unwrap_or_default();
    let checklist = build_checklist(&data, &case).await?;
    let lender_matches = load_case_results(&data.db_pool, &case.id).await?;

    let strategy = generate_submission_strategy(&data, &borrower, &lender_matches).await?;

    let report = assemble_report(
        &case.case_id,
        borrower,
        checklist,
        lender_matches,
        strategy,
    );

    let generated_at = Utc::now();
    let pdf_bytes = render_case_report_pdf(&report, generated_at)?;
    let report_id = Uuid::new_v4();
    let pdf_key = format!("{}/reports/{}.pdf", case.case_id, report_id);
    data.storage.put(&pdf_key, &pdf_bytes).await?;

    sqlx::query(
        "INSERT INTO case_reports (id, case_id, organization_id, report_type, storage_key, report_data, generated_at)
         VALUES (?, ?, ?, 'full', ?, ?, ?)",
    )
    .bind(report_id.to_string())
    .bind(case.id.to_string())
    .bind(case.organization_id.map(|id| id.to_string()))
    .bind(&pdf_key)
    .bind(serde_json::to_string(&report)?)
    .bind(generated_at.naive_utc())
    .execute(&data.db_pool)
    .await?;

    sqlx::query("UPDATE cases SET status = 'report_generated' WHERE id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    info!(
        "Report {} generated for case {}: {} strengths, {} risks, {} matches",
        report_id,
        case.case_id,
        report.strengths.len(),
        report.risk_flags.len(),
        report.lender_matches.len()
    );

    Ok(HttpResponse::Created().json(report))
}

async fn load_latest_report(
    data: &AppState,
    case_uuid: &Uuid,
) -> ServiceResult<Option<(CaseReportData, Option<String>)>> {
    let row = sqlx::query(
        "SELECT report_data, storage_key FROM case_reports
         WHERE case_id = ? AND report_type = 'full'
         ORDER BY generated_at DESC LIMIT 1",
    )
    .bind(case_uuid.to_string())
    .fetch_optional(&data.db_pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let raw: String = row.get("report_data");
    let storage_key: Option<String> = row.get("storage_key");
    let report: CaseReportData = serde_json::from_str(&raw)?;
    Ok(Some((report, storage_key)))
}

/// Latest report payload for a case.
pub async fn get_report(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    match load_latest_report(&data, &case.id).await? {
        Some((report, _)) => Ok(HttpResponse::Ok().json(report)),
        None => Err(ServiceError::NotFound(format!(
            "No report generated for case {}",
            case_id
        ))),
    }
}

/// Latest rendered PDF for a case.
pub async fn get_report_pdf(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let Some((_, Some(storage_key))) = load_latest_report(&data, &case.id).await? else {
        return Err(ServiceError::NotFound(format!(
            "No report PDF for case {}",
            case_id
        )));
    };

    let bytes = data.storage.get(&storage_key).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .body(bytes))
}

/// WhatsApp-friendly plaintext rendering of the latest report.
pub async fn get_whatsapp_summary(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    match load_latest_report(&data, &case.id).await? {
        Some((report, _)) => {
            let summary = whatsapp_summary(&report);
            Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(summary))
        }
        None => Err(ServiceError::NotFound(format!(
            "No report generated for case {}",
            case_id
        ))),
    }
}
