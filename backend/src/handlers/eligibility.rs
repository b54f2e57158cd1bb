//! Eligibility scoring handlers.
//!
//! Endpoints:
//!
//! - `POST /api/v1/eligibility/case/{case_id}/score` - score the case
//!   against every active lender product and persist the results
//! - `GET  /api/v1/eligibility/case/{case_id}/results` - load persisted
//!   results with the advisory blocks recomputed
//!
//! Persistence is replace-and-insert: prior rows for the case are deleted
//! and the new set written. On load, the rejection narrative, the dynamic
//! recommendations and the explainability payload are recomputed from the
//! stored minimal rows plus the feature vector, so stale rows always
//! explain themselves.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::cases::fetch_scoped_case;
use crate::handlers::extraction::load_feature_vector;
use crate::handlers::operator_id;
use crate::models::lender::product_rule_from_row;
use crate::services::eligibility::{
    generate_dynamic_recommendations, generate_rejection_analysis, normalize_pass_details,
    score_products,
};
use crate::AppState;
use shared::dtos::{
    EligibilityResponse, EligibilityResult, HardFilterDetails, LenderProductRule,
};
use shared::models::enums::{ApprovalProbability, HardFilterStatus, ProgramType};

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub program_type: Option<ProgramType>,
}

/// Fetch active lender products for scoring, with their row ids for
/// persistence.
async fn load_products_for_scoring(
    pool: &MySqlPool,
    program_type: Option<ProgramType>,
) -> ServiceResult<Vec<(String, LenderProductRule)>> {
    let base = "SELECT lp.*, l.lender_name
                FROM lender_products lp
                INNER JOIN lenders l ON lp.lender_id = l.id
                WHERE l.is_active = TRUE";

    let rows = match program_type {
        Some(program) => {
            let query = format!("{} AND lp.program_type = ?", base);
            sqlx::query(&query)
                .bind(program.as_str())
                .fetch_all(pool)
                .await?
        }
        None => sqlx::query(base).fetch_all(pool).await?,
    };

    let mut products = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: String = row.get("id");
        products.push((id, product_rule_from_row(row)?));
    }
    Ok(products)
}

/// Lender names (lowercased) covering a pincode.
async fn load_pincode_coverage(
    pool: &MySqlPool,
    pincode: Option<&str>,
) -> ServiceResult<HashSet<String>> {
    let Some(pincode) = pincode else {
        return Ok(HashSet::new());
    };

    let rows = sqlx::query(
        "SELECT DISTINCT LOWER(l.lender_name) AS lender_name
         FROM lender_pincodes lpc
         INNER JOIN lenders l ON lpc.lender_id = l.id
         WHERE lpc.pincode = ?",
    )
    .bind(pincode)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("lender_name")).collect())
}

/// Score a case against the knowledge base and persist the result set.
pub async fn score_case(
    req: HttpRequest,
    case_id: web::Path<String>,
    query: web::Query<ScoreQuery>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("POST /api/v1/eligibility/case/{}/score", case_id);

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;
    let borrower = load_feature_vector(&data.db_pool, &case.id)
        .await?
        .ok_or_else(|| {
            ServiceError::Conflict(format!(
                "Case {} has no feature vector; run extraction first",
                case_id
            ))
        })?;

    let products = load_products_for_scoring(&data.db_pool, query.program_type).await?;
    let coverage = load_pincode_coverage(&data.db_pool, borrower.pincode.as_deref()).await?;
    let today = Utc::now().date_naive();

    info!(
        "Evaluating case {} against {} lender products",
        case.case_id,
        products.len()
    );

    let rules: Vec<LenderProductRule> = products.iter().map(|(_, rule)| rule.clone()).collect();
    let results = score_products(&borrower, &rules, &coverage, today);

    let passed_count = results
        .iter()
        .filter(|r| r.hard_filter_status == HardFilterStatus::Pass)
        .count() as i64;

    // Replace-and-insert persistence.
    let product_ids: HashMap<(String, String), String> = products
        .iter()
        .map(|(id, rule)| {
            (
                (
                    rule.lender_name.to_lowercase(),
                    rule.product_name.to_lowercase(),
                ),
                id.clone(),
            )
        })
        .collect();

    sqlx::query("DELETE FROM eligibility_results WHERE case_id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    for result in &results {
        let key = (
            result.lender_name.to_lowercase(),
            result.product_name.to_lowercase(),
        );
        let Some(product_id) = product_ids.get(&key) else {
            continue;
        };

        sqlx::query(
            "INSERT INTO eligibility_results (
                id, case_id, organization_id, lender_product_id,
                hard_filter_status, hard_filter_details, eligibility_score,
                approval_probability, expected_ticket_min, expected_ticket_max,
                confidence, missing_for_improvement, result_rank
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(case.id.to_string())
        .bind(case.organization_id.map(|id| id.to_string()))
        .bind(product_id)
        .bind(result.hard_filter_status.as_str())
        .bind(serde_json::to_string(&result.details)?)
        .bind(result.eligibility_score)
        .bind(result.approval_probability.map(|p| p.as_str().to_string()))
        .bind(result.expected_ticket_min)
        .bind(result.expected_ticket_max)
        .bind(result.confidence)
        .bind(serde_json::to_string(&result.missing_for_improvement)?)
        .bind(result.rank)
        .execute(&data.db_pool)
        .await?;
    }

    sqlx::query("UPDATE cases SET status = 'eligibility_scored' WHERE id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    info!(
        "Eligibility scoring complete for case {}: {}/{} products passed",
        case.case_id,
        passed_count,
        results.len()
    );

    let failed: Vec<EligibilityResult> = results
        .iter()
        .filter(|r| r.hard_filter_status == HardFilterStatus::Fail)
        .cloned()
        .collect();

    let (rejection_reasons, suggested_actions) = if passed_count == 0 {
        generate_rejection_analysis(&borrower, &failed)
    } else {
        (Vec::new(), Vec::new())
    };
    let dynamic_recommendations = generate_dynamic_recommendations(&borrower, &results, today);

    let response = EligibilityResponse {
        case_id: case.case_id.clone(),
        total_lenders_evaluated: results.len() as i64,
        lenders_passed: passed_count,
        results,
        rejection_reasons,
        suggested_actions,
        dynamic_recommendations,
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Load persisted results for a case, recomputing the advisory blocks.
pub(crate) async fn load_case_results(
    pool: &MySqlPool,
    case_uuid: &Uuid,
) -> ServiceResult<Vec<EligibilityResult>> {
    let rows = sqlx::query(
        "SELECT er.*, l.lender_name, lp.product_name
         FROM eligibility_results er
         INNER JOIN lender_products lp ON er.lender_product_id = lp.id
         INNER JOIN lenders l ON lp.lender_id = l.id
         WHERE er.case_id = ?
         ORDER BY er.result_rank IS NULL, er.result_rank,
                  er.eligibility_score IS NULL, er.eligibility_score DESC",
    )
    .bind(case_uuid.to_string())
    .fetch_all(pool)
    .await?;

    let mut results = Vec::with_capacity(rows.len());
    for row in &rows {
        let status: String = row.get("hard_filter_status");
        let details_raw: Option<String> = row.try_get("hard_filter_details").unwrap_or(None);
        let missing_raw: Option<String> = row.try_get("missing_for_improvement").unwrap_or(None);
        let probability: Option<String> = row.get("approval_probability");

        let details = details_raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<HardFilterDetails>(raw).ok())
            .unwrap_or_else(|| HardFilterDetails::Failures(Default::default()));

        results.push(EligibilityResult {
            lender_name: row.get("lender_name"),
            product_name: row.get("product_name"),
            hard_filter_status: HardFilterStatus::from_str(&status)
                .unwrap_or(HardFilterStatus::Fail),
            details,
            eligibility_score: row.get("eligibility_score"),
            approval_probability: probability
                .as_deref()
                .and_then(|value| ApprovalProbability::from_str(value).ok()),
            expected_ticket_min: row.get("expected_ticket_min"),
            expected_ticket_max: row.get("expected_ticket_max"),
            confidence: row.get("confidence"),
            missing_for_improvement: missing_raw
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            rank: row.get("result_rank"),
        });
    }

    Ok(results)
}

/// Persisted eligibility results with recomputed explainability.
pub async fn get_results(
    req: HttpRequest,
    case_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let mut results = load_case_results(&data.db_pool, &case.id).await?;
    if results.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "No eligibility results for case {}; run scoring first",
            case_id
        )));
    }

    let borrower = load_feature_vector(&data.db_pool, &case.id).await?;

    let passed_count = results
        .iter()
        .filter(|r| r.hard_filter_status == HardFilterStatus::Pass)
        .count() as i64;

    // Stale rows must still explain themselves: rebuild the pass payloads
    // and the advisory blocks from what we have.
    for result in results.iter_mut() {
        if result.hard_filter_status == HardFilterStatus::Pass {
            normalize_pass_details(result, borrower.as_ref());
        }
    }

    let (rejection_reasons, suggested_actions, dynamic_recommendations) = match &borrower {
        Some(borrower) => {
            let failed: Vec<EligibilityResult> = results
                .iter()
                .filter(|r| r.hard_filter_status == HardFilterStatus::Fail)
                .cloned()
                .collect();
            let (reasons, actions) = if passed_count == 0 && !failed.is_empty() {
                generate_rejection_analysis(borrower, &failed)
            } else {
                (Vec::new(), Vec::new())
            };
            let recommendations =
                generate_dynamic_recommendations(borrower, &results, Utc::now().date_naive());
            (reasons, actions, recommendations)
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let response = EligibilityResponse {
        case_id: case.case_id.clone(),
        total_lenders_evaluated: results.len() as i64,
        lenders_passed: passed_count,
        results,
        rejection_reasons,
        suggested_actions,
        dynamic_recommendations,
    };

    Ok(HttpResponse::Ok().json(response))
}
