//! Lender knowledge base query handlers.
//!
//! Endpoints:
//!
//! - `GET /api/v1/lenders` - list lenders with product/pincode counts
//! - `GET /api/v1/lenders/stats` - knowledge base aggregate figures
//! - `GET /api/v1/lenders/{lender_id}` - lender detail
//! - `GET /api/v1/lenders/{lender_id}/products` - policy rows
//! - `GET /api/v1/lenders/by-pincode/{pincode}` - lenders covering a pincode
//! - `GET /api/v1/lenders/pincode-coverage/{pincode}` - coverage check
//!
//! The knowledge base is read-mostly: ingestion runs offline through the
//! `ingest_lenders` binary, and readers never block on it.

use actix_web::{web, HttpResponse};
use log::debug;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::lender::product_rule_from_row;
use crate::AppState;
use shared::dtos::{KnowledgeBaseStats, LenderSummary};

fn validate_pincode(pincode: &str) -> ServiceResult<()> {
    if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::Validation(format!(
            "invalid pincode: {}",
            pincode
        )));
    }
    Ok(())
}

/// Lenders with product and pincode counts, active first.
pub async fn list_lenders(data: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders");

    let rows = sqlx::query(
        "SELECT
            l.id, l.lender_name, l.lender_code, l.is_active,
            COUNT(DISTINCT lp.id) AS product_count,
            COUNT(DISTINCT lpc.id) AS pincode_count
         FROM lenders l
         LEFT JOIN lender_products lp ON lp.lender_id = l.id
         LEFT JOIN lender_pincodes lpc ON lpc.lender_id = l.id
         GROUP BY l.id, l.lender_name, l.lender_code, l.is_active
         ORDER BY l.is_active DESC, l.lender_name",
    )
    .fetch_all(&data.db_pool)
    .await?;

    let mut lenders = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: String = row.get("id");
        lenders.push(LenderSummary {
            id: Uuid::parse_str(&id)
                .map_err(|e| ServiceError::Internal(format!("bad lender id: {}", e)))?,
            lender_name: row.get("lender_name"),
            lender_code: row.get("lender_code"),
            is_active: row.get("is_active"),
            product_count: row.get("product_count"),
            pincode_count: row.get("pincode_count"),
        });
    }

    Ok(HttpResponse::Ok().json(lenders))
}

/// Aggregate knowledge base figures.
pub async fn knowledge_base_stats(data: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders/stats");

    let row = sqlx::query(
        "SELECT
            (SELECT COUNT(*) FROM lenders) AS lender_count,
            (SELECT COUNT(*) FROM lender_products) AS product_count,
            (SELECT COUNT(*) FROM lender_products WHERE policy_available = TRUE) AS products_with_policy,
            (SELECT COUNT(*) FROM lender_pincodes) AS pincode_count",
    )
    .fetch_one(&data.db_pool)
    .await?;

    let stats = KnowledgeBaseStats {
        lender_count: row.get("lender_count"),
        product_count: row.get("product_count"),
        products_with_policy: row.get("products_with_policy"),
        pincode_count: row.get("pincode_count"),
    };

    Ok(HttpResponse::Ok().json(stats))
}

/// Lender detail with its policy rows.
pub async fn get_lender(
    lender_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders/{}", lender_id);

    let lender = sqlx::query("SELECT id, lender_name, lender_code, is_active FROM lenders WHERE id = ?")
        .bind(lender_id.as_str())
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Lender {} not found", lender_id)))?;

    let products = load_lender_products(&data, lender_id.as_str()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": lender.get::<String, _>("id"),
        "lender_name": lender.get::<String, _>("lender_name"),
        "lender_code": lender.get::<String, _>("lender_code"),
        "is_active": lender.get::<bool, _>("is_active"),
        "products": products,
    })))
}

async fn load_lender_products(
    data: &AppState,
    lender_id: &str,
) -> ServiceResult<Vec<shared::dtos::LenderProductRule>> {
    let rows = sqlx::query(
        "SELECT lp.*, l.lender_name
         FROM lender_products lp
         INNER JOIN lenders l ON lp.lender_id = l.id
         WHERE lp.lender_id = ?
         ORDER BY lp.product_name",
    )
    .bind(lender_id)
    .fetch_all(&data.db_pool)
    .await?;

    let mut products = Vec::with_capacity(rows.len());
    for row in &rows {
        products.push(product_rule_from_row(row)?);
    }
    Ok(products)
}

/// Policy rows for one lender.
pub async fn get_lender_products(
    lender_id: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders/{}/products", lender_id);
    let products = load_lender_products(&data, lender_id.as_str()).await?;
    Ok(HttpResponse::Ok().json(products))
}

/// Lenders that service a pincode.
pub async fn find_lenders_by_pincode(
    pincode: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders/by-pincode/{}", pincode);
    validate_pincode(&pincode)?;

    let rows = sqlx::query(
        "SELECT DISTINCT l.id, l.lender_name
         FROM lender_pincodes lpc
         INNER JOIN lenders l ON lpc.lender_id = l.id
         WHERE lpc.pincode = ? AND l.is_active = TRUE
         ORDER BY l.lender_name",
    )
    .bind(pincode.as_str())
    .fetch_all(&data.db_pool)
    .await?;

    let lenders: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "id": row.get::<String, _>("id"),
                "lender_name": row.get::<String, _>("lender_name"),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(lenders))
}

/// Quick serviceability check for a pincode.
pub async fn check_pincode_coverage(
    pincode: web::Path<String>,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    debug!("GET /api/v1/lenders/pincode-coverage/{}", pincode);
    validate_pincode(&pincode)?;

    let row = sqlx::query(
        "SELECT COUNT(DISTINCT lender_id) AS lender_count FROM lender_pincodes WHERE pincode = ?",
    )
    .bind(pincode.as_str())
    .fetch_one(&data.db_pool)
    .await?;

    let lender_count: i64 = row.get("lender_count");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "pincode": pincode.as_str(),
        "covered": lender_count > 0,
        "lender_count": lender_count,
    })))
}
