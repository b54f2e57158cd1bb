//! API handlers module.
//!
//! Each submodule holds the handlers for one resource: cases, uploads,
//! extraction, eligibility, lenders, and reports.

pub mod cases;
pub mod eligibility;
pub mod extraction;
pub mod lenders;
pub mod reports;
pub mod uploads;

use actix_web::HttpRequest;
use uuid::Uuid;

use crate::error::ServiceError;

/// Operator identity from the `X-User-Id` header.
///
/// Authentication itself is handled upstream (an auth proxy in deployment);
/// this layer only scopes data access by the asserted operator id.
pub fn operator_id(req: &HttpRequest) -> Result<Uuid, ServiceError> {
    let header = req
        .headers()
        .get("X-User-Id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Validation("missing X-User-Id header".to_string()))?;

    Uuid::parse_str(header)
        .map_err(|_| ServiceError::Validation("X-User-Id must be a UUID".to_string()))
}
