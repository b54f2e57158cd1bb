//! Service error taxonomy.
//!
//! Handlers return `ServiceError` and let the `ResponseError` impl translate
//! it into the JSON envelope used across the API:
//! `{"error": {"code": "...", "message": "..."}}`.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input: bad case id, oversized upload, unsupported
    /// extension, invalid pincode. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Unknown case, document, lender, or report.
    #[error("{0}")]
    NotFound(String),

    /// A request arrived while the case is in a state that cannot serve it,
    /// e.g. extraction triggered with jobs still queued.
    #[error("{0}")]
    Conflict(String),

    /// A downstream collaborator (OCR, bank parser, GST authority, LLM)
    /// failed. Callers with fallbacks handle this before it surfaces.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// Database or storage unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Dependency(_) => "DEPENDENCY_FAILURE",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl actix_web::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string()
            }
        }))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("row not found".to_string()),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("serialization: {}", err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
