//! HTTP error type
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`,
//! optionally with the validation report that caused it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use esrs_calc::ixbrl::ExportError;
use esrs_calc::ValidationReport;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or unknown API key (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Absent, or owned by another tenant (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// State conflict, e.g. exhausted voucher or closed session (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Well-formed but semantically invalid input (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Wizard data that failed validation (422)
    #[error("Validation failed")]
    Validation(ValidationReport),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<esrs_common::Error> for ApiError {
    fn from(err: esrs_common::Error) -> Self {
        use esrs_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::Unprocessable(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Calculation(e) => ApiError::Unprocessable(e.to_string()),
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal("An internal error occurred".to_string())
            }
        }
    }
}

impl From<esrs_calc::CalcError> for ApiError {
    fn from(err: esrs_calc::CalcError) -> Self {
        ApiError::Unprocessable(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidInput(msg) => ApiError::Unprocessable(msg),
            other => {
                error!(error = ?other, "Disclosure export failed: {}", other);
                ApiError::Internal("Disclosure export failed".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, report) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg, None)
            }
            ApiError::Validation(report) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                format!("{} validation error(s)", report.errors.len()),
                Some(report),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(report) = report {
            error["validation"] = json!(report);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
