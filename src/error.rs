use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Single detail string for punches that are missing or outside the caller's
/// scope, so the two cases cannot be told apart.
pub const PUNCH_NOT_FOUND: &str = "punch not found or out of scope";

#[derive(Debug, Display, PartialEq)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", PUNCH_NOT_FOUND)]
    NotFoundOrForbidden,

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "invalid punch type '{}', expected one of: in, out, break_start, break_end", _0)]
    InvalidPunchType(String),

    /// Business-rule rejection reported by the store, message passed through.
    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    Internal(String),
}

/// Body of every error response.
#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "error": "validation_error",
    "detail": "id is required"
}))]
pub struct ErrorResponse {
    /// Machine-readable error kind
    pub error: &'static str,
    /// Human-readable detail
    pub detail: String,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) | AppError::NotFoundOrForbidden => "not_found",
            AppError::Validation(_) | AppError::InvalidPunchType(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidPunchType(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.kind(),
            detail: self.to_string(),
        })
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(message) => AppError::Conflict(message),
            // The driver error is logged by the adapter; callers get no internals.
            StoreError::Backend(_) => AppError::Internal("Internal Server Error".to_string()),
        }
    }
}
