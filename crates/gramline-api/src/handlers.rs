//! API handlers

pub mod accounts;
pub mod campaigns;
pub mod customers;
pub mod groups;
pub mod health;
pub mod logs;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a database failure onto a 500 response
pub(crate) fn internal_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal_error".to_string(),
            message: context.to_string(),
        }),
    )
}

/// Map a domain error onto its HTTP status
pub(crate) fn domain_error(e: gramline_common::Error) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.code().to_lowercase(),
            message: e.to_string(),
        }),
    )
}

/// 404 with a consistent body
pub(crate) fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            message: format!("{} not found", what),
        }),
    )
}

pub(crate) fn default_limit() -> i64 {
    50
}
