//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::fx::FxError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Currency conversion errors
    #[error(transparent)]
    Fx(#[from] FxError),

    // Persistence errors
    #[error(transparent)]
    Store(#[from] StoreError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(e))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::MissingHeader(header) => (
                StatusCode::BAD_REQUEST,
                "missing_header",
                Some(header.clone()),
            ),

            // Domain errors - map per taxonomy
            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_failed", Some(msg.clone()))
                }
                DomainError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(domain_err.to_string()),
                ),
                DomainError::EntityNotActive { .. } => (
                    StatusCode::BAD_REQUEST,
                    "entity_not_active",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvestmentNotActive { .. } => (
                    StatusCode::BAD_REQUEST,
                    "investment_not_active",
                    Some(domain_err.to_string()),
                ),
                DomainError::EntityNotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvestmentNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    Some(domain_err.to_string()),
                ),
                DomainError::InvariantViolation(msg) => {
                    tracing::error!("Invariant violation: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "invariant_violation",
                        None,
                    )
                }
            },

            // Conversion errors
            AppError::Fx(fx_err) => match fx_err {
                FxError::UnsupportedCurrency(code) => (
                    StatusCode::BAD_REQUEST,
                    "unsupported_currency",
                    Some(code.clone()),
                ),
                FxError::Upstream(e) => {
                    tracing::warn!("FX upstream error: {}", e);
                    (StatusCode::SERVICE_UNAVAILABLE, "fx_unavailable", None)
                }
                FxError::Malformed(msg) => {
                    tracing::error!("FX payload error: {}", msg);
                    (StatusCode::SERVICE_UNAVAILABLE, "fx_unavailable", None)
                }
            },

            // Persistence errors
            AppError::Store(store_err) => {
                if store_err.is_transient() {
                    tracing::warn!("Transient store error: {:?}", store_err);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "transient_store_error",
                        Some("retry later".to_string()),
                    )
                } else {
                    tracing::error!("Store error: {:?}", store_err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
                }
            }

            // 500 Internal Server Error
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
