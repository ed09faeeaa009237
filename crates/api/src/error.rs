use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use hookflow_core::error::CoreError;
use hookflow_onchain::error::OnchainError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain error types and implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A subscription or delivery error from the onchain engine.
    #[error(transparent)]
    Onchain(#[from] OnchainError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A missing resource with a non-numeric identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid caller identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => core_response(core),

            AppError::Onchain(err) => match err {
                OnchainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                OnchainError::Auth(msg) => {
                    tracing::error!(error = %msg, "Provider authentication failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_AUTH",
                        "Provider rejected our credentials".to_string(),
                    )
                }
                OnchainError::Provider(msg) => {
                    tracing::error!(error = %msg, "Provider failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_ERROR",
                        "Provider request failed".to_string(),
                    )
                }
                OnchainError::Decode(msg) => {
                    (StatusCode::BAD_REQUEST, "DECODE_ERROR", msg.clone())
                }
                OnchainError::Core(core) => core_response(core),
            },

            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a [`CoreError`] to status, code, and message.
fn core_response(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::MissingVariable(msg) => (
            StatusCode::BAD_REQUEST,
            "MISSING_VARIABLE",
            format!("Variable not found: {msg}"),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
