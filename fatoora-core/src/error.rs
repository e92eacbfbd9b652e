use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::render::RenderError;
use crate::store::StoreError;

/// Application-level error returned by the invoice service and handlers.
///
/// Each variant maps to exactly one HTTP status and a stable error code
/// so clients can branch on the code rather than the message text.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invoice or client absent, or owned by another team.
    #[error("{0}")]
    NotFound(String),

    /// A referenced client does not belong to the caller's team.
    #[error("{0}")]
    InvalidReference(String),

    /// Well-formed request carrying a value the operation rejects.
    #[error("{0}")]
    InvalidInput(String),

    /// Request body or query could not be parsed into the expected shape.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Storage-level uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// The caller's user or team could not be provisioned.
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Rendering failed: {0}")]
    Rendering(#[from] RenderError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidReference(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Provisioning(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Rendering(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidReference(_) => "INVALID_REFERENCE",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Provisioning(_) => "PROVISIONING_FAILED",
            AppError::Rendering(_) => "RENDERING_FAILED",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Backend details stay in the logs.
        let message = match &self {
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                "Database error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
            AppError::Rendering(err) => {
                tracing::error!("PDF rendering failed: {}", err);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: self.error_code(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
