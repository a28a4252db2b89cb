use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant renders as `{"detail": ..., "code": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// The document parser failed.
    #[error("Failed to parse resume: {0}")]
    Extraction(String),

    /// The completion service call failed.
    #[error("Error generating summary: {0}")]
    Completion(String),

    /// The completion came back but did not carry a usable fenced JSON block.
    #[error("Error generating summary: {0}")]
    ReplyFormat(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Extraction(_)
            | AppError::Completion(_)
            | AppError::ReplyFormat(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Completion(_) => "COMPLETION_ERROR",
            AppError::ReplyFormat(_) => "REPLY_FORMAT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let detail = match &self {
            AppError::Validation(_)
            | AppError::UnprocessableEntity(_)
            | AppError::PayloadTooLarge(_) => {
                tracing::warn!("{}: {}", code, self);
                self.to_string()
            }
            AppError::Extraction(_) | AppError::Completion(_) | AppError::ReplyFormat(_) => {
                tracing::error!("{}: {}", code, self);
                self.to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "detail": detail,
            "code": code,
        }));

        (status, body).into_response()
    }
}
