use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ingest::IngestError;
use crate::session::controller::TurnError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A turn is already in progress for this session")]
    TurnInProgress,

    #[error("The conversation has concluded")]
    SessionConcluded,

    #[error("The turn was cancelled")]
    TurnCancelled,

    #[error("Completion service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TurnError> for AppError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::EmptyInput => AppError::Validation(err.to_string()),
            TurnError::Concluded => AppError::SessionConcluded,
            TurnError::Cancelled => AppError::TurnCancelled,
            TurnError::ServiceUnavailable(e) => AppError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::TurnInProgress => (
                StatusCode::CONFLICT,
                "TURN_IN_PROGRESS",
                "Please wait for the assistant to answer before sending another message"
                    .to_string(),
            ),
            AppError::SessionConcluded => (
                StatusCode::CONFLICT,
                "SESSION_CONCLUDED",
                "This conversation has concluded".to_string(),
            ),
            AppError::TurnCancelled => (
                StatusCode::CONFLICT,
                "TURN_CANCELLED",
                "The message was cancelled; nothing was recorded".to_string(),
            ),
            AppError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("The file is too large. The maximum upload size is {limit} bytes."),
            ),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Completion service error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The assistant is unavailable right now. Your information is safe; please send your message again.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::CompletionError;

    #[test]
    fn test_turn_errors_map_to_statuses() {
        let cases = [
            (TurnError::EmptyInput, StatusCode::BAD_REQUEST),
            (TurnError::Concluded, StatusCode::CONFLICT),
            (TurnError::Cancelled, StatusCode::CONFLICT),
            (
                TurnError::ServiceUnavailable(CompletionError::EmptyContent),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
