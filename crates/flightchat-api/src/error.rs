//! API error types and JSON error response formatting.
//!
//! Every endpoint fails with the same body shape:
//! `{"error": "<code>", "message": "<text>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flightchat_chat::ChatError;
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 - missing or invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// 404 - unknown session or artifact.
    #[error("{0}")]
    NotFound(String),
    /// 422 - well-formed but unacceptable input, such as an oversized message.
    #[error("{0}")]
    UnprocessableEntity(String),
    /// 500 - wiring or invariant failure.
    #[error("{0}")]
    Internal(String),
    /// 503 - a required provider could not produce a result.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::UnprocessableEntity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => ApiError::BadRequest(err.to_string()),
            ChatError::MessageTooLong(_) => ApiError::UnprocessableEntity(err.to_string()),
            ChatError::SessionNotFound(_) | ChatError::Artifact(_) => {
                ApiError::NotFound(err.to_string())
            }
            ChatError::Voice(_) => ApiError::ServiceUnavailable(err.to_string()),
            ChatError::Fatal(_) => ApiError::Internal(err.to_string()),
        }
    }
}
