//! HTTP-facing error type and its `IntoResponse`/`From` conversions (spec §7
//! "Error handling design").
//!
//! Grounded in `gglib-axum/src/error.rs`'s `HttpError` shape (JSON error
//! body, one `From` impl per upstream error enum), narrowed to this
//! service's three endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use dialvox_core::CoreError;
use dialvox_voice::VoiceError;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(msg) => Self::Internal(format!("config: {msg}")),
            CoreError::Validation(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<VoiceError> for HttpError {
    fn from(err: VoiceError) -> Self {
        match &err {
            VoiceError::TransientUpstream { .. } => Self::ServiceUnavailable(err.to_string()),
            VoiceError::Protocol(_) => Self::BadRequest(err.to_string()),
            VoiceError::ResourceExhausted { .. } => Self::ServiceUnavailable(err.to_string()),
            VoiceError::Fatal(_) | VoiceError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}
