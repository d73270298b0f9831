//! Errors returned to HTTP clients.

use crate::auth::AuthError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    /// Error code for programmatic handling.
    pub code: &'static str,
    pub detail: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("API key is required")]
    MissingCredential,

    #[error("Invalid API key")]
    InvalidCredential,

    #[error("File is required")]
    MissingPayload,

    #[error("Payload exceeds the maximum upload size")]
    PayloadTooLarge,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("{0}")]
    Validation(String),

    /// Storage failed. The message is generic; details are logged where the error is raised.
    #[error("{0}")]
    Persistence(&'static str),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::MissingPayload => "missing_payload",
            Self::PayloadTooLarge => "payload_too_large",
            Self::MalformedRequest(_) => "malformed_request",
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential => StatusCode::BAD_REQUEST,
            Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::MissingPayload => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ServiceError::MissingCredential,
            AuthError::InvalidCredential => ServiceError::InvalidCredential,
            AuthError::Store(e) => {
                tracing::error!(error = %e, "API key lookup failed");
                ServiceError::Persistence("Failed to validate API key")
            }
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error",
            code: self.code(),
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
