use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::repo::StoreError;

/// Errors surfaced to HTTP callers. Every variant renders as `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username or email already exists")]
    DuplicateCredential,

    #[error("Invalid password")]
    AuthenticationFailure,

    #[error("password generation failed: {0:#}")]
    CredentialGeneration(anyhow::Error),

    #[error("storage unavailable: {0:#}")]
    StorageUnavailable(anyhow::Error),

    #[error("reasoning engine failed: {0:#}")]
    ReasoningFailure(anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateCredential => StatusCode::CONFLICT,
            ApiError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            ApiError::CredentialGeneration(_)
            | ApiError::StorageUnavailable(_)
            | ApiError::ReasoningFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::CredentialGeneration(_) => "Password generation failed".into(),
            ApiError::StorageUnavailable(_) => "Database connection failed".into(),
            ApiError::ReasoningFailure(_) => "Query processing failed".into(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateCredential => ApiError::DuplicateCredential,
            StoreError::Hashing(inner) => ApiError::CredentialGeneration(inner),
            StoreError::Unavailable(inner) => ApiError::StorageUnavailable(inner),
        }
    }
}

/// Undecodable or wrongly typed bodies are client input errors, reported as JSON.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
