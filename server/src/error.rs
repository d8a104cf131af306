//! Error types for the HTTP layer and the server entry point.
//!
//! # Design
//! `ApiError` is what handlers return; its `IntoResponse` impl owns the
//! status-code mapping. Validation problems are field-keyed, everything else
//! is reported as `{"detail": "..."}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error};
use serde_json::json;
use thiserror::Error;

use crate::model::ValidationErrors;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields failed validation.
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),

    /// The body was not usable JSON for this resource.
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Constraint(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }

        let body = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Malformed(detail) => json!({ "detail": detail }),
            ApiError::NotFound => json!({ "detail": "Not found." }),
            ApiError::Store(StoreError::Constraint(detail)) => json!({ "detail": detail }),
            ApiError::Store(StoreError::Unavailable(_)) => {
                json!({ "detail": "Service temporarily unavailable." })
            }
            ApiError::Store(StoreError::Database(_)) => json!({ "detail": "Internal server error." }),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
