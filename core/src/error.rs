//! Error types for the todo API client.
//!
//! `NotFound` and `Validation` get dedicated variants because callers act on
//! them. All other unexpected responses land in `HttpError` with the raw
//! status code and body.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404; the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned 400 with field-keyed messages.
    #[error("validation failed: {errors:?}")]
    Validation { errors: BTreeMap<String, Vec<String>> },

    /// Any other unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}
