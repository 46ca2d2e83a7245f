//! Error types for the locallens application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during article persistence and relay operations, along with
//! the mapping from each failure onto an HTTP response.

use std::{io, path::PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// The main error type for the locallens application.
#[derive(Error, Debug)]
pub enum LensError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to zip operations during snapshots.
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// A required request field was absent or empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// Article was not found when performing an operation. Also covers
    /// ownership mismatches, so a caller cannot probe for another tenant's
    /// records.
    #[error("Article not found: {id}")]
    ArticleNotFound { id: String },

    /// Geocoding produced no results for the given query.
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    /// A third-party provider request failed.
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// A relay endpoint was called without its provider API key configured.
    #[error("{message}")]
    Unconfigured { message: String },

    /// Errors related to snapshot operations.
    #[error("Snapshot failed: {message}")]
    SnapshotFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}

impl IntoResponse for LensError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LensError::MissingField { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            LensError::ArticleNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Article not found".to_string())
            }
            LensError::LocationNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Location not found".to_string())
            }
            // Everything else is an internal fault: log the real cause and
            // answer with a generic message so no store or provider detail
            // reaches the caller.
            _ => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
