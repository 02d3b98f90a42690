//! API route definitions.
//!
//! This module organizes all HTTP routes for the Quakeboard API server.

mod feeds;
mod health;
mod rankings;
mod snapshot;

pub use feeds::feeds_routes;
pub use health::health_routes;
pub use rankings::rankings_routes;
pub use snapshot::snapshot_routes;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Error response shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code.
    pub error: String,
    /// Detailed error message.
    pub message: String,
    /// Per-item failures (for batch requests).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ValidationErrorDetail>,
}

/// Validation failure of one item in a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Index in the batch (0 for single requests).
    pub index: usize,
    /// Error message.
    pub message: String,
}

/// Status code paired with an error body, as returned by handlers.
pub type ApiFailure = (StatusCode, Json<ApiError>);

impl ApiError {
    /// Builds an error response with the given status.
    pub fn response(
        status: StatusCode,
        error: &str,
        message: impl Into<String>,
    ) -> ApiFailure {
        (
            status,
            Json(Self {
                error: error.to_string(),
                message: message.into(),
                details: Vec::new(),
            }),
        )
    }

    /// 500 response for a failed store access.
    pub fn storage(err: &impl std::fmt::Display) -> ApiFailure {
        tracing::error!(error = %err, "Store access failed");
        Self::response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            err.to_string(),
        )
    }

    /// 422 response listing every rejected item.
    pub fn validation(details: Vec<ValidationErrorDetail>, noun: &str) -> ApiFailure {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Self {
                error: "validation_failed".to_string(),
                message: format!("{} {noun}(s) failed validation", details.len()),
                details,
            }),
        )
    }
}

/// Maps a JSON extractor rejection to an error response, keeping its status.
pub fn json_rejection(rejection: &JsonRejection) -> ApiFailure {
    ApiError::response(rejection.status(), "invalid_json", rejection.body_text())
}

/// Request body that carries either one item or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item.
    Single(T),
    /// A batch of items.
    Batch(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flattens the request into a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(item) => vec![item],
            Self::Batch(items) => items,
        }
    }
}
