//! Error types for the Trash2Cash API service
//!
//! One enum covers the request-level taxonomy: validation, authorization,
//! state-conflict, not-found, domain invariant violations and internal
//! failures, each with a fixed HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for the t2c-api service
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors bubbled up from the common crate (config, db init)
    #[error(transparent)]
    Common(#[from] t2c_common::Error),

    /// Missing or malformed request fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Acting on another user's resource
    #[error("Not authorised: {0}")]
    Forbidden(String),

    /// Valid request against the wrong state (already booked, not Booked,
    /// insufficient points, arrival already recorded)
    #[error("{0}")]
    Conflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Domain invariant violation (e.g. arrival time on a drop-off);
    /// distinct from ordinary validation failures and never recovered
    #[error("Domain invariant violated: {0}")]
    Domain(String),

    /// Email dispatch failure; logged at call sites, never rolls back the
    /// triggering state transition
    #[error("Email dispatch failed: {0}")]
    Email(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the t2c-api Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status for this error per the request-level taxonomy
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::BAD_REQUEST,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Common(t2c_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Common(t2c_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            Error::InvalidInput("missing field".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Conflict("already booked".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Forbidden("not yours".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::NotFound("appointment".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Domain("arrival time on drop-off".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
