//! Shared error and result types.

use hyper::StatusCode;
use thiserror::Error;

use crate::domain::TransitionError;

/// Top-level error type for the gateway.
///
/// Route handlers translate every variant to exactly one HTTP status and a
/// stable machine-readable code; no other layer maps errors to responses.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// Malformed or missing request fields (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials (401)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist or is soft-deleted (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// State or uniqueness conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Workflow transition rejected by the transition table
    #[error(transparent)]
    Workflow(#[from] TransitionError),

    /// Store failure (500, detail logged server-side)
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else unexpected (500, detail logged server-side)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, TrellisError>;

impl TrellisError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            TrellisError::Validation(_) => StatusCode::BAD_REQUEST,
            TrellisError::Auth(_) => StatusCode::UNAUTHORIZED,
            TrellisError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrellisError::NotFound(_) => StatusCode::NOT_FOUND,
            TrellisError::Conflict(_) => StatusCode::CONFLICT,
            TrellisError::Workflow(TransitionError::InvalidTransition { .. }) => {
                StatusCode::CONFLICT
            }
            TrellisError::Workflow(TransitionError::MissingRequiredField { .. }) => {
                StatusCode::BAD_REQUEST
            }
            TrellisError::Database(_) | TrellisError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            TrellisError::Validation(_) => "VALIDATION",
            TrellisError::Auth(_) => "AUTH",
            TrellisError::Forbidden(_) => "FORBIDDEN",
            TrellisError::NotFound(_) => "NOT_FOUND",
            TrellisError::Conflict(_) => "CONFLICT",
            TrellisError::Workflow(TransitionError::InvalidTransition { .. }) => {
                "INVALID_TRANSITION"
            }
            TrellisError::Workflow(TransitionError::MissingRequiredField { .. }) => {
                "MISSING_REQUIRED_FIELD"
            }
            TrellisError::Database(_) => "UPSTREAM",
            TrellisError::Internal(_) => "INTERNAL",
        }
    }

    /// Message safe to return to clients. Outside dev mode, 5xx detail stays
    /// in the server log.
    pub fn public_message(&self, dev_mode: bool) -> String {
        match self {
            TrellisError::Database(_) | TrellisError::Internal(_) if !dev_mode => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// True for errors that warrant a server-side error log.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TransitionError, VentureStatus};

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            TrellisError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrellisError::Auth("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TrellisError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TrellisError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TrellisError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TrellisError::Database("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            TrellisError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_transition_is_a_conflict() {
        let err = TrellisError::from(TransitionError::InvalidTransition {
            from: VentureStatus::Draft,
            to: VentureStatus::Approved,
            role: Role::Entrepreneur,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let err = TrellisError::from(TransitionError::MissingRequiredField {
            field: "venture_partner",
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "MISSING_REQUIRED_FIELD");
    }

    #[test]
    fn server_error_detail_is_scrubbed_in_production() {
        let err = TrellisError::Database("connection pool exhausted".into());
        assert_eq!(err.public_message(false), "internal error");
        assert!(err.public_message(true).contains("connection pool"));

        // Client errors keep their detail either way
        let err = TrellisError::Validation("name is required".into());
        assert!(err.public_message(false).contains("name is required"));
    }
}
