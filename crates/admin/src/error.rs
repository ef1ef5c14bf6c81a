//! Service-level error type and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::dto::FieldError;

/// Errors returned by the client and auth services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Lookup by id (or email) found nothing.
    #[error("Object not found! Id: {id}, Type: {kind}")]
    NotFound { kind: &'static str, id: String },

    /// The store refused a change because other records depend on it.
    #[error("Integrity conflict: {0}")]
    IntegrityConflict(String),

    /// Malformed request parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more DTO fields failed validation.
    #[error("Validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Email/password pair did not match a client.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The password hasher failed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// Any other store failure, passed through untouched.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Shorthand for a missing entity.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::IntegrityConflict(_) => StatusCode::CONFLICT,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::PasswordHash | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Client service error");
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::PasswordHash | Self::Repository(_) => {
                json!({ "status": status.as_u16(), "error": "Internal server error" })
            }
            Self::Validation(errors) => json!({
                "status": status.as_u16(),
                "error": "Validation error",
                "errors": errors,
            }),
            _ => json!({ "status": status.as_u16(), "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
