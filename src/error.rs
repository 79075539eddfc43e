//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Postgres SQLSTATE codes translated into conflicts
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Domain errors (4xx)
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

}

impl From<sqlx::Error> for AppError {
    /// Constraint violations raised by racing writers surface as conflicts
    /// instead of opaque 500s.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Domain(DomainError::conflict("Resource already exists"));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::Domain(DomainError::conflict(
                        "Resource is referenced by other records",
                    ));
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl From<JsonRejection> for AppError {
    /// Unreadable request bodies are input errors, reported like any other
    /// failed validation.
    fn from(rejection: JsonRejection) -> Self {
        AppError::Domain(DomainError::validation(rejection.body_text()))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AppError::Domain(domain_err) => {
                let status = match domain_err {
                    DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                    DomainError::Conflict(_) => StatusCode::CONFLICT,
                    DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                    DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                };
                (status, domain_err.code())
            }

            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),

            // 500 Internal Server Error; the request span carries the correlation id
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        assert_eq!(status_of(DomainError::validation("x").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::conflict("x").into()), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::forbidden("x").into()), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DomainError::not_found("x").into()), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unexpected_errors_are_opaque() {
        let err = AppError::Internal("connection reset".to_string());
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_domain_message_is_passed_through() {
        let err: AppError = DomainError::validation("Invalid type").into();
        assert_eq!(err.to_string(), "Invalid type");
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }
}
