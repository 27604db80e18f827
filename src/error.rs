//! Error types for the MEMS server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes reported to clients alongside the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    StorageFailure = 3,
    NotFound = 4,
    BadValue = 5,
    Conflict = 6,
    AlreadySignedIn = 7,
    NotSignedIn = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("User {0} is already signed in to this equipment")]
    AlreadySignedIn(String),

    #[error("User {0} is not signed in to this equipment")]
    NotSignedIn(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            match db.code().as_deref() {
                // lock_not_available: row lock not granted within lock_timeout
                Some("55P03") => {
                    return AppError::Conflict(
                        "Record is locked by a concurrent request".to_string(),
                    )
                }
                // deadlock_detected, serialization_failure
                Some("40P01") | Some("40001") => {
                    return AppError::Conflict("Concurrent update, try again".to_string())
                }
                Some("23505") => {
                    return AppError::Conflict("Record already exists".to_string())
                }
                _ => {}
            }
        }
        AppError::Storage(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::AlreadySignedIn(_) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadySignedIn, self.to_string())
            }
            AppError::NotSignedIn(_) => {
                (StatusCode::CONFLICT, ErrorCode::NotSignedIn, self.to_string())
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::StorageFailure,
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signin_errors_are_conflicts() {
        for err in [
            AppError::AlreadySignedIn("u1".into()),
            AppError::NotSignedIn("u1".into()),
            AppError::Conflict("busy".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_storage_error_hides_detail() {
        let response = AppError::Storage("connection reset".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotSignedIn("u1".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Forbidden("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Validation("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
