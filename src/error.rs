//! Error types shared by the store, the auth service and the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure of a template store call
///
/// Calls are single-shot: the caller reports the error and keeps its prior
/// state, nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// redb reports each stage with its own error type; all of them fold into
// `redb::Error`.
macro_rules! fold_redb_errors {
    (@one $target:ty, $source:ty, $err:ident, $body:expr) => {
        impl From<$source> for $target {
            fn from($err: $source) -> Self {
                $body
            }
        }
    };
    ($target:ty, |$err:ident| $body:expr) => {
        fold_redb_errors!(@one $target, redb::TransactionError, $err, $body);
        fold_redb_errors!(@one $target, redb::TableError, $err, $body);
        fold_redb_errors!(@one $target, redb::StorageError, $err, $body);
        fold_redb_errors!(@one $target, redb::CommitError, $err, $body);
    };
}

fold_redb_errors!(StoreError, |err| StoreError::Database(err.into()));

/// Failure of an auth service call
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Session expired or missing")]
    NoSession,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

fold_redb_errors!(AuthError, |err| AuthError::Store(StoreError::Database(err.into())));

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Store(err.into())
    }
}

/// Error returned by HTTP handlers
///
/// Renders as `{ "error": <message>, "code": <code> }` with a matching
/// status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Store(err) => classify_store_error(err),
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::NoSession => {
                    (StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
                }
                AuthError::EmailTaken => (StatusCode::CONFLICT, "conflict", err.to_string()),
                AuthError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
                }
                AuthError::Hashing(msg) => {
                    tracing::error!(error = %msg, "Password hashing failed");
                    internal_error()
                }
                AuthError::Store(store) => classify_store_error(store),
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": code,
            })),
        )
            .into_response()
    }
}

fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
        StoreError::Database(db_err) => {
            tracing::error!(error = %db_err, "Database error");
            internal_error()
        }
        StoreError::Serialization(serde_err) => {
            tracing::error!(error = %serde_err, "Corrupt template row");
            internal_error()
        }
    }
}

fn internal_error() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred".to_string(),
    )
}
