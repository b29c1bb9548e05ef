// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Every variant maps to a stable machine-readable `kind` in the response
/// body so clients can branch on it without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // 500 Internal Server Error
    Internal(String),

    // 400 Bad Request: malformed or missing input
    Validation(String),

    // 400 Bad Request: the username "me" is reserved for the profile endpoint
    ReservedUsername,

    // 400 Bad Request: username/email already held by a different identity
    DuplicateIdentity(String),

    // 400 Bad Request: category/genre slug already taken
    DuplicateSlug(String),

    // 400 Bad Request: the author already reviewed this title
    DuplicateReview,

    // 400 Bad Request: confirmation code does not match
    InvalidCode,

    // 400 Bad Request: a referenced slug does not resolve
    UnknownReference(String),

    // 401 Unauthorized: missing or invalid credentials
    AuthError(String),

    // 403 Forbidden: authenticated but not allowed
    PermissionDenied(String),

    // 404 Not Found
    NotFound(String),
}

impl AppError {
    /// Stable error kind exposed to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::Validation(_) => "validation",
            AppError::ReservedUsername => "username_reserved",
            AppError::DuplicateIdentity(_) => "duplicate_identity",
            AppError::DuplicateSlug(_) => "duplicate_slug",
            AppError::DuplicateReview => "duplicate_review",
            AppError::InvalidCode => "invalid_code",
            AppError::UnknownReference(_) => "unknown_reference",
            AppError::AuthError(_) => "unauthorized",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::NotFound(_) => "not_found",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                // Details stay in the logs; clients only get a generic message.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ReservedUsername => (
                StatusCode::BAD_REQUEST,
                "Username 'me' is reserved".to_string(),
            ),
            AppError::DuplicateIdentity(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DuplicateSlug(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DuplicateReview => (
                StatusCode::BAD_REQUEST,
                "You have already reviewed this title".to_string(),
            ),
            AppError::InvalidCode => (
                StatusCode::BAD_REQUEST,
                "Invalid confirmation code".to_string(),
            ),
            AppError::UnknownReference(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Internal`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}
