/// Unified error types for the user service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Registration with an email that already has an account
    #[error("Email {0} is already registered")]
    EmailTaken(String),

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Login attempt against a soft-deleted account
    #[error("Account is inactive")]
    AccountInactive,

    /// Password login against an account with no password set
    #[error("Password login is not available for this account")]
    PasswordLoginUnavailable,

    /// Federated identity token rejected by the verifier
    #[error("Invalid federated token: {0}")]
    InvalidFederatedToken(String),

    /// Federated login attempt against an account that disallows it
    #[error("Google login is not enabled for this account")]
    FederatedLoginDisabled,

    /// Bearer token missing, malformed, or carrying a bad signature
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Bearer token with a valid signature but elapsed expiry
    #[error("Token has expired")]
    ExpiredToken,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Owner-only access violations
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: u16,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::EmailTaken(_) => (
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                self.to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                self.to_string(),
            ),
            ApiError::AccountInactive => (
                StatusCode::FORBIDDEN,
                "ACCOUNT_INACTIVE",
                self.to_string(),
            ),
            ApiError::PasswordLoginUnavailable => (
                StatusCode::BAD_REQUEST,
                "PASSWORD_LOGIN_UNAVAILABLE",
                self.to_string(),
            ),
            ApiError::InvalidFederatedToken(_) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_FEDERATED_TOKEN",
                self.to_string(),
            ),
            ApiError::FederatedLoginDisabled => (
                StatusCode::FORBIDDEN,
                "FEDERATED_LOGIN_DISABLED",
                self.to_string(),
            ),
            ApiError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                self.to_string(),
            ),
            ApiError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "EXPIRED_TOKEN",
                self.to_string(),
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            ApiError::Forbidden(_) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                self.to_string(),
            ),
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
            ),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorBody {
            code: error_code.to_string(),
            message,
            timestamp: Utc::now(),
            status_code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
