//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::{ErrorKind, StoreError};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account {account_id} currency mismatch: account is {account}, request is {requested}")]
    CurrencyMismatch {
        account_id: i64,
        account: String,
        requested: String,
    },

    #[error("Account {account_id} has insufficient balance: {balance}")]
    InsufficientBalance { account_id: i64, balance: i64 },

    #[error("Account {0} does not belong to the authenticated user")]
    UnauthorizedAccount(i64),

    #[error("Request user may not act for user {0}")]
    UnauthorizedUser(i64),

    // Store errors, mapped by kind
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::CurrencyMismatch { .. } => (StatusCode::BAD_REQUEST, "currency_mismatch"),
            AppError::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, "insufficient_balance")
            }
            AppError::UnauthorizedAccount(_) => (StatusCode::UNAUTHORIZED, "unauthorized_account"),
            AppError::UnauthorizedUser(_) => (StatusCode::UNAUTHORIZED, "unauthorized_user"),
            AppError::Store(err) => match err.kind() {
                ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "invalid_argument"),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                ErrorKind::ConstraintViolation => (StatusCode::FORBIDDEN, "constraint_violation"),
                ErrorKind::InternalFailure => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let details = match &self {
            AppError::Store(StoreError::ConstraintViolation { constraint, .. }) => {
                constraint.clone()
            }
            AppError::InvalidRequest(msg) => Some(msg.clone()),
            _ => None,
        };

        // Internal details stay in the logs
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
