//! Error types for Shelfkeeper server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Numeric error codes reported to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    StorageFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoCopyAvailable = 6,
    AlreadyBorrowed = 7,
    NotBorrowed = 8,
    AllCopiesRetired = 9,
    NoMoreExtensions = 10,
    UserExists = 11,
    UserSuspended = 12,
    BadValue = 13,
}

/// Failures coming out of a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Book not exists: {0}")]
    BookNotFound(String),

    #[error("User not exists: {0}")]
    UserNotFound(String),

    #[error("The book {0} is already borrowed")]
    AlreadyBorrowed(String),

    #[error("The book {0} isn't borrowed")]
    NotBorrowed(String),

    #[error("There is no available copy of {0}")]
    NoCopyAvailable(String),

    #[error("All copies of {0} have been removed")]
    AllCopiesRetired(String),

    #[error("Already extended for three times, can't extend again")]
    NoMoreExtensions,

    #[error("User account already exists: {0}")]
    UserExists(String),

    #[error("Account suspended: {0} overdue loan(s)")]
    UserSuspended(i32),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(StorageError::Database(e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    /// Status code and client-facing error code for this failure
    pub fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::BookNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::UserNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser),
            AppError::AlreadyBorrowed(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyBorrowed),
            AppError::NotBorrowed(_) => (StatusCode::CONFLICT, ErrorCode::NotBorrowed),
            AppError::NoCopyAvailable(_) => (StatusCode::CONFLICT, ErrorCode::NoCopyAvailable),
            AppError::AllCopiesRetired(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::AllCopiesRetired)
            }
            AppError::NoMoreExtensions => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NoMoreExtensions)
            }
            AppError::UserExists(_) => (StatusCode::CONFLICT, ErrorCode::UserExists),
            AppError::UserSuspended(_) => (StatusCode::FORBIDDEN, ErrorCode::UserSuspended),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StorageFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "Storage error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
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
