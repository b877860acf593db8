//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a handler can produce ends up here, and `AppError` decides what the
//! client is allowed to see: validation problems carry their detail, authentication
//! failures are always the same generic message, and internal faults are logged and
//! hidden behind a generic body.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return
//! `Result<_, AppError>` and rely on the `?` operator for `sqlx::Error`,
//! `validator::ValidationErrors`, `bcrypt::BcryptError`, `image::ImageError` and
//! the store's own `StoreError`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::store::StoreError;

/// The only message a client ever receives for a failed authentication.
pub const AUTH_FAILURE_MESSAGE: &str = "Please authenticate";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    /// The carried message is for logs; the response body is always generic.
    Unauthorized(String),
    /// Malformed request, failed login, duplicate email or rejected upload (HTTP 400).
    BadRequest(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    NotFound(String),
    /// An update named a field outside the allow-list (HTTP 400).
    InvalidOperation(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failure reported by the persistence layer (HTTP 500).
    DatabaseError(String),
    /// Input failed validation rules (HTTP 400).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InvalidOperation(msg) => write!(f, "Invalid Operation: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_)
            | AppError::InvalidOperation(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Unauthorized(_) => AUTH_FAILURE_MESSAGE.to_string(),
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("{}", msg);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidOperation(msg)
            | AppError::ValidationError(msg) => msg.clone(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` maps to `NotFound`; everything else is a database error.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::DuplicateEmail => AppError::BadRequest("Email already registered".into()),
            StoreError::Backend(msg) => AppError::DatabaseError(msg),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// An upload that cannot be decoded as an image is the client's fault.
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> AppError {
        AppError::BadRequest(format!("Unable to process image: {}", error))
    }
}
