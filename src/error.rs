//! Secure error handling
//!
//! Maps every failure to a small wire taxonomy without leaking internals:
//! storage details are logged and replaced by a generic message before the
//! response leaves the server.
//!
//! Status mapping follows the platform's public API contract: duplicate
//! registrations and submission-cap hits are 400s, not 409/429.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Application error with secure response handling.
#[derive(Debug)]
pub struct ApiError {
    /// Error kind determines the HTTP status.
    pub kind: ErrorKind,
    /// User-facing message (safe to expose).
    pub message: String,
    /// Internal details (logged, never exposed).
    internal: Option<String>,
}

/// Error categories and their wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input (400).
    Validation,
    /// Bad credentials or an invalid/expired/missing token (401).
    Authentication,
    /// Duplicate unique field (400).
    Conflict,
    /// Submission cap hit (400).
    RateLimited,
    /// Referenced entity absent (404).
    NotFound,
    /// Backing store unavailable or an operation failed (500).
    Storage,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Conflict | Self::RateLimited => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Authentication => "authentication_failed",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Storage => "storage_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal: None,
        }
    }

    /// Missing or malformed input (400).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Authentication failure (401).
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Duplicate unique field (400).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Submission cap hit (400).
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Referenced entity absent (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Storage or other infrastructure failure (500).
    ///
    /// The details are logged; the client only sees a generic message.
    pub fn storage(internal_details: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Storage,
            message: "Internal server error".to_string(),
            internal: Some(internal_details.into()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(details) = &self.internal {
            error!(
                error_kind = self.kind.as_str(),
                details = %details,
                "Internal error"
            );
        }

        let body = ErrorBody {
            error: self.kind.as_str(),
            message: self.message,
        };

        (self.kind.status_code(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::storage(format!("database error: {err}"))
    }
}

impl From<crate::validation::ValidationError> for ApiError {
    fn from(err: crate::validation::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}
