//! Input validation
//!
//! Declarative validation for request payloads: a [`Validate`] trait, field
//! helpers, and a [`ValidatedJson`] extractor that rejects bad payloads with
//! a 400 before the handler runs.

use std::fmt;

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ApiError;

/// Validation error with field context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field that failed validation (if applicable).
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trait for validatable request types.
pub trait Validate {
    /// Validate the instance, returning the first failure.
    fn validate(&self) -> Result<(), ValidationError>;
}

// ============================================================================
// Field Helpers
// ============================================================================

/// Validate that a string is present and not blank.
pub fn validate_required(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::for_field(field, "Field is required"));
    }
    Ok(())
}

/// Validate string length bounds (inclusive, counted in characters).
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::for_field(
            field,
            format!("Must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(ValidationError::for_field(
            field,
            format!("Must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validate email format.
///
/// Pragmatic check: exactly one `@`, a sane local part, and a dotted domain.
/// Does not validate deliverability.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::for_field("email", "Invalid email format");

    let mut parts = value.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid()),
    };

    if local.is_empty() || local.len() > 64 {
        return Err(invalid());
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(invalid());
    }

    if domain.is_empty() || domain.len() > 255 || !domain.contains('.') {
        return Err(invalid());
    }
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(invalid());
    }

    Ok(())
}

// ============================================================================
// Axum Extractor
// ============================================================================

/// Validated JSON extractor.
///
/// Deserializes the body and runs [`Validate::validate`] before the handler
/// sees it. Parse failures and validation failures both surface as 400s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            warn!(event = "validation.parse_failed", error = %e, "JSON parsing failed");
            ApiError::validation("Failed to parse JSON body")
        })?;

        if let Err(error) = value.validate() {
            warn!(
                event = "validation.rejected",
                field = ?error.field,
                message = %error.message,
                "Validation failed"
            );
            return Err(error.into());
        }

        Ok(ValidatedJson(value))
    }
}
