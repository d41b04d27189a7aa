//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! One module per table. Service functions take the pool plus the caller's
//! resolved gym id and forward filters to a single query, reshaping joined
//! rows into serializable structs. Route handlers stay focused on auth
//! plumbing and protocol translation.
//!
//! ERROR HANDLING
//! ==============
//! Every service returns `ServiceError`. Store constraint violations are
//! classified here so callers see 409/400 instead of an opaque 500.

pub mod access;
pub mod activity;
pub mod attendance;
pub mod auto_checkout;
pub mod dashboard;
pub mod email_auth;
pub mod expense;
pub mod follow_up;
pub mod gym;
pub mod mailer;
pub mod member;
pub mod membership;
pub mod package;
pub mod payment;
pub mod refund;
pub mod session;
pub mod staff;
pub mod training;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

/// Stable machine-readable code attached to every API error body.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl ErrorCode for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Invalid(_) => "E_INVALID",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // SQLSTATE classes: 23505 unique, 23503 foreign key, 23514 check.
            match db.code().as_deref() {
                Some("23505") => return Self::Conflict(constraint_label(db.constraint(), "record already exists")),
                Some("23503") => return Self::Invalid(constraint_label(db.constraint(), "referenced record missing")),
                Some("23514") => return Self::Invalid(constraint_label(db.constraint(), "value out of range")),
                _ => {}
            }
        }
        Self::Database(err)
    }
}

fn constraint_label(constraint: Option<&str>, fallback: &str) -> String {
    match constraint {
        Some(name) => format!("{fallback} ({name})"),
        None => fallback.to_owned(),
    }
}

// =============================================================================
// INPUT HELPERS
// =============================================================================

/// Clamp a caller-supplied page size to `1..=200`, defaulting to 50.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

#[must_use]
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Trim a required text field, rejecting empty values.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` naming the field when blank.
pub fn required_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional text field; blank collapses to `None`.
#[must_use]
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Trim a PATCH value for a nullable column. `None` keeps the stored value
/// and `Some("")` clears it; update queries pair this with `NULLIF`.
#[must_use]
pub fn patch_text(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_owned())
}

/// Reject non-positive money amounts.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` when `amount_cents <= 0`.
pub fn positive_amount(field: &str, amount_cents: i64) -> Result<i64, ServiceError> {
    if amount_cents <= 0 {
        return Err(ServiceError::Invalid(format!("{field} must be greater than zero")));
    }
    Ok(amount_cents)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
