//! Email access-code login.
//!
//! Creates and verifies short-lived six-character codes linked to an email.
//! Requesting a code also creates the `users` row on first contact, so staff
//! and members invited by email can sign in without a separate signup step.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::session::bytes_to_hex;

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_FAILED_ATTEMPTS: i32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum EmailAuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Delivery(#[from] super::mailer::MailError),
}

impl super::ErrorCode for EmailAuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::InvalidCode => "E_INVALID_CODE",
            Self::VerificationFailed => "E_VERIFICATION_FAILED",
            Self::Db(_) => "E_DATABASE",
            Self::Delivery(_) => "E_EMAIL_DELIVERY",
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN || !normalized.bytes().all(|c| CODE_ALPHABET.contains(&c)) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_access_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[must_use]
pub fn hash_access_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user")
        .to_owned()
}

/// Upsert the user for `email`, replace any live code and return the new
/// plaintext code for delivery.
pub async fn request_access_code(pool: &PgPool, email: &str) -> Result<(String, String), EmailAuthError> {
    let normalized = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;

    sqlx::query(
        r"INSERT INTO users (email, name)
          VALUES ($1, $2)
          ON CONFLICT (email) DO NOTHING",
    )
    .bind(&normalized)
    .bind(name_from_email(&normalized))
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM email_login_codes WHERE email = $1 AND consumed_at IS NULL")
        .bind(&normalized)
        .execute(pool)
        .await?;

    let code = generate_access_code();
    sqlx::query("INSERT INTO email_login_codes (email, code_hash) VALUES ($1, $2)")
        .bind(&normalized)
        .bind(hash_access_code(&code))
        .execute(pool)
        .await?;

    Ok((normalized, code))
}

/// Consume the newest live code for `email`. Wrong guesses count against the
/// code and burn it after `MAX_FAILED_ATTEMPTS`.
pub async fn verify_access_code(pool: &PgPool, email: &str, code: &str) -> Result<Uuid, EmailAuthError> {
    let normalized_email = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;
    let normalized_code = normalize_code(code).ok_or(EmailAuthError::InvalidCode)?;

    let consumed = sqlx::query(
        r"UPDATE email_login_codes
          SET consumed_at = now()
          WHERE id = (
              SELECT id
              FROM email_login_codes
              WHERE email = $1
                AND consumed_at IS NULL
                AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(&normalized_email)
    .bind(hash_access_code(&normalized_code))
    .fetch_optional(pool)
    .await?;

    if consumed.is_none() {
        sqlx::query(
            r"UPDATE email_login_codes
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id
                  FROM email_login_codes
                  WHERE email = $1
                    AND consumed_at IS NULL
                    AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(&normalized_email)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(pool)
        .await?;
        return Err(EmailAuthError::VerificationFailed);
    }

    let user_row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&normalized_email)
        .fetch_optional(pool)
        .await?
        .ok_or(EmailAuthError::VerificationFailed)?;

    Ok(user_row.get("id"))
}

/// Look up an existing user id by email without creating one.
pub async fn find_user_id_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
    let Some(normalized) = normalize_email(email) else {
        return Ok(None);
    };
    sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(normalized)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
#[path = "email_auth_test.rs"]
mod tests;
