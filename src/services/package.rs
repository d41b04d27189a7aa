//! Membership packages: the priced plans a membership is sold from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, optional_text, positive_amount, required_text};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub price_cents: i64,
    pub session_count: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub price_cents: i64,
    pub session_count: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackagePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_days: Option<i32>,
    pub price_cents: Option<i64>,
    pub session_count: Option<i32>,
    pub active: Option<bool>,
}

const PACKAGE_COLUMNS: &str = "id, name, description, duration_days, price_cents, session_count, active, created_at";

pub(crate) fn validate_duration(duration_days: i32) -> Result<i32, ServiceError> {
    if duration_days <= 0 {
        return Err(ServiceError::Invalid("duration_days must be greater than zero".into()));
    }
    Ok(duration_days)
}

pub(crate) fn validate_session_count(session_count: Option<i32>) -> Result<Option<i32>, ServiceError> {
    match session_count {
        Some(n) if n < 0 => Err(ServiceError::Invalid("session_count cannot be negative".into())),
        other => Ok(other),
    }
}

pub async fn list(pool: &PgPool, gym_id: Uuid, active_only: bool) -> Result<Vec<Package>, ServiceError> {
    let rows = sqlx::query_as::<_, Package>(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM membership_packages
         WHERE gym_id = $1 AND (NOT $2 OR active)
         ORDER BY price_cents ASC, name ASC"
    ))
    .bind(gym_id)
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, package_id: Uuid) -> Result<Package, ServiceError> {
    sqlx::query_as::<_, Package>(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM membership_packages WHERE gym_id = $1 AND id = $2"
    ))
    .bind(gym_id)
    .bind(package_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("package"))
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewPackage) -> Result<Package, ServiceError> {
    let name = required_text("name", &input.name)?;
    let duration_days = validate_duration(input.duration_days)?;
    let price_cents = positive_amount("price_cents", input.price_cents)?;
    let session_count = validate_session_count(input.session_count)?;

    let package = sqlx::query_as::<_, Package>(&format!(
        "INSERT INTO membership_packages (gym_id, name, description, duration_days, price_cents, session_count)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PACKAGE_COLUMNS}"
    ))
    .bind(gym_id)
    .bind(&name)
    .bind(optional_text(input.description.as_deref()))
    .bind(duration_days)
    .bind(price_cents)
    .bind(session_count)
    .fetch_one(pool)
    .await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "package",
        Some(package.id),
        serde_json::json!({ "name": name, "price_cents": price_cents }),
    )
    .await;
    Ok(package)
}

pub async fn update(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    package_id: Uuid,
    patch: PackagePatch,
) -> Result<Package, ServiceError> {
    let name = patch.name.as_deref().map(|n| required_text("name", n)).transpose()?;
    let duration_days = patch.duration_days.map(validate_duration).transpose()?;
    let price_cents = patch.price_cents.map(|p| positive_amount("price_cents", p)).transpose()?;
    let session_count = validate_session_count(patch.session_count)?;

    let package = sqlx::query_as::<_, Package>(&format!(
        "UPDATE membership_packages SET
             name = COALESCE($3, name),
             description = COALESCE($4, description),
             duration_days = COALESCE($5, duration_days),
             price_cents = COALESCE($6, price_cents),
             session_count = COALESCE($7, session_count),
             active = COALESCE($8, active)
         WHERE gym_id = $1 AND id = $2
         RETURNING {PACKAGE_COLUMNS}"
    ))
    .bind(gym_id)
    .bind(package_id)
    .bind(name)
    .bind(optional_text(patch.description.as_deref()))
    .bind(duration_days)
    .bind(price_cents)
    .bind(session_count)
    .bind(patch.active)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("package"))?;

    activity::record(pool, gym_id, Some(actor), "update", "package", Some(package_id), serde_json::json!({})).await;
    Ok(package)
}

/// Delete a package. Packages already sold are referenced by memberships and
/// the store refuses the delete; deactivate those instead.
pub async fn delete(pool: &PgPool, gym_id: Uuid, actor: Uuid, package_id: Uuid) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM membership_packages WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(package_id)
        .execute(pool)
        .await
        .map_err(|e| match ServiceError::from(e) {
            ServiceError::Invalid(_) => {
                ServiceError::Conflict("package has memberships; deactivate it instead".into())
            }
            other => other,
        })?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("package"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "package", Some(package_id), serde_json::json!({})).await;
    Ok(())
}

#[cfg(test)]
#[path = "package_test.rs"]
mod tests;
