//! Gym (tenant) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::access::{Access, Capability, Role};
use super::{ServiceError, activity, optional_text, required_text};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Gym {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewGym {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GymPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

const GYM_COLUMNS: &str = "id, name, owner_id, address, phone, timezone, created_at";

/// Register a gym owned by the caller. Only unaffiliated users may do this.
pub async fn create(pool: &PgPool, access: &Access, input: NewGym) -> Result<Gym, ServiceError> {
    if access.role != Role::Member || access.member_id.is_some() {
        return Err(ServiceError::Conflict("account already belongs to a gym".into()));
    }
    let name = required_text("name", &input.name)?;
    let timezone = optional_text(input.timezone.as_deref()).unwrap_or_else(|| "UTC".to_owned());

    let gym = sqlx::query_as::<_, Gym>(&format!(
        "INSERT INTO gyms (name, owner_id, address, phone, timezone)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {GYM_COLUMNS}"
    ))
    .bind(&name)
    .bind(access.user_id)
    .bind(optional_text(input.address.as_deref()))
    .bind(optional_text(input.phone.as_deref()))
    .bind(timezone)
    .fetch_one(pool)
    .await?;

    activity::record(pool, gym.id, Some(access.user_id), "create", "gym", Some(gym.id), serde_json::json!({ "name": name }))
        .await;
    Ok(gym)
}

pub async fn get(pool: &PgPool, gym_id: Uuid) -> Result<Gym, ServiceError> {
    sqlx::query_as::<_, Gym>(&format!("SELECT {GYM_COLUMNS} FROM gyms WHERE id = $1"))
        .bind(gym_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("gym"))
}

pub async fn update(pool: &PgPool, access: &Access, patch: GymPatch) -> Result<Gym, ServiceError> {
    let gym_id = access.require(Capability::ManageGym)?;
    let name = patch.name.as_deref().map(|n| required_text("name", n)).transpose()?;

    let gym = sqlx::query_as::<_, Gym>(&format!(
        "UPDATE gyms SET
             name = COALESCE($2, name),
             address = COALESCE($3, address),
             phone = COALESCE($4, phone),
             timezone = COALESCE($5, timezone)
         WHERE id = $1
         RETURNING {GYM_COLUMNS}"
    ))
    .bind(gym_id)
    .bind(name)
    .bind(optional_text(patch.address.as_deref()))
    .bind(optional_text(patch.phone.as_deref()))
    .bind(optional_text(patch.timezone.as_deref()))
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("gym"))?;

    activity::record(pool, gym_id, Some(access.user_id), "update", "gym", Some(gym_id), serde_json::json!({})).await;
    Ok(gym)
}

/// Every gym id, used by the auto-checkout scan.
pub async fn list_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM gyms ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}
