//! Staff records. Role changes here change what the linked user can do on
//! their next request, since roles are resolved per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::access::Role;
use super::email_auth::find_user_id_by_email;
use super::member::{optional_email, patch_email, patched_user_id};
use super::{ServiceError, activity, optional_text, patch_text, required_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Manager,
    Trainer,
    Receptionist,
}

impl StaffRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Trainer => "trainer",
            Self::Receptionist => "receptionist",
        }
    }
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Manager => Self::Manager,
            StaffRole::Trainer => Self::Trainer,
            StaffRole::Receptionist => Self::Receptionist,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewStaff {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: StaffRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub active: Option<bool>,
}

const STAFF_COLUMNS: &str = "id, user_id, name, email, phone, role, active, created_at";

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &StaffFilter) -> Result<Vec<Staff>, ServiceError> {
    let rows = sqlx::query_as::<_, Staff>(&format!(
        "SELECT {STAFF_COLUMNS} FROM staff
         WHERE gym_id = $1
           AND ($2::text IS NULL OR role = $2)
           AND ($3::bool IS NULL OR active = $3)
         ORDER BY name ASC"
    ))
    .bind(gym_id)
    .bind(filter.role.map(StaffRole::as_str))
    .bind(filter.active)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, staff_id: Uuid) -> Result<Staff, ServiceError> {
    sqlx::query_as::<_, Staff>(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE gym_id = $1 AND id = $2"))
        .bind(gym_id)
        .bind(staff_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("staff"))
}

/// Confirm `staff_id` is an active staff row of `gym_id`.
pub async fn ensure_active(pool: &PgPool, gym_id: Uuid, staff_id: Uuid) -> Result<(), ServiceError> {
    let active: Option<bool> = sqlx::query_scalar("SELECT active FROM staff WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(staff_id)
        .fetch_optional(pool)
        .await?;
    match active {
        Some(true) => Ok(()),
        Some(false) => Err(ServiceError::Invalid("staff member is inactive".into())),
        None => Err(ServiceError::NotFound("staff")),
    }
}

/// A staff row wins role resolution, so linking an account that already
/// owns a gym or works elsewhere would take over its role. `except` is the
/// row being edited.
async fn ensure_linkable(pool: &PgPool, user_id: Uuid, except: Option<Uuid>) -> Result<(), ServiceError> {
    let (owns_gym, on_staff): (bool, bool) = sqlx::query_as(
        "SELECT
             EXISTS (SELECT 1 FROM gyms WHERE owner_id = $1),
             EXISTS (SELECT 1 FROM staff WHERE user_id = $1 AND active AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(user_id)
    .bind(except)
    .fetch_one(pool)
    .await?;

    if owns_gym {
        return Err(ServiceError::Conflict("account owns a gym and cannot be linked as staff".into()));
    }
    if on_staff {
        return Err(ServiceError::Conflict("account is already active staff".into()));
    }
    Ok(())
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewStaff) -> Result<Staff, ServiceError> {
    let name = required_text("name", &input.name)?;
    let email = optional_email(input.email.as_deref())?;
    let user_id = match email.as_deref() {
        Some(email) => find_user_id_by_email(pool, email).await?,
        None => None,
    };
    if let Some(user_id) = user_id {
        ensure_linkable(pool, user_id, None).await?;
    }

    let staff = sqlx::query_as::<_, Staff>(&format!(
        "INSERT INTO staff (gym_id, user_id, name, email, phone, role)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {STAFF_COLUMNS}"
    ))
    .bind(gym_id)
    .bind(user_id)
    .bind(&name)
    .bind(email)
    .bind(optional_text(input.phone.as_deref()))
    .bind(input.role.as_str())
    .fetch_one(pool)
    .await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "staff",
        Some(staff.id),
        serde_json::json!({ "name": name, "role": input.role.as_str() }),
    )
    .await;
    Ok(staff)
}

pub async fn update(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    staff_id: Uuid,
    patch: StaffPatch,
) -> Result<Staff, ServiceError> {
    let name = patch.name.as_deref().map(|n| required_text("name", n)).transpose()?;
    let email = patch_email(patch.email.as_deref())?;
    let user_id = patched_user_id(pool, email.as_deref()).await?;
    if let Some(user_id) = user_id {
        ensure_linkable(pool, user_id, Some(staff_id)).await?;
    } else if patch.active == Some(true) && email.as_deref() != Some("") {
        let linked: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM staff WHERE gym_id = $1 AND id = $2")
            .bind(gym_id)
            .bind(staff_id)
            .fetch_optional(pool)
            .await?
            .flatten();
        if let Some(user_id) = linked {
            ensure_linkable(pool, user_id, Some(staff_id)).await?;
        }
    }

    let staff = sqlx::query_as::<_, Staff>(&format!(
        "UPDATE staff SET
             name = COALESCE($3, name),
             email = CASE WHEN $4::text IS NULL THEN email ELSE NULLIF($4, '') END,
             user_id = CASE WHEN $4::text = '' THEN NULL ELSE COALESCE($5, user_id) END,
             phone = CASE WHEN $6::text IS NULL THEN phone ELSE NULLIF($6, '') END,
             role = COALESCE($7, role),
             active = COALESCE($8, active)
         WHERE gym_id = $1 AND id = $2
         RETURNING {STAFF_COLUMNS}"
    ))
    .bind(gym_id)
    .bind(staff_id)
    .bind(name)
    .bind(email)
    .bind(user_id)
    .bind(patch_text(patch.phone.as_deref()))
    .bind(patch.role.map(StaffRole::as_str))
    .bind(patch.active)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("staff"))?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "update",
        "staff",
        Some(staff_id),
        serde_json::json!({ "role": staff.role, "active": staff.active }),
    )
    .await;
    Ok(staff)
}

pub async fn delete(pool: &PgPool, gym_id: Uuid, actor: Uuid, staff_id: Uuid) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM staff WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(staff_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("staff"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "staff", Some(staff_id), serde_json::json!({})).await;
    Ok(())
}

#[cfg(test)]
#[path = "staff_test.rs"]
mod tests;
