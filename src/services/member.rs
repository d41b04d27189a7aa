//! Member records.
//!
//! Listing forwards the caller's filters into one `QueryBuilder` query. A
//! member row links to a `users` row when an account with the same email
//! exists at creation time; that link is what lets the member sign in and
//! read their own records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::email_auth::{find_user_id_by_email, normalize_email};
use super::{ServiceError, activity, clamp_limit, clamp_offset, optional_text, patch_text, required_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

impl MemberStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: String,
    pub joined_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// End date of the latest non-cancelled membership, if any.
    pub membership_ends_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberFilter {
    pub search: Option<String>,
    pub status: Option<MemberStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewMember {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: Option<MemberStatus>,
    pub notes: Option<String>,
}

const MEMBER_SELECT: &str = "SELECT m.id, m.user_id, m.full_name, m.email, m.phone, m.date_of_birth,
        m.status, m.joined_on, m.notes, m.created_at,
        (SELECT MAX(ms.end_date) FROM memberships ms
         WHERE ms.member_id = m.id AND ms.status <> 'cancelled') AS membership_ends_on
 FROM members m";

/// Escape `LIKE` metacharacters so user search text matches literally.
#[must_use]
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Normalize an optional email field. Blank reads as absent, malformed is
/// rejected.
pub(crate) fn optional_email(value: Option<&str>) -> Result<Option<String>, ServiceError> {
    match optional_text(value) {
        None => Ok(None),
        Some(raw) => normalize_email(&raw)
            .map(Some)
            .ok_or_else(|| ServiceError::Invalid(format!("invalid email: {raw}"))),
    }
}

/// Email in a PATCH body: `None` keeps, blank becomes `Some("")` to clear.
pub(crate) fn patch_email(value: Option<&str>) -> Result<Option<String>, ServiceError> {
    match patch_text(value) {
        Some(raw) if raw.is_empty() => Ok(Some(raw)),
        other => optional_email(other.as_deref()),
    }
}

/// Account to link for a patched email. Clearing or an unknown address
/// yields `None`.
pub(crate) async fn patched_user_id(pool: &PgPool, email: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
    match email.filter(|e| !e.is_empty()) {
        Some(email) => Ok(find_user_id_by_email(pool, email).await?),
        None => Ok(None),
    }
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &MemberFilter) -> Result<Vec<Member>, ServiceError> {
    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(MEMBER_SELECT);
    builder.push(" WHERE m.gym_id = ").push_bind(gym_id);

    if let Some(status) = filter.status {
        builder.push(" AND m.status = ").push_bind(status.as_str());
    }
    if let Some(search) = optional_text(filter.search.as_deref()) {
        let pattern = like_pattern(&search);
        builder
            .push(" AND (m.full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    builder
        .push(" ORDER BY m.full_name ASC, m.id ASC LIMIT ")
        .push_bind(clamp_limit(filter.limit))
        .push(" OFFSET ")
        .push_bind(clamp_offset(filter.offset));

    Ok(builder.build_query_as::<Member>().fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, member_id: Uuid) -> Result<Member, ServiceError> {
    sqlx::query_as::<_, Member>(&format!("{MEMBER_SELECT} WHERE m.gym_id = $1 AND m.id = $2"))
        .bind(gym_id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("member"))
}

/// Status of a member, used to gate check-in and new memberships.
pub async fn status(pool: &PgPool, gym_id: Uuid, member_id: Uuid) -> Result<String, ServiceError> {
    sqlx::query_scalar("SELECT status FROM members WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("member"))
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewMember) -> Result<Member, ServiceError> {
    let full_name = required_text("full_name", &input.full_name)?;
    let email = optional_email(input.email.as_deref())?;
    let user_id = match email.as_deref() {
        Some(email) => find_user_id_by_email(pool, email).await?,
        None => None,
    };

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO members (gym_id, user_id, full_name, email, phone, date_of_birth, joined_on, notes)
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, CURRENT_DATE), $8)
         RETURNING id",
    )
    .bind(gym_id)
    .bind(user_id)
    .bind(&full_name)
    .bind(&email)
    .bind(optional_text(input.phone.as_deref()))
    .bind(input.date_of_birth)
    .bind(input.joined_on)
    .bind(optional_text(input.notes.as_deref()))
    .fetch_one(pool)
    .await?;

    activity::record(pool, gym_id, Some(actor), "create", "member", Some(id), serde_json::json!({ "full_name": full_name }))
        .await;
    get(pool, gym_id, id).await
}

pub async fn update(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    member_id: Uuid,
    patch: MemberPatch,
) -> Result<Member, ServiceError> {
    let full_name = patch.full_name.as_deref().map(|n| required_text("full_name", n)).transpose()?;
    let email = patch_email(patch.email.as_deref())?;
    let user_id = patched_user_id(pool, email.as_deref()).await?;

    // A blank contact field clears the column and a cleared email unlinks
    // the account.
    let result = sqlx::query(
        "UPDATE members SET
             full_name = COALESCE($3, full_name),
             email = CASE WHEN $4::text IS NULL THEN email ELSE NULLIF($4, '') END,
             user_id = CASE WHEN $4::text = '' THEN NULL ELSE COALESCE($5, user_id) END,
             phone = CASE WHEN $6::text IS NULL THEN phone ELSE NULLIF($6, '') END,
             date_of_birth = COALESCE($7, date_of_birth),
             status = COALESCE($8, status),
             notes = CASE WHEN $9::text IS NULL THEN notes ELSE NULLIF($9, '') END
         WHERE gym_id = $1 AND id = $2",
    )
    .bind(gym_id)
    .bind(member_id)
    .bind(full_name)
    .bind(email)
    .bind(user_id)
    .bind(patch_text(patch.phone.as_deref()))
    .bind(patch.date_of_birth)
    .bind(patch.status.map(MemberStatus::as_str))
    .bind(patch_text(patch.notes.as_deref()))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("member"));
    }

    let details = match patch.status {
        Some(status) => serde_json::json!({ "status": status.as_str() }),
        None => serde_json::json!({}),
    };
    activity::record(pool, gym_id, Some(actor), "update", "member", Some(member_id), details).await;
    get(pool, gym_id, member_id).await
}

pub async fn delete(pool: &PgPool, gym_id: Uuid, actor: Uuid, member_id: Uuid) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM members WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(member_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("member"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "member", Some(member_id), serde_json::json!({})).await;
    Ok(())
}

#[cfg(test)]
#[path = "member_test.rs"]
mod tests;
