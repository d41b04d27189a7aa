//! Follow-ups: reminders for staff to contact a member.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, optional_text, required_text, staff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Open,
    Done,
}

impl FollowUpStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowUp {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub member_phone: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub due_on: NaiveDate,
    pub note: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowUpFilter {
    pub status: Option<FollowUpStatus>,
    pub assigned_to: Option<Uuid>,
    pub due_before: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewFollowUp {
    pub member_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub due_on: NaiveDate,
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowUpPatch {
    pub assigned_to: Option<Uuid>,
    pub due_on: Option<NaiveDate>,
    pub note: Option<String>,
}

const FOLLOW_UP_SELECT: &str = "SELECT f.id, f.member_id, m.full_name AS member_name, m.phone AS member_phone,
        f.assigned_to, s.name AS assignee_name, f.due_on, f.note, f.status, f.completed_at, f.created_at
 FROM follow_ups f
 JOIN members m ON m.id = f.member_id
 LEFT JOIN staff s ON s.id = f.assigned_to";

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &FollowUpFilter) -> Result<Vec<FollowUp>, ServiceError> {
    let rows = sqlx::query_as::<_, FollowUp>(&format!(
        "{FOLLOW_UP_SELECT}
         WHERE f.gym_id = $1
           AND ($2::text IS NULL OR f.status = $2)
           AND ($3::uuid IS NULL OR f.assigned_to = $3)
           AND ($4::date IS NULL OR f.due_on <= $4)
         ORDER BY f.due_on ASC, f.created_at ASC
         LIMIT $5"
    ))
    .bind(gym_id)
    .bind(filter.status.map(FollowUpStatus::as_str))
    .bind(filter.assigned_to)
    .bind(filter.due_before)
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, follow_up_id: Uuid) -> Result<FollowUp, ServiceError> {
    sqlx::query_as::<_, FollowUp>(&format!("{FOLLOW_UP_SELECT} WHERE f.gym_id = $1 AND f.id = $2"))
        .bind(gym_id)
        .bind(follow_up_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("follow-up"))
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewFollowUp) -> Result<FollowUp, ServiceError> {
    let note = required_text("note", &input.note)?;
    if let Some(staff_id) = input.assigned_to {
        staff::ensure_active(pool, gym_id, staff_id).await?;
    }

    let id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO follow_ups (gym_id, member_id, assigned_to, due_on, note)
         SELECT $1, m.id, $3, $4, $5 FROM members m WHERE m.gym_id = $1 AND m.id = $2
         RETURNING id",
    )
    .bind(gym_id)
    .bind(input.member_id)
    .bind(input.assigned_to)
    .bind(input.due_on)
    .bind(&note)
    .fetch_optional(pool)
    .await?;
    let id = id.ok_or(ServiceError::NotFound("member"))?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "follow_up",
        Some(id),
        serde_json::json!({ "member_id": input.member_id, "due_on": input.due_on }),
    )
    .await;
    get(pool, gym_id, id).await
}

pub async fn update(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    follow_up_id: Uuid,
    patch: FollowUpPatch,
) -> Result<FollowUp, ServiceError> {
    if let Some(staff_id) = patch.assigned_to {
        staff::ensure_active(pool, gym_id, staff_id).await?;
    }
    let note = patch.note.as_deref().map(|n| required_text("note", n)).transpose()?;

    let result = sqlx::query(
        "UPDATE follow_ups SET
             assigned_to = COALESCE($3, assigned_to),
             due_on = COALESCE($4, due_on),
             note = COALESCE($5, note)
         WHERE gym_id = $1 AND id = $2",
    )
    .bind(gym_id)
    .bind(follow_up_id)
    .bind(patch.assigned_to)
    .bind(patch.due_on)
    .bind(note)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("follow-up"));
    }

    activity::record(pool, gym_id, Some(actor), "update", "follow_up", Some(follow_up_id), serde_json::json!({}))
        .await;
    get(pool, gym_id, follow_up_id).await
}

/// Mark an open follow-up done, optionally appending an outcome note.
pub async fn complete(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    follow_up_id: Uuid,
    outcome: Option<&str>,
) -> Result<FollowUp, ServiceError> {
    let result = sqlx::query(
        "UPDATE follow_ups
         SET status = 'done',
             completed_at = now(),
             note = CASE WHEN $3::text IS NULL THEN note ELSE note || E'\\n' || $3 END
         WHERE gym_id = $1 AND id = $2 AND status = 'open'",
    )
    .bind(gym_id)
    .bind(follow_up_id)
    .bind(optional_text(outcome))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish missing from already done.
        let existing = get(pool, gym_id, follow_up_id).await?;
        return Err(ServiceError::Conflict(format!("follow-up already {}", existing.status)));
    }

    activity::record(pool, gym_id, Some(actor), "complete", "follow_up", Some(follow_up_id), serde_json::json!({}))
        .await;
    get(pool, gym_id, follow_up_id).await
}

pub async fn delete(pool: &PgPool, gym_id: Uuid, actor: Uuid, follow_up_id: Uuid) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM follow_ups WHERE gym_id = $1 AND id = $2")
        .bind(gym_id)
        .bind(follow_up_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("follow-up"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "follow_up", Some(follow_up_id), serde_json::json!({}))
        .await;
    Ok(())
}
