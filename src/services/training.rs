//! Personal-training sessions between a trainer (staff) and a member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, optional_text, staff};

const MAX_DURATION_MINUTES: i32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    /// Sessions leave `scheduled` exactly once.
    #[must_use]
    pub fn can_become(self, next: Self) -> bool {
        self == Self::Scheduled && next != Self::Scheduled
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrainingSession {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub trainer_name: String,
    pub member_id: Uuid,
    pub member_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionFilter {
    pub trainer_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewSession {
    pub trainer_id: Uuid,
    pub member_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionPatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub status: Option<SessionStatus>,
    pub notes: Option<String>,
}

const SESSION_SELECT: &str = "SELECT t.id, t.trainer_id, s.name AS trainer_name, t.member_id,
        m.full_name AS member_name, t.scheduled_at, t.duration_minutes, t.status, t.notes, t.created_at
 FROM training_sessions t
 JOIN staff s ON s.id = t.trainer_id
 JOIN members m ON m.id = t.member_id";

pub(crate) fn validate_duration(minutes: i32) -> Result<i32, ServiceError> {
    if !(1..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(ServiceError::Invalid(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(minutes)
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &SessionFilter) -> Result<Vec<TrainingSession>, ServiceError> {
    let rows = sqlx::query_as::<_, TrainingSession>(&format!(
        "{SESSION_SELECT}
         WHERE t.gym_id = $1
           AND ($2::uuid IS NULL OR t.trainer_id = $2)
           AND ($3::uuid IS NULL OR t.member_id = $3)
           AND ($4::text IS NULL OR t.status = $4)
           AND ($5::timestamptz IS NULL OR t.scheduled_at >= $5)
           AND ($6::timestamptz IS NULL OR t.scheduled_at < $6)
         ORDER BY t.scheduled_at ASC
         LIMIT $7"
    ))
    .bind(gym_id)
    .bind(filter.trainer_id)
    .bind(filter.member_id)
    .bind(filter.status.map(SessionStatus::as_str))
    .bind(filter.from)
    .bind(filter.to)
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, session_id: Uuid) -> Result<TrainingSession, ServiceError> {
    sqlx::query_as::<_, TrainingSession>(&format!("{SESSION_SELECT} WHERE t.gym_id = $1 AND t.id = $2"))
        .bind(gym_id)
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("training session"))
}

pub async fn create(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    input: NewSession,
) -> Result<TrainingSession, ServiceError> {
    let duration = validate_duration(input.duration_minutes.unwrap_or(60))?;
    staff::ensure_active(pool, gym_id, input.trainer_id).await?;

    let id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO training_sessions (gym_id, trainer_id, member_id, scheduled_at, duration_minutes, notes)
         SELECT $1, $2, m.id, $4, $5, $6 FROM members m WHERE m.gym_id = $1 AND m.id = $3
         RETURNING id",
    )
    .bind(gym_id)
    .bind(input.trainer_id)
    .bind(input.member_id)
    .bind(input.scheduled_at)
    .bind(duration)
    .bind(optional_text(input.notes.as_deref()))
    .fetch_optional(pool)
    .await?;
    let id = id.ok_or(ServiceError::NotFound("member"))?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "training_session",
        Some(id),
        serde_json::json!({ "trainer_id": input.trainer_id, "member_id": input.member_id }),
    )
    .await;
    get(pool, gym_id, id).await
}

/// Reschedule or close a session. `trainer_scope` limits trainers to their own.
pub async fn update(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    trainer_scope: Option<Uuid>,
    session_id: Uuid,
    patch: SessionPatch,
) -> Result<TrainingSession, ServiceError> {
    let existing = get(pool, gym_id, session_id).await?;
    if trainer_scope.is_some_and(|trainer| trainer != existing.trainer_id) {
        return Err(ServiceError::Forbidden("session belongs to another trainer"));
    }
    let current = SessionStatus::parse(&existing.status)
        .ok_or_else(|| ServiceError::Conflict(format!("unknown session status {}", existing.status)))?;
    if let Some(next) = patch.status {
        if !current.can_become(next) {
            return Err(ServiceError::Conflict(format!(
                "cannot move session from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }
    }
    let duration = patch.duration_minutes.map(validate_duration).transpose()?;

    sqlx::query(
        "UPDATE training_sessions SET
             scheduled_at = COALESCE($3, scheduled_at),
             duration_minutes = COALESCE($4, duration_minutes),
             status = COALESCE($5, status),
             notes = COALESCE($6, notes)
         WHERE gym_id = $1 AND id = $2",
    )
    .bind(gym_id)
    .bind(session_id)
    .bind(patch.scheduled_at)
    .bind(duration)
    .bind(patch.status.map(SessionStatus::as_str))
    .bind(optional_text(patch.notes.as_deref()))
    .execute(pool)
    .await?;

    let details = match patch.status {
        Some(status) => serde_json::json!({ "status": status.as_str() }),
        None => serde_json::json!({}),
    };
    activity::record(pool, gym_id, Some(actor), "update", "training_session", Some(session_id), details).await;
    get(pool, gym_id, session_id).await
}

pub async fn delete(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    trainer_scope: Option<Uuid>,
    session_id: Uuid,
) -> Result<(), ServiceError> {
    let result = sqlx::query(
        "DELETE FROM training_sessions
         WHERE gym_id = $1 AND id = $2 AND ($3::uuid IS NULL OR trainer_id = $3)",
    )
    .bind(gym_id)
    .bind(session_id)
    .bind(trainer_scope)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("training session"));
    }
    activity::record(pool, gym_id, Some(actor), "delete", "training_session", Some(session_id), serde_json::json!({}))
        .await;
    Ok(())
}

#[cfg(test)]
#[path = "training_test.rs"]
mod tests;
