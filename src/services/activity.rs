//! Activity log: an append-only audit trail of mutations per gym.
//!
//! Writes are best-effort. A failed insert is logged and swallowed so the
//! mutation that triggered it still succeeds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{ServiceError, clamp_limit};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_name: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn record(
    pool: &PgPool,
    gym_id: Uuid,
    actor_id: Option<Uuid>,
    action: &str,
    entity: &str,
    entity_id: Option<Uuid>,
    details: serde_json::Value,
) {
    let result = sqlx::query(
        "INSERT INTO activity_logs (gym_id, actor_id, action, entity, entity_id, details)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(gym_id)
    .bind(actor_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(details)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(error = %e, %gym_id, action, entity, "activity log write failed");
    }
}

/// Newest-first activity, optionally narrowed to one entity kind.
pub async fn list(
    pool: &PgPool,
    gym_id: Uuid,
    entity: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<ActivityLog>, ServiceError> {
    let rows = sqlx::query_as::<_, ActivityLog>(
        "SELECT a.id, a.actor_id, u.name AS actor_name, a.action, a.entity, a.entity_id,
                a.details, a.created_at
         FROM activity_logs a
         LEFT JOIN users u ON u.id = a.actor_id
         WHERE a.gym_id = $1 AND ($2::text IS NULL OR a.entity = $2)
         ORDER BY a.created_at DESC
         LIMIT $3",
    )
    .bind(gym_id)
    .bind(entity)
    .bind(clamp_limit(limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
