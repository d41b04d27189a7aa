//! Member attendance: check-in / check-out visits.
//!
//! A member has at most one open visit; the partial unique index on
//! `member_attendance(member_id) WHERE checked_out_at IS NULL` enforces it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, member};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Visit {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub checked_in_at: DateTime<Utc>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub auto_checked_out: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct VisitFilter {
    pub member_id: Option<Uuid>,
    /// Visits that started on this (UTC) day.
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub open_only: bool,
    pub limit: Option<i64>,
}

const VISIT_SELECT: &str = "SELECT a.id, a.member_id, m.full_name AS member_name, a.checked_in_at,
        a.checked_out_at, a.auto_checked_out
 FROM member_attendance a
 JOIN members m ON m.id = a.member_id";

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &VisitFilter) -> Result<Vec<Visit>, ServiceError> {
    let rows = sqlx::query_as::<_, Visit>(&format!(
        "{VISIT_SELECT}
         WHERE a.gym_id = $1
           AND ($2::uuid IS NULL OR a.member_id = $2)
           AND ($3::date IS NULL OR (a.checked_in_at AT TIME ZONE 'UTC')::date = $3)
           AND (NOT $4 OR a.checked_out_at IS NULL)
         ORDER BY a.checked_in_at DESC
         LIMIT $5"
    ))
    .bind(gym_id)
    .bind(filter.member_id)
    .bind(filter.date)
    .bind(filter.open_only)
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Number of members currently inside.
pub async fn occupancy(pool: &PgPool, gym_id: Uuid) -> Result<i64, ServiceError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM member_attendance WHERE gym_id = $1 AND checked_out_at IS NULL")
            .bind(gym_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn check_in(pool: &PgPool, gym_id: Uuid, actor: Uuid, member_id: Uuid) -> Result<Visit, ServiceError> {
    let status = member::status(pool, gym_id, member_id).await?;
    if status != "active" {
        return Err(ServiceError::Invalid(format!("member is {status}")));
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO member_attendance (gym_id, member_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(gym_id)
    .bind(member_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match ServiceError::from(e) {
        ServiceError::Conflict(_) => ServiceError::Conflict("member is already checked in".into()),
        other => other,
    })?;

    activity::record(pool, gym_id, Some(actor), "check_in", "attendance", Some(id), serde_json::json!({ "member_id": member_id }))
        .await;
    get(pool, gym_id, id).await
}

pub async fn check_out(pool: &PgPool, gym_id: Uuid, actor: Uuid, member_id: Uuid) -> Result<Visit, ServiceError> {
    let id: Option<Uuid> = sqlx::query_scalar(
        "UPDATE member_attendance SET checked_out_at = now()
         WHERE gym_id = $1 AND member_id = $2 AND checked_out_at IS NULL
         RETURNING id",
    )
    .bind(gym_id)
    .bind(member_id)
    .fetch_optional(pool)
    .await?;
    let id = id.ok_or(ServiceError::NotFound("open visit"))?;

    activity::record(pool, gym_id, Some(actor), "check_out", "attendance", Some(id), serde_json::json!({ "member_id": member_id }))
        .await;
    get(pool, gym_id, id).await
}

pub async fn get(pool: &PgPool, gym_id: Uuid, visit_id: Uuid) -> Result<Visit, ServiceError> {
    sqlx::query_as::<_, Visit>(&format!("{VISIT_SELECT} WHERE a.gym_id = $1 AND a.id = $2"))
        .bind(gym_id)
        .bind(visit_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("visit"))
}

/// Close every open visit in `gym_id` that started before `cutoff`.
pub async fn close_stale(pool: &PgPool, gym_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE member_attendance
         SET checked_out_at = now(), auto_checked_out = TRUE
         WHERE gym_id = $1 AND checked_out_at IS NULL AND checked_in_at < $2",
    )
    .bind(gym_id)
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_filter_defaults_to_all_visits() {
        let filter: VisitFilter = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!filter.open_only);
        assert!(filter.member_id.is_none());
        assert!(filter.date.is_none());
    }

    #[test]
    fn visit_filter_parses_open_only() {
        let filter: VisitFilter =
            serde_json::from_value(serde_json::json!({ "open_only": true, "date": "2026-10-16" })).unwrap();
        assert!(filter.open_only);
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2026, 10, 16));
    }

    #[cfg(feature = "live-db-tests")]
    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn second_check_in_conflicts_until_check_out() {
        use crate::state::test_helpers::{integration_pool, seed_gym, seed_member};

        let pool = integration_pool().await;
        let (gym_id, owner) = seed_gym(&pool, "Front Desk Gym").await;
        let member_id = seed_member(&pool, gym_id, "Early Bird").await;

        let visit = check_in(&pool, gym_id, owner, member_id).await.expect("first check-in");
        assert!(visit.checked_out_at.is_none());

        let err = check_in(&pool, gym_id, owner, member_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(occupancy(&pool, gym_id).await.expect("occupancy"), 1);

        let closed = check_out(&pool, gym_id, owner, member_id).await.expect("check-out");
        assert_eq!(closed.id, visit.id);
        assert!(closed.checked_out_at.is_some());

        let err = check_out(&pool, gym_id, owner, member_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        check_in(&pool, gym_id, owner, member_id).await.expect("check-in after check-out");
    }
}
