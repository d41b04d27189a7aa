//! Refund requests against payments.
//!
//! Front-desk staff request; managers and owners review. A request may not
//! push the total of approved plus pending refunds above the payment amount.
//! The payment row is locked while the headroom is checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, optional_text, positive_amount, required_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

impl RefundStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefundRequest {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub payment_amount_cents: i64,
    pub amount_cents: i64,
    pub reason: String,
    pub status: String,
    pub requested_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundFilter {
    pub status: Option<RefundStatus>,
    pub payment_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewRefund {
    pub payment_id: Uuid,
    pub amount_cents: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundReview {
    pub decision: RefundDecision,
    pub note: Option<String>,
}

const REFUND_SELECT: &str = "SELECT r.id, r.payment_id, p.member_id, m.full_name AS member_name,
        p.amount_cents AS payment_amount_cents, r.amount_cents, r.reason, r.status,
        r.requested_by, r.reviewed_by, r.reviewed_at, r.review_note, r.created_at
 FROM refund_requests r
 JOIN payments p ON p.id = r.payment_id
 JOIN members m ON m.id = p.member_id";

/// Amount still available for new refund requests.
#[must_use]
pub fn refundable_cents(payment_cents: i64, approved_cents: i64, pending_cents: i64) -> i64 {
    (payment_cents - approved_cents - pending_cents).max(0)
}

/// Only pending requests can be reviewed.
///
/// # Errors
///
/// `Conflict` when the request was already decided.
pub fn review_transition(current: RefundStatus, decision: RefundDecision) -> Result<RefundStatus, ServiceError> {
    if current != RefundStatus::Pending {
        return Err(ServiceError::Conflict(format!("refund already {}", current.as_str())));
    }
    Ok(match decision {
        RefundDecision::Approve => RefundStatus::Approved,
        RefundDecision::Reject => RefundStatus::Rejected,
    })
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &RefundFilter) -> Result<Vec<RefundRequest>, ServiceError> {
    let rows = sqlx::query_as::<_, RefundRequest>(&format!(
        "{REFUND_SELECT}
         WHERE r.gym_id = $1
           AND ($2::text IS NULL OR r.status = $2)
           AND ($3::uuid IS NULL OR r.payment_id = $3)
         ORDER BY r.created_at DESC
         LIMIT $4"
    ))
    .bind(gym_id)
    .bind(filter.status.map(RefundStatus::as_str))
    .bind(filter.payment_id)
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, refund_id: Uuid) -> Result<RefundRequest, ServiceError> {
    sqlx::query_as::<_, RefundRequest>(&format!("{REFUND_SELECT} WHERE r.gym_id = $1 AND r.id = $2"))
        .bind(gym_id)
        .bind(refund_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("refund request"))
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewRefund) -> Result<RefundRequest, ServiceError> {
    let amount = positive_amount("amount_cents", input.amount_cents)?;
    let reason = required_text("reason", &input.reason)?;

    let mut tx = pool.begin().await?;
    let payment_cents: i64 =
        sqlx::query_scalar("SELECT amount_cents FROM payments WHERE gym_id = $1 AND id = $2 FOR UPDATE")
            .bind(gym_id)
            .bind(input.payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::NotFound("payment"))?;

    let (approved, pending): (i64, i64) = sqlx::query_as(
        "SELECT
             COALESCE(SUM(amount_cents) FILTER (WHERE status = 'approved'), 0)::bigint,
             COALESCE(SUM(amount_cents) FILTER (WHERE status = 'pending'), 0)::bigint
         FROM refund_requests WHERE payment_id = $1",
    )
    .bind(input.payment_id)
    .fetch_one(&mut *tx)
    .await?;

    let available = refundable_cents(payment_cents, approved, pending);
    if amount > available {
        return Err(ServiceError::Invalid(format!(
            "refund of {amount} exceeds refundable balance of {available}"
        )));
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO refund_requests (gym_id, payment_id, amount_cents, reason, requested_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(gym_id)
    .bind(input.payment_id)
    .bind(amount)
    .bind(&reason)
    .bind(actor)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "request",
        "refund",
        Some(id),
        serde_json::json!({ "payment_id": input.payment_id, "amount_cents": amount }),
    )
    .await;
    get(pool, gym_id, id).await
}

pub async fn review(
    pool: &PgPool,
    gym_id: Uuid,
    actor: Uuid,
    refund_id: Uuid,
    input: RefundReview,
) -> Result<RefundRequest, ServiceError> {
    let mut tx = pool.begin().await?;
    let current: String =
        sqlx::query_scalar("SELECT status FROM refund_requests WHERE gym_id = $1 AND id = $2 FOR UPDATE")
            .bind(gym_id)
            .bind(refund_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::NotFound("refund request"))?;

    let current = RefundStatus::parse(&current)
        .ok_or_else(|| ServiceError::Conflict(format!("unknown refund status {current}")))?;
    let next = review_transition(current, input.decision)?;

    sqlx::query(
        "UPDATE refund_requests
         SET status = $3, reviewed_by = $4, reviewed_at = now(), review_note = $5
         WHERE gym_id = $1 AND id = $2",
    )
    .bind(gym_id)
    .bind(refund_id)
    .bind(next.as_str())
    .bind(actor)
    .bind(optional_text(input.note.as_deref()))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        next.as_str(),
        "refund",
        Some(refund_id),
        serde_json::json!({}),
    )
    .await;
    get(pool, gym_id, refund_id).await
}

#[cfg(test)]
#[path = "refund_test.rs"]
mod tests;
