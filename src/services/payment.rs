//! Payments received from members.
//!
//! Listing reshapes joined rows: each payment carries the member's name and
//! the sum of approved refunds against it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ServiceError, activity, clamp_limit, clamp_offset, optional_text, positive_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub membership_id: Option<Uuid>,
    pub amount_cents: i64,
    pub refunded_cents: i64,
    pub method: String,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilter {
    pub member_id: Option<Uuid>,
    pub method: Option<PaymentMethod>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub member_id: Uuid,
    pub membership_id: Option<Uuid>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

const PAYMENT_SELECT: &str = "SELECT p.id, p.member_id, m.full_name AS member_name, p.membership_id,
        p.amount_cents,
        COALESCE((SELECT SUM(r.amount_cents) FROM refund_requests r
                  WHERE r.payment_id = p.id AND r.status = 'approved'), 0)::bigint AS refunded_cents,
        p.method, p.paid_at, p.note, p.recorded_by
 FROM payments p
 JOIN members m ON m.id = p.member_id";

/// Insert a payment row. Member and membership must belong to `gym_id`;
/// the subqueries turn a cross-tenant id into a not-null/foreign-key failure.
pub(crate) async fn insert<'e, E>(
    executor: E,
    gym_id: Uuid,
    actor: Uuid,
    input: &NewPayment,
) -> Result<Uuid, ServiceError>
where
    E: PgExecutor<'e>,
{
    let amount = positive_amount("amount_cents", input.amount_cents)?;
    let id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO payments (gym_id, member_id, membership_id, amount_cents, method, paid_at, note, recorded_by)
         SELECT $1, m.id, $3, $4, $5, COALESCE($6, now()), $7, $8
         FROM members m
         WHERE m.gym_id = $1 AND m.id = $2
           AND ($3::uuid IS NULL OR EXISTS (
                SELECT 1 FROM memberships ms
                WHERE ms.id = $3 AND ms.gym_id = $1 AND ms.member_id = m.id))
         RETURNING id",
    )
    .bind(gym_id)
    .bind(input.member_id)
    .bind(input.membership_id)
    .bind(amount)
    .bind(input.method.as_str())
    .bind(input.paid_at)
    .bind(optional_text(input.note.as_deref()))
    .bind(actor)
    .fetch_optional(executor)
    .await?;
    id.ok_or(ServiceError::NotFound("member or membership"))
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>, ServiceError> {
    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(PAYMENT_SELECT);
    builder.push(" WHERE p.gym_id = ").push_bind(gym_id);
    if let Some(member_id) = filter.member_id {
        builder.push(" AND p.member_id = ").push_bind(member_id);
    }
    if let Some(method) = filter.method {
        builder.push(" AND p.method = ").push_bind(method.as_str());
    }
    if let Some(from) = filter.from {
        builder.push(" AND p.paid_at::date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND p.paid_at::date <= ").push_bind(to);
    }
    builder
        .push(" ORDER BY p.paid_at DESC LIMIT ")
        .push_bind(clamp_limit(filter.limit))
        .push(" OFFSET ")
        .push_bind(clamp_offset(filter.offset));

    Ok(builder.build_query_as::<Payment>().fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, payment_id: Uuid) -> Result<Payment, ServiceError> {
    sqlx::query_as::<_, Payment>(&format!("{PAYMENT_SELECT} WHERE p.gym_id = $1 AND p.id = $2"))
        .bind(gym_id)
        .bind(payment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("payment"))
}

pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewPayment) -> Result<Payment, ServiceError> {
    let id = insert(pool, gym_id, actor, &input).await?;
    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "payment",
        Some(id),
        serde_json::json!({
            "member_id": input.member_id,
            "amount_cents": input.amount_cents,
            "method": input.method.as_str(),
        }),
    )
    .await;
    get(pool, gym_id, id).await
}

#[cfg(test)]
#[path = "payment_test.rs"]
mod tests;
