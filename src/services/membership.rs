//! Memberships: a member's purchase of a package over a date range.
//!
//! DESIGN
//! ======
//! Only `active` and `cancelled` are stored. `expired` is derived at read
//! time from `end_date < CURRENT_DATE`, so no sweeper job is needed. Only an
//! effectively active membership can be cancelled. Without an explicit
//! `start_date` a membership starts on the database's current date.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::payment::{self, PaymentMethod};
use super::{ServiceError, activity, clamp_limit, member, package};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipState {
    Active,
    Expired,
    Cancelled,
}

impl MembershipState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub package_id: Uuid,
    pub package_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_cents: i64,
    /// Effective state: `active`, `expired` or `cancelled`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MembershipFilter {
    pub member_id: Option<Uuid>,
    pub status: Option<MembershipState>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InlinePayment {
    pub method: PaymentMethod,
    /// Defaults to the package price.
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewMembership {
    pub member_id: Uuid,
    pub package_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub payment: Option<InlinePayment>,
}

const MEMBERSHIP_SELECT: &str = "SELECT ms.id, ms.member_id, m.full_name AS member_name,
        ms.package_id, p.name AS package_name, ms.start_date, ms.end_date, ms.price_cents,
        CASE
            WHEN ms.status = 'cancelled' THEN 'cancelled'
            WHEN ms.end_date < CURRENT_DATE THEN 'expired'
            ELSE 'active'
        END AS status,
        ms.created_at
 FROM memberships ms
 JOIN members m ON m.id = ms.member_id
 JOIN membership_packages p ON p.id = ms.package_id";

/// Last covered day for a membership of `duration_days` starting `start`.
///
/// # Errors
///
/// `Invalid` when the date overflows the calendar.
pub fn end_date_for(start: NaiveDate, duration_days: i32) -> Result<NaiveDate, ServiceError> {
    let days = u64::try_from(duration_days)
        .map_err(|_| ServiceError::Invalid("duration_days must be greater than zero".into()))?;
    start
        .checked_add_days(Days::new(days))
        .ok_or_else(|| ServiceError::Invalid("membership end date out of range".into()))
}

/// Only `active → cancelled` is allowed. `lapsed` is `end_date < today`.
///
/// # Errors
///
/// `Conflict` for a cancelled or lapsed membership.
pub fn ensure_cancellable(stored: &str, lapsed: bool) -> Result<(), ServiceError> {
    match (stored, lapsed) {
        ("cancelled", _) => Err(ServiceError::Conflict("membership already cancelled".into())),
        (_, true) => Err(ServiceError::Conflict("membership has expired".into())),
        _ => Ok(()),
    }
}

pub async fn list(pool: &PgPool, gym_id: Uuid, filter: &MembershipFilter) -> Result<Vec<Membership>, ServiceError> {
    let rows = sqlx::query_as::<_, Membership>(&format!(
        "{MEMBERSHIP_SELECT}
         WHERE ms.gym_id = $1
           AND ($2::uuid IS NULL OR ms.member_id = $2)
           AND ($3::text IS NULL OR
                CASE
                    WHEN ms.status = 'cancelled' THEN 'cancelled'
                    WHEN ms.end_date < CURRENT_DATE THEN 'expired'
                    ELSE 'active'
                END = $3)
         ORDER BY ms.end_date DESC, ms.created_at DESC
         LIMIT $4"
    ))
    .bind(gym_id)
    .bind(filter.member_id)
    .bind(filter.status.map(MembershipState::as_str))
    .bind(clamp_limit(filter.limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, gym_id: Uuid, membership_id: Uuid) -> Result<Membership, ServiceError> {
    sqlx::query_as::<_, Membership>(&format!("{MEMBERSHIP_SELECT} WHERE ms.gym_id = $1 AND ms.id = $2"))
        .bind(gym_id)
        .bind(membership_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("membership"))
}

/// The member's membership covering today, if any.
pub async fn current_for_member(
    pool: &PgPool,
    gym_id: Uuid,
    member_id: Uuid,
) -> Result<Option<Membership>, ServiceError> {
    let row = sqlx::query_as::<_, Membership>(&format!(
        "{MEMBERSHIP_SELECT}
         WHERE ms.gym_id = $1 AND ms.member_id = $2 AND ms.status = 'active'
           AND ms.start_date <= CURRENT_DATE AND ms.end_date >= CURRENT_DATE
         ORDER BY ms.end_date DESC
         LIMIT 1"
    ))
    .bind(gym_id)
    .bind(member_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Sell a membership, optionally recording its payment in the same
/// transaction.
pub async fn create(pool: &PgPool, gym_id: Uuid, actor: Uuid, input: NewMembership) -> Result<Membership, ServiceError> {
    if member::status(pool, gym_id, input.member_id).await? == "suspended" {
        return Err(ServiceError::Invalid("member is suspended".into()));
    }
    let pkg = package::get(pool, gym_id, input.package_id).await?;
    if !pkg.active {
        return Err(ServiceError::Invalid("package is not active".into()));
    }

    let start_date = match input.start_date {
        Some(date) => date,
        None => sqlx::query_scalar::<_, NaiveDate>("SELECT CURRENT_DATE").fetch_one(pool).await?,
    };
    let end_date = end_date_for(start_date, pkg.duration_days)?;

    let mut tx = pool.begin().await?;
    let membership_id: Uuid = sqlx::query_scalar(
        "INSERT INTO memberships (gym_id, member_id, package_id, start_date, end_date, price_cents)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(gym_id)
    .bind(input.member_id)
    .bind(pkg.id)
    .bind(start_date)
    .bind(end_date)
    .bind(pkg.price_cents)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(inline) = input.payment {
        let amount = inline.amount_cents.unwrap_or(pkg.price_cents);
        payment::insert(
            &mut *tx,
            gym_id,
            actor,
            &payment::NewPayment {
                member_id: input.member_id,
                membership_id: Some(membership_id),
                amount_cents: amount,
                method: inline.method,
                paid_at: None,
                note: Some(format!("{} membership", pkg.name)),
            },
        )
        .await?;
    }
    tx.commit().await?;

    activity::record(
        pool,
        gym_id,
        Some(actor),
        "create",
        "membership",
        Some(membership_id),
        serde_json::json!({
            "member_id": input.member_id,
            "package": pkg.name,
            "start_date": start_date,
            "end_date": end_date,
            "paid": input.payment.is_some(),
        }),
    )
    .await;
    get(pool, gym_id, membership_id).await
}

pub async fn cancel(pool: &PgPool, gym_id: Uuid, actor: Uuid, membership_id: Uuid) -> Result<Membership, ServiceError> {
    let (stored, lapsed): (String, bool) =
        sqlx::query_as("SELECT status, end_date < CURRENT_DATE FROM memberships WHERE gym_id = $1 AND id = $2")
            .bind(gym_id)
            .bind(membership_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("membership"))?;
    ensure_cancellable(&stored, lapsed)?;

    let result = sqlx::query(
        "UPDATE memberships SET status = 'cancelled'
         WHERE gym_id = $1 AND id = $2 AND status = 'active' AND end_date >= CURRENT_DATE",
    )
    .bind(gym_id)
    .bind(membership_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::Conflict("membership is no longer active".into()));
    }

    activity::record(pool, gym_id, Some(actor), "cancel", "membership", Some(membership_id), serde_json::json!({}))
        .await;
    get(pool, gym_id, membership_id).await
}

#[cfg(test)]
#[path = "membership_test.rs"]
mod tests;
