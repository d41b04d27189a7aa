//! Dashboard summaries: one aggregate query per audience.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::{self, Membership};
use super::{ServiceError, training};

const EXPIRING_WITHIN_DAYS: i32 = 7;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GymSummary {
    pub active_members: i64,
    pub active_memberships: i64,
    pub memberships_expiring_soon: i64,
    pub check_ins_today: i64,
    pub currently_checked_in: i64,
    pub revenue_month_cents: i64,
    pub refunds_month_cents: i64,
    pub expenses_month_cents: i64,
    pub pending_refunds: i64,
    pub follow_ups_due: i64,
    pub sessions_today: i64,
}

impl GymSummary {
    /// Payments for the month less refunds approved in it.
    #[must_use]
    pub fn revenue_net_month_cents(&self) -> i64 {
        self.revenue_month_cents - self.refunds_month_cents
    }

    /// Revenue after approved refunds and expenses for the month.
    #[must_use]
    pub fn net_month_cents(&self) -> i64 {
        self.revenue_month_cents - self.refunds_month_cents - self.expenses_month_cents
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GymDashboard {
    #[serde(flatten)]
    pub summary: GymSummary,
    pub revenue_net_month_cents: i64,
    pub net_month_cents: i64,
}

impl From<GymSummary> for GymDashboard {
    fn from(summary: GymSummary) -> Self {
        Self {
            revenue_net_month_cents: summary.revenue_net_month_cents(),
            net_month_cents: summary.net_month_cents(),
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingSession {
    pub id: Uuid,
    pub trainer_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDashboard {
    pub current_membership: Option<Membership>,
    pub visits_this_month: i64,
    pub checked_in: bool,
    pub upcoming_sessions: Vec<UpcomingSession>,
}

pub async fn gym_summary(pool: &PgPool, gym_id: Uuid) -> Result<GymDashboard, ServiceError> {
    let summary = sqlx::query_as::<_, GymSummary>(
        "SELECT
            (SELECT COUNT(*) FROM members WHERE gym_id = $1 AND status = 'active') AS active_members,
            (SELECT COUNT(*) FROM memberships
             WHERE gym_id = $1 AND status = 'active'
               AND start_date <= CURRENT_DATE AND end_date >= CURRENT_DATE) AS active_memberships,
            (SELECT COUNT(*) FROM memberships
             WHERE gym_id = $1 AND status = 'active'
               AND end_date BETWEEN CURRENT_DATE AND CURRENT_DATE + $2::int) AS memberships_expiring_soon,
            (SELECT COUNT(*) FROM member_attendance
             WHERE gym_id = $1 AND checked_in_at >= date_trunc('day', now())) AS check_ins_today,
            (SELECT COUNT(*) FROM member_attendance
             WHERE gym_id = $1 AND checked_out_at IS NULL) AS currently_checked_in,
            (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM payments
             WHERE gym_id = $1 AND paid_at >= date_trunc('month', now())) AS revenue_month_cents,
            (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM refund_requests
             WHERE gym_id = $1 AND status = 'approved'
               AND reviewed_at >= date_trunc('month', now())) AS refunds_month_cents,
            (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM expenses
             WHERE gym_id = $1 AND spent_on >= date_trunc('month', now())::date) AS expenses_month_cents,
            (SELECT COUNT(*) FROM refund_requests WHERE gym_id = $1 AND status = 'pending') AS pending_refunds,
            (SELECT COUNT(*) FROM follow_ups
             WHERE gym_id = $1 AND status = 'open' AND due_on <= CURRENT_DATE) AS follow_ups_due,
            (SELECT COUNT(*) FROM training_sessions
             WHERE gym_id = $1 AND status = 'scheduled'
               AND scheduled_at >= date_trunc('day', now())
               AND scheduled_at < date_trunc('day', now()) + INTERVAL '1 day') AS sessions_today",
    )
    .bind(gym_id)
    .bind(EXPIRING_WITHIN_DAYS)
    .fetch_one(pool)
    .await?;

    Ok(GymDashboard::from(summary))
}

pub async fn member_summary(pool: &PgPool, gym_id: Uuid, member_id: Uuid) -> Result<MemberDashboard, ServiceError> {
    let current_membership = membership::current_for_member(pool, gym_id, member_id).await?;

    let (visits_this_month, checked_in): (i64, bool) = sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM member_attendance
             WHERE member_id = $1 AND checked_in_at >= date_trunc('month', now())),
            EXISTS (SELECT 1 FROM member_attendance WHERE member_id = $1 AND checked_out_at IS NULL)",
    )
    .bind(member_id)
    .fetch_one(pool)
    .await?;

    let sessions = training::list(
        pool,
        gym_id,
        &training::SessionFilter {
            member_id: Some(member_id),
            status: Some(training::SessionStatus::Scheduled),
            from: Some(Utc::now()),
            limit: Some(5),
            ..training::SessionFilter::default()
        },
    )
    .await?;

    Ok(MemberDashboard {
        current_membership,
        visits_this_month,
        checked_in,
        upcoming_sessions: sessions
            .into_iter()
            .map(|s| UpcomingSession {
                id: s.id,
                trainer_name: s.trainer_name,
                scheduled_at: s.scheduled_at,
                duration_minutes: s.duration_minutes,
            })
            .collect(),
    })
}
