//! Auto-checkout: background pass that closes forgotten visits.
//!
//! DESIGN
//! ======
//! A tokio interval ticks every `interval_secs`. When the server's local
//! hour falls inside the configured window, every gym is scanned and open
//! visits older than `max_visit_hours` are closed with
//! `auto_checked_out = true`. The update is naturally idempotent: a second
//! pass in the same window finds nothing left to close.
//!
//! ERROR HANDLING
//! ==============
//! A failure for one gym is logged and the scan moves on. Missed ticks are
//! skipped rather than replayed in a burst.

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Timelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{activity, attendance, gym};
use crate::config::AutoCheckoutConfig;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct AutoCheckoutReport {
    pub gyms_scanned: usize,
    pub visits_closed: u64,
    pub failures: usize,
}

/// Whether `hour` lies in `[start, end)`. `end < start` wraps past midnight;
/// `start == end` is an empty window.
#[must_use]
pub fn hour_in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        (start..end).contains(&hour)
    } else {
        hour >= start || hour < end
    }
}

/// Visits that started before this instant are considered forgotten.
/// A window too large to represent saturates at the earliest instant, so
/// nothing is closed.
#[must_use]
pub fn cutoff(now: DateTime<Utc>, max_visit_hours: i64) -> DateTime<Utc> {
    TimeDelta::try_hours(max_visit_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Close stale visits for one gym and note it in the activity log.
pub async fn run_for_gym(pool: &PgPool, gym_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let closed = attendance::close_stale(pool, gym_id, cutoff).await?;
    if closed > 0 {
        info!(%gym_id, closed, "auto-checkout closed open visits");
        activity::record(
            pool,
            gym_id,
            None,
            "auto_checkout",
            "attendance",
            None,
            serde_json::json!({ "closed": closed, "cutoff": cutoff }),
        )
        .await;
    }
    Ok(closed)
}

/// Scan every gym once, regardless of the time window.
pub async fn run_pass(pool: &PgPool, cutoff: DateTime<Utc>) -> AutoCheckoutReport {
    let gym_ids = match gym::list_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "auto-checkout could not list gyms");
            return AutoCheckoutReport { failures: 1, ..AutoCheckoutReport::default() };
        }
    };

    let mut report = AutoCheckoutReport { gyms_scanned: gym_ids.len(), ..AutoCheckoutReport::default() };
    for gym_id in gym_ids {
        match run_for_gym(pool, gym_id, cutoff).await {
            Ok(closed) => report.visits_closed += closed,
            Err(e) => {
                report.failures += 1;
                error!(error = %e, %gym_id, "auto-checkout failed for gym");
            }
        }
    }
    report
}

/// Spawn the background loop. Abort the returned handle to stop it.
pub fn spawn_auto_checkout_task(pool: PgPool, config: AutoCheckoutConfig) -> JoinHandle<()> {
    info!(
        interval_secs = config.interval_secs,
        window_start = config.window_start,
        window_end = config.window_end,
        max_visit_hours = config.max_visit_hours,
        "auto-checkout configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let hour = Local::now().hour();
            if !hour_in_window(hour, config.window_start, config.window_end) {
                debug!(hour, "auto-checkout outside window");
                continue;
            }
            let report = run_pass(&pool, cutoff(Utc::now(), config.max_visit_hours)).await;
            info!(
                gyms = report.gyms_scanned,
                closed = report.visits_closed,
                failures = report.failures,
                "auto-checkout pass finished"
            );
        }
    })
}

#[cfg(test)]
#[path = "auto_checkout_test.rs"]
mod tests;
