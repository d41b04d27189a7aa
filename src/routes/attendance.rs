//! Check-in desk.
//!
//! Staff check any member in or out; a member may only move themselves.
//! The manual auto-checkout trigger ignores the time window but uses the
//! same visit age limit as the background loop.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::{Capability, Role};
use crate::services::attendance::{self, Visit, VisitFilter};
use crate::services::{ServiceError, auto_checkout};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VisitBody {
    /// Omitted when a member checks themselves in.
    pub member_id: Option<Uuid>,
}

fn visit_target(caller: &Caller, requested: Option<Uuid>) -> Result<(Uuid, Uuid), ServiceError> {
    if caller.access.role == Role::Member {
        let (gym_id, own) = caller.access.require_member()?;
        if requested.is_some_and(|member_id| member_id != own) {
            return Err(ServiceError::Forbidden("members can only check themselves in or out"));
        }
        return Ok((gym_id, own));
    }
    let gym_id = caller.access.require(Capability::CheckIn)?;
    let member_id = requested.ok_or_else(|| ServiceError::Invalid("member_id is required".into()))?;
    Ok((gym_id, member_id))
}

pub async fn list_visits(
    State(state): State<AppState>,
    caller: Caller,
    Query(mut filter): Query<VisitFilter>,
) -> Result<Json<Vec<Visit>>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::CheckIn)?;
    if own.is_some() {
        filter.member_id = own;
    }
    Ok(Json(attendance::list(&state.pool, gym_id, &filter).await?))
}

/// `GET /api/attendance/occupancy`: members currently inside.
pub async fn occupancy(State(state): State<AppState>, caller: Caller) -> Result<Json<serde_json::Value>, ServiceError> {
    let gym_id = caller.access.require(Capability::CheckIn)?;
    let inside = attendance::occupancy(&state.pool, gym_id).await?;
    Ok(Json(serde_json::json!({ "checked_in": inside })))
}

/// `POST /api/attendance/check-in`: 409 while a visit is already open.
pub async fn check_in(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<VisitBody>,
) -> Result<Json<Visit>, ServiceError> {
    let (gym_id, member_id) = visit_target(&caller, body.member_id)?;
    Ok(Json(attendance::check_in(&state.pool, gym_id, caller.user.id, member_id).await?))
}

/// `POST /api/attendance/check-out`: 404 when there is no open visit.
pub async fn check_out(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<VisitBody>,
) -> Result<Json<Visit>, ServiceError> {
    let (gym_id, member_id) = visit_target(&caller, body.member_id)?;
    Ok(Json(attendance::check_out(&state.pool, gym_id, caller.user.id, member_id).await?))
}

/// `POST /api/attendance/auto-checkout`: one pass for the caller's gym.
pub async fn run_auto_checkout(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let gym_id = caller.access.require(Capability::ViewReports)?;
    let cutoff = auto_checkout::cutoff(Utc::now(), state.config.auto_checkout.max_visit_hours);
    let closed = auto_checkout::run_for_gym(&state.pool, gym_id, cutoff).await?;
    Ok(Json(serde_json::json!({ "closed": closed, "cutoff": cutoff })))
}

#[cfg(test)]
#[path = "attendance_test.rs"]
mod tests;
