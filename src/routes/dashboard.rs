use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use super::auth::Caller;
use crate::services::ServiceError;
use crate::services::access::{Capability, Role};
use crate::services::dashboard::{self, GymDashboard, MemberDashboard};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Dashboard {
    Gym(GymDashboard),
    Member(MemberDashboard),
}

/// `GET /api/dashboard`: gym figures for managers and owners, a personal
/// summary for members.
pub async fn dashboard(State(state): State<AppState>, caller: Caller) -> Result<Json<Dashboard>, ServiceError> {
    if caller.access.role == Role::Member {
        let (gym_id, member_id) = caller.access.require_member()?;
        let summary = dashboard::member_summary(&state.pool, gym_id, member_id).await?;
        return Ok(Json(Dashboard::Member(summary)));
    }
    let gym_id = caller.access.require(Capability::ViewReports)?;
    Ok(Json(Dashboard::Gym(dashboard::gym_summary(&state.pool, gym_id).await?)))
}
