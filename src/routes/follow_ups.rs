//! Member follow-up tasks for the front desk and trainers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::follow_up::{self, FollowUp, FollowUpFilter, FollowUpPatch, NewFollowUp};
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_follow_ups(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<FollowUpFilter>,
) -> Result<Json<Vec<FollowUp>>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageFollowUps)?;
    Ok(Json(follow_up::list(&state.pool, gym_id, &filter).await?))
}

pub async fn create_follow_up(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewFollowUp>,
) -> Result<(StatusCode, Json<FollowUp>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageFollowUps)?;
    let created = follow_up::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_follow_up(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<FollowUpPatch>,
) -> Result<Json<FollowUp>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageFollowUps)?;
    Ok(Json(follow_up::update(&state.pool, gym_id, caller.user.id, id, body).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteBody {
    pub outcome: Option<String>,
}

/// `POST /api/follow-ups/{id}/complete`: body is optional.
pub async fn complete_follow_up(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteBody>>,
) -> Result<Json<FollowUp>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageFollowUps)?;
    let Json(body) = body.unwrap_or_default();
    let done = follow_up::complete(&state.pool, gym_id, caller.user.id, id, body.outcome.as_deref()).await?;
    Ok(Json(done))
}

pub async fn delete_follow_up(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageFollowUps)?;
    follow_up::delete(&state.pool, gym_id, caller.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
