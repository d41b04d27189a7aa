//! Personal-training sessions.
//!
//! Trainers are narrowed to sessions they run, members to sessions booked
//! for them. Owners and managers see the whole gym.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::training::{self, NewSession, SessionFilter, SessionPatch, TrainingSession};
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Query(mut filter): Query<SessionFilter>,
) -> Result<Json<Vec<TrainingSession>>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::ManageTraining)?;
    if own.is_some() {
        filter.member_id = own;
    }
    if let Some(trainer_id) = caller.access.trainer_scope() {
        filter.trainer_id = Some(trainer_id);
    }
    Ok(Json(training::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainingSession>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::ManageTraining)?;
    let found = training::get(&state.pool, gym_id, id).await?;
    let foreign_member = own.is_some_and(|member_id| member_id != found.member_id);
    let foreign_trainer = caller.access.trainer_scope().is_some_and(|trainer_id| trainer_id != found.trainer_id);
    if foreign_member || foreign_trainer {
        return Err(ServiceError::NotFound("training session"));
    }
    Ok(Json(found))
}

/// `POST /api/training-sessions`: trainers may only book themselves.
pub async fn create_session(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewSession>,
) -> Result<(StatusCode, Json<TrainingSession>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageTraining)?;
    if caller.access.trainer_scope().is_some_and(|trainer_id| trainer_id != body.trainer_id) {
        return Err(ServiceError::Forbidden("trainers can only book their own sessions"));
    }
    let created = training::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<SessionPatch>,
) -> Result<Json<TrainingSession>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageTraining)?;
    let scope = caller.access.trainer_scope();
    Ok(Json(training::update(&state.pool, gym_id, caller.user.id, scope, id, body).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageTraining)?;
    training::delete(&state.pool, gym_id, caller.user.id, caller.access.trainer_scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
