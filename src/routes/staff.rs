//! Staff roster. Every staff role can read it; only the owner changes it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::staff::{self, NewStaff, Staff, StaffFilter, StaffPatch};
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_staff(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<StaffFilter>,
) -> Result<Json<Vec<Staff>>, ServiceError> {
    let gym_id = caller.access.require(Capability::CheckIn)?;
    Ok(Json(staff::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_staff(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Staff>, ServiceError> {
    let gym_id = caller.access.require(Capability::CheckIn)?;
    Ok(Json(staff::get(&state.pool, gym_id, id).await?))
}

pub async fn create_staff(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewStaff>,
) -> Result<(StatusCode, Json<Staff>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageStaff)?;
    let created = staff::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffPatch>,
) -> Result<Json<Staff>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageStaff)?;
    Ok(Json(staff::update(&state.pool, gym_id, caller.user.id, id, body).await?))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageStaff)?;
    staff::delete(&state.pool, gym_id, caller.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
