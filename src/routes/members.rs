//! Member records. Staff manage them; a member reads their own profile.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::member::{self, Member, MemberFilter, MemberPatch, NewMember};
use crate::services::ServiceError;
use crate::state::AppState;

/// `GET /api/members`: search by name/email/phone, filter by status.
pub async fn list_members(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<MemberFilter>,
) -> Result<Json<Vec<Member>>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    Ok(Json(member::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    Ok(Json(member::get(&state.pool, gym_id, id).await?))
}

pub async fn create_member(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewMember>,
) -> Result<(StatusCode, Json<Member>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    let created = member::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<MemberPatch>,
) -> Result<Json<Member>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    Ok(Json(member::update(&state.pool, gym_id, caller.user.id, id, body).await?))
}

pub async fn delete_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    member::delete(&state.pool, gym_id, caller.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/me/member`: the caller's own member profile.
pub async fn my_profile(State(state): State<AppState>, caller: Caller) -> Result<Json<Member>, ServiceError> {
    let (gym_id, member_id) = caller.access.require_member()?;
    Ok(Json(member::get(&state.pool, gym_id, member_id).await?))
}
