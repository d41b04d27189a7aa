//! Memberships sold against packages.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::membership::{self, Membership, MembershipFilter, NewMembership};
use crate::services::ServiceError;
use crate::state::AppState;

/// `GET /api/memberships`: members only ever see their own.
pub async fn list_memberships(
    State(state): State<AppState>,
    caller: Caller,
    Query(mut filter): Query<MembershipFilter>,
) -> Result<Json<Vec<Membership>>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::ManageMembers)?;
    if own.is_some() {
        filter.member_id = own;
    }
    Ok(Json(membership::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_membership(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Membership>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::ManageMembers)?;
    let found = membership::get(&state.pool, gym_id, id).await?;
    if own.is_some_and(|member_id| member_id != found.member_id) {
        return Err(ServiceError::NotFound("membership"));
    }
    Ok(Json(found))
}

/// `POST /api/memberships`: sell a package, optionally with its payment.
pub async fn create_membership(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewMembership>,
) -> Result<(StatusCode, Json<Membership>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    if body.payment.is_some() {
        caller.access.require(Capability::RecordPayments)?;
    }
    let created = membership::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn cancel_membership(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Membership>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageMembers)?;
    Ok(Json(membership::cancel(&state.pool, gym_id, caller.user.id, id).await?))
}
