//! Membership packages. Anyone in the gym sees the active catalogue.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::package::{self, NewPackage, Package, PackagePatch};
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// `GET /api/packages`: callers without `ManagePackages` only see active ones.
pub async fn list_packages(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<PackageQuery>,
) -> Result<Json<Vec<Package>>, ServiceError> {
    let gym_id = caller.access.gym_id.ok_or(ServiceError::Forbidden("no gym associated with account"))?;
    let active_only = query.active_only || !caller.access.role.allows(Capability::ManagePackages);
    Ok(Json(package::list(&state.pool, gym_id, active_only).await?))
}

pub async fn get_package(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Package>, ServiceError> {
    let gym_id = caller.access.gym_id.ok_or(ServiceError::Forbidden("no gym associated with account"))?;
    let found = package::get(&state.pool, gym_id, id).await?;
    if !found.active && !caller.access.role.allows(Capability::ManagePackages) {
        return Err(ServiceError::NotFound("package"));
    }
    Ok(Json(found))
}

pub async fn create_package(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewPackage>,
) -> Result<(StatusCode, Json<Package>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManagePackages)?;
    let created = package::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_package(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<PackagePatch>,
) -> Result<Json<Package>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManagePackages)?;
    Ok(Json(package::update(&state.pool, gym_id, caller.user.id, id, body).await?))
}

/// `DELETE /api/packages/{id}`: 409 once memberships reference it; deactivate instead.
pub async fn delete_package(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManagePackages)?;
    package::delete(&state.pool, gym_id, caller.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
