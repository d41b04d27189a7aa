//! Gym registration and settings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use super::auth::Caller;
use crate::services::gym::{self, Gym, GymPatch, NewGym};
use crate::services::ServiceError;
use crate::state::AppState;

/// `POST /api/gyms`: an unaffiliated user registers a gym and becomes its owner.
pub async fn create_gym(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewGym>,
) -> Result<(StatusCode, Json<Gym>), ServiceError> {
    let gym = gym::create(&state.pool, &caller.access, body).await?;
    Ok((StatusCode::CREATED, Json(gym)))
}

/// `GET /api/gyms/current`: the gym the caller belongs to.
pub async fn current_gym(State(state): State<AppState>, caller: Caller) -> Result<Json<Gym>, ServiceError> {
    let gym_id = caller.access.gym_id.ok_or(ServiceError::NotFound("gym"))?;
    Ok(Json(gym::get(&state.pool, gym_id).await?))
}

pub async fn update_gym(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<GymPatch>,
) -> Result<Json<Gym>, ServiceError> {
    Ok(Json(gym::update(&state.pool, &caller.access, body).await?))
}
