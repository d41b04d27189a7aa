//! Refund requests: front desk asks, manager or owner decides.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::refund::{self, NewRefund, RefundFilter, RefundRequest, RefundReview};
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_refunds(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<RefundFilter>,
) -> Result<Json<Vec<RefundRequest>>, ServiceError> {
    let gym_id = caller.access.require(Capability::RequestRefunds)?;
    Ok(Json(refund::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_refund(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundRequest>, ServiceError> {
    let gym_id = caller.access.require(Capability::RequestRefunds)?;
    Ok(Json(refund::get(&state.pool, gym_id, id).await?))
}

/// `POST /api/refunds`: 400 when the amount exceeds what is still refundable.
pub async fn create_refund(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewRefund>,
) -> Result<(StatusCode, Json<RefundRequest>), ServiceError> {
    let gym_id = caller.access.require(Capability::RequestRefunds)?;
    let created = refund::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /api/refunds/{id}/review`: approve or reject a pending request.
pub async fn review_refund(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<RefundReview>,
) -> Result<Json<RefundRequest>, ServiceError> {
    let gym_id = caller.access.require(Capability::ReviewRefunds)?;
    Ok(Json(refund::review(&state.pool, gym_id, caller.user.id, id, body).await?))
}
