//! Payments ledger.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::payment::{self, NewPayment, Payment, PaymentFilter};
use crate::services::ServiceError;
use crate::state::AppState;

/// `GET /api/payments`: filters: `member_id`, `method`, `from`, `to`.
pub async fn list_payments(
    State(state): State<AppState>,
    caller: Caller,
    Query(mut filter): Query<PaymentFilter>,
) -> Result<Json<Vec<Payment>>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::RecordPayments)?;
    if own.is_some() {
        filter.member_id = own;
    }
    Ok(Json(payment::list(&state.pool, gym_id, &filter).await?))
}

pub async fn get_payment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ServiceError> {
    let (gym_id, own) = caller.read_scope(Capability::RecordPayments)?;
    let found = payment::get(&state.pool, gym_id, id).await?;
    if own.is_some_and(|member_id| member_id != found.member_id) {
        return Err(ServiceError::NotFound("payment"));
    }
    Ok(Json(found))
}

pub async fn create_payment(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), ServiceError> {
    let gym_id = caller.access.require(Capability::RecordPayments)?;
    let created = payment::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
