//! Gym expenses and the per-category report.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::expense::{self, CategoryTotal, Expense, ExpenseFilter, NewExpense};
use crate::services::ServiceError;
use crate::state::AppState;

pub async fn list_expenses(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<ExpenseFilter>,
) -> Result<Json<Vec<Expense>>, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageExpenses)?;
    Ok(Json(expense::list(&state.pool, gym_id, &filter).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), ServiceError> {
    let gym_id = caller.access.require(Capability::ManageExpenses)?;
    let created = expense::create(&state.pool, gym_id, caller.user.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let gym_id = caller.access.require(Capability::ManageExpenses)?;
    expense::delete(&state.pool, gym_id, caller.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// `GET /api/expenses/summary`: totals by category, largest first.
pub async fn expense_summary(
    State(state): State<AppState>,
    caller: Caller,
    Query(range): Query<SummaryQuery>,
) -> Result<Json<Vec<CategoryTotal>>, ServiceError> {
    let gym_id = caller.access.require(Capability::ViewReports)?;
    Ok(Json(expense::totals_by_category(&state.pool, gym_id, range.from, range.to).await?))
}
