use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use super::auth::Caller;
use crate::services::access::Capability;
use crate::services::activity::{self, ActivityLog};
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub entity: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/activity`: newest first, optionally for one entity kind.
pub async fn list_activity(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ServiceError> {
    let gym_id = caller.access.require(Capability::ViewActivity)?;
    Ok(Json(activity::list(&state.pool, gym_id, query.entity.as_deref(), query.limit).await?))
}
