use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::AdminEvent;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

/// GET /admin/events?limit=N - Most recent audit events, newest first
pub async fn events_list(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> ApiResult<Vec<AdminEvent>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let events = state.stores.audit.recent(limit).await?;
    Ok(ApiResponse::success(events))
}
