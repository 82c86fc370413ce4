use axum::extract::State;

use crate::app::AppState;
use crate::database::models::ImpersonationSession;
use crate::middleware::{ApiResponse, ApiResult};

const ACTIVE_SESSION_LIMIT: i64 = 100;

/// GET /admin/impersonation/sessions - Sessions that have not been ended, newest first
pub async fn sessions_list(State(state): State<AppState>) -> ApiResult<Vec<ImpersonationSession>> {
    let sessions = state.impersonation.active_sessions(ACTIVE_SESSION_LIMIT).await?;
    Ok(ApiResponse::success(sessions))
}
