use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{AdminEventType, NewAdminEvent};
use crate::identity::{identity_changed, RequestContext};

/// POST /admin/logout - End the admin portal session
///
/// Also ends any impersonation the browser still carries. Always succeeds
/// and always expires the admin and carrier cookies.
pub async fn admin_logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: SignedCookieJar,
) -> impl IntoResponse {
    if let Some(admin) = &ctx.admin {
        if ctx.carried.session_id.is_some() {
            state.impersonation.end(ctx.carried.session_id, Some(admin)).await;
        }

        state
            .audit
            .record(NewAdminEvent::by_admin(admin.admin_id, &admin.email, AdminEventType::Logout).description("Admin signed out"))
            .await;

        tracing::info!("Admin {} signed out", admin.admin_id);
    }

    let jar = state.carrier.clear_impersonation(jar);
    let jar = state.carrier.clear_admin_session(jar);

    (jar, identity_changed(), Json(json!({ "success": true })))
}
