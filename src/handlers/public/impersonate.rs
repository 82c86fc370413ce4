use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Serialize;

use crate::app::AppState;
use crate::identity::{identity_changed, sanitize_return_url, RequestContext};

#[derive(Debug, Serialize)]
pub struct EndImpersonationResponse {
    pub success: bool,
    pub redirect: String,
}

/// POST /impersonate/end - Stop impersonating
///
/// Idempotent and infallible from the client's side: whatever happened to
/// the session row, the three carrier cookies are expired in this response.
///
/// The redirect is the carried return URL, else the admin default when an
/// admin session is present, else `/`.
pub async fn end(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: SignedCookieJar,
) -> impl IntoResponse {
    let outcome = state.impersonation.end(ctx.carried.session_id, ctx.admin.as_ref()).await;
    if !outcome.persisted {
        tracing::warn!(
            "Clearing impersonation cookies although session {:?} could not be marked ended",
            outcome.session_id
        );
    }

    let fallback = if ctx.admin.is_some() {
        state.config.security.default_admin_return_url.as_str()
    } else {
        "/"
    };
    let redirect = sanitize_return_url(ctx.carried.return_url.as_deref(), fallback);

    let jar = state.carrier.clear_impersonation(jar);

    (
        jar,
        identity_changed(),
        Json(EndImpersonationResponse {
            success: true,
            redirect,
        }),
    )
}
