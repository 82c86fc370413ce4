use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AdminSession;
use crate::error::ApiError;
use crate::identity::{identity_changed, sanitize_return_url, RequestContext};
use crate::middleware::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct StartImpersonationRequest {
    pub practitioner_id: Uuid,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartImpersonationResponse {
    pub session_id: Uuid,
    pub practitioner_id: Uuid,
    pub practitioner_name: String,
    pub redirect: String,
}

/// POST /admin/impersonate - Begin acting as a practitioner
///
/// Input:
/// ```json
/// { "practitioner_id": "uuid", "return_url": "/admin/practitioners" }
/// ```
///
/// Sets the three carrier cookies and answers 201 with the new session.
/// `return_url` must be a same-origin path; anything else is replaced by
/// the configured admin default. A session the browser already carries is
/// ended first.
pub async fn impersonate_start(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSession>,
    Extension(ctx): Extension<RequestContext>,
    jar: SignedCookieJar,
    payload: Result<Json<StartImpersonationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let return_url = sanitize_return_url(
        request.return_url.as_deref(),
        &state.config.security.default_admin_return_url,
    );

    let started = state
        .impersonation
        .start(&admin, request.practitioner_id, ctx.carried.session_id)
        .await?;

    let jar = state.carrier.write_impersonation(jar, &started.session, &return_url);

    Ok((
        jar,
        identity_changed(),
        ApiResponse::created(StartImpersonationResponse {
            session_id: started.session.id,
            practitioner_id: started.practitioner.practitioner_id,
            practitioner_name: started.practitioner.name,
            redirect: "/".to_string(),
        }),
    ))
}
