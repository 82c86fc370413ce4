use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::auth::{issue_admin_token, verify_dummy_password, verify_password, AdminClaims};
use crate::database::models::{AdminEventType, NewAdminEvent};
use crate::error::ApiError;
use crate::identity::identity_changed;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /admin/login - Start an admin portal session
///
/// Input: `{ "email": "string", "password": "string" }`
///
/// On success sets the signed admin session cookie and returns
/// `{ "success": true }`. Missing fields are 400, bad credentials 401.
pub async fn admin_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let email = request.email.trim();

    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let account = state.stores.admins.find_by_email(email).await?;
    let Some(account) = account else {
        verify_dummy_password(&request.password);
        tracing::info!("Admin login failed: unknown email");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    match verify_password(&request.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Admin login failed for {}: wrong password", account.id);
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
        Err(e) => {
            tracing::error!("Stored password hash for admin {} is unusable: {}", account.id, e);
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    }

    let claims = AdminClaims::new(
        account.id,
        account.email.clone(),
        account.name.clone(),
        state.config.security.admin_session_lifetime(),
    );
    let token = issue_admin_token(&claims, &state.config.security.session_secret)?;
    let jar = state.carrier.write_admin_session(jar, token);

    state
        .audit
        .record(NewAdminEvent::by_admin(account.id, &account.email, AdminEventType::Login).description("Admin signed in"))
        .await;

    tracing::info!("Admin {} signed in", account.id);

    Ok((jar, identity_changed(), Json(json!({ "success": true }))))
}
