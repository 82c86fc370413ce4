use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};

use crate::app::AppState;
use crate::auth::{decode_admin_token, AdminSession};
use crate::identity::RequestContext;

/// Resolves who the request acts as and attaches a [`RequestContext`].
///
/// Runs on every route. Never rejects: an unreadable or stale credential
/// simply resolves to no identity.
pub async fn identity_middleware(
    State(state): State<AppState>,
    signed: SignedCookieJar,
    plain: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = state.carrier.read(&signed, &plain, request.headers());
    let identity = state.resolver.resolve(&credentials).await;
    let admin = admin_session(&state, &signed);

    tracing::debug!(
        "Request identity: user={:?} impersonating={} admin={:?}",
        identity.user_id(),
        identity.is_impersonating,
        admin.as_ref().map(|a| a.admin_id)
    );

    request.extensions_mut().insert(RequestContext {
        identity,
        admin,
        carried: credentials.impersonation,
    });

    next.run(request).await
}

fn admin_session(state: &AppState, signed: &SignedCookieJar) -> Option<AdminSession> {
    let token = state.carrier.admin_token(signed)?;
    match decode_admin_token(&token, &state.config.security.session_secret) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!("Ignoring admin session cookie: {}", e);
            None
        }
    }
}
