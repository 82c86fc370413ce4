use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::identity::RequestContext;

/// Rejects requests without a valid admin session and exposes the
/// [`AdminSession`](crate::auth::AdminSession) as an extension.
///
/// Must run inside `identity_middleware`.
pub async fn require_admin_middleware(mut request: Request, next: Next) -> Response {
    let admin = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.admin.clone());

    let Some(admin) = admin else {
        tracing::info!("Rejected {} {}: no admin session", request.method(), request.uri().path());
        return ApiError::unauthorized("Admin session required").into_response();
    };

    request.extensions_mut().insert(admin);
    next.run(request).await
}
