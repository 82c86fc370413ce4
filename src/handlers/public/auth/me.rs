use axum::{extract::Extension, http::header, response::IntoResponse, Json};

use crate::identity::RequestContext;

/// GET /auth/me - Effective identity of the caller
///
/// Same identity every downstream query is scoped to, so the client can
/// render the impersonation banner. Never cached.
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "robin@clinic.example" },
///   "isImpersonating": true,
///   "practitionerName": "Robin Alder",
///   "adminReturnUrl": "/admin/practitioners"
/// }
/// ```
pub async fn me(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], Json(ctx.identity))
}
