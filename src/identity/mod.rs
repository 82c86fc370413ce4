//! Effective identity of a request.
//!
//! Every request passes through a single boundary (`middleware::identity`)
//! that reads the carrier cookies, resolves who the request acts as, and
//! attaches a [`RequestContext`] to the request extensions. Handlers read
//! the context; nothing below the boundary touches cookies or tokens.

pub mod carrier;
pub mod lookup;
pub mod resolver;

use axum::http::{HeaderName, HeaderValue};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AdminSession;

pub use carrier::{sanitize_return_url, signing_key, CookieCarrier};
pub use lookup::PrivilegedLookup;
pub use resolver::IdentityResolver;

/// Response header telling clients to drop any cached identity
pub const IDENTITY_INVALIDATE_HEADER: &str = "x-identity-invalidate";

pub fn identity_changed() -> [(HeaderName, HeaderValue); 1] {
    [(
        HeaderName::from_static(IDENTITY_INVALIDATE_HEADER),
        HeaderValue::from_static("1"),
    )]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

/// The active impersonation behind an impersonated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationContext {
    pub session_id: Uuid,
    pub admin_id: Uuid,
    pub practitioner_id: Uuid,
}

/// Why impersonation cookies were present but not honored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFallback {
    SessionNotFound,
    SessionEnded,
    SessionExpired,
    PractitionerMismatch,
    PractitionerNotFound,
    AccountNotLinked,
    LookupFailed,
}

impl ResolutionFallback {
    /// Lookup errors are system faults; everything else is an expected miss.
    pub fn is_error(&self) -> bool {
        matches!(self, ResolutionFallback::LookupFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionFallback::SessionNotFound => "session_not_found",
            ResolutionFallback::SessionEnded => "session_ended",
            ResolutionFallback::SessionExpired => "session_expired",
            ResolutionFallback::PractitionerMismatch => "practitioner_mismatch",
            ResolutionFallback::PractitionerNotFound => "practitioner_not_found",
            ResolutionFallback::AccountNotLinked => "account_not_linked",
            ResolutionFallback::LookupFailed => "lookup_failed",
        }
    }
}

impl std::fmt::Display for ResolutionFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity downstream queries are scoped to. Recomputed per request, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveIdentity {
    pub user: Option<UserRef>,
    pub is_impersonating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practitioner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_return_url: Option<String>,
    #[serde(skip)]
    pub impersonation: Option<ImpersonationContext>,
    #[serde(skip)]
    pub fallback: Option<ResolutionFallback>,
}

impl EffectiveIdentity {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_impersonating: false,
            practitioner_name: None,
            admin_return_url: None,
            impersonation: None,
            fallback: None,
        }
    }

    /// Unauthenticated, remembering why impersonation was refused
    pub fn unresolved(fallback: ResolutionFallback) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::anonymous()
        }
    }

    pub fn user(id: Uuid, email: String) -> Self {
        Self {
            user: Some(UserRef { id, email }),
            ..Self::anonymous()
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Impersonation values as carried by the request's cookies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarriedImpersonation {
    pub session_id: Option<Uuid>,
    pub practitioner_id: Option<Uuid>,
    pub return_url: Option<String>,
}

/// Everything the boundary extracted from a request before resolution
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    pub impersonation: CarriedImpersonation,
    pub user_token: Option<String>,
}

/// Per-request context handed to every handler
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: EffectiveIdentity,
    pub admin: Option<AdminSession>,
    pub carried: CarriedImpersonation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anonymous_identity_shape() {
        let body = serde_json::to_value(EffectiveIdentity::anonymous()).unwrap();
        assert_eq!(body, json!({ "user": null, "isImpersonating": false }));
    }

    #[test]
    fn test_fallback_reason_is_not_serialized() {
        let identity = EffectiveIdentity::unresolved(ResolutionFallback::LookupFailed);
        let body = serde_json::to_value(&identity).unwrap();
        assert_eq!(body, json!({ "user": null, "isImpersonating": false }));
        assert!(identity.fallback.unwrap().is_error());
    }
}
