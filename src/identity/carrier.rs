use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};
use url::Url;
use uuid::Uuid;

use super::{CarriedImpersonation, RequestCredentials};
use crate::config::{CookieNames, SecurityConfig};
use crate::database::models::ImpersonationSession;

/// Derive the 64-byte cookie signing key from the configured session secret
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Reads and writes the cookies that carry identity between requests.
///
/// Carrier and admin cookies are signed; a tampered or foreign value reads
/// as absent. The practitioner session cookie belongs to the auth provider
/// and is read from the plain jar (or an `Authorization: Bearer` header).
#[derive(Clone, Debug)]
pub struct CookieCarrier {
    names: CookieNames,
    secure: bool,
    impersonation_max_age: Duration,
    admin_max_age: Duration,
}

impl CookieCarrier {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            names: security.cookies.clone(),
            secure: security.secure_cookies,
            impersonation_max_age: Duration::minutes(security.impersonation_ttl()),
            admin_max_age: Duration::hours(security.admin_session_lifetime()),
        }
    }

    pub fn read(&self, signed: &SignedCookieJar, plain: &CookieJar, headers: &HeaderMap) -> RequestCredentials {
        let uuid = |name: &str| signed.get(name).and_then(|c| Uuid::parse_str(c.value()).ok());

        RequestCredentials {
            impersonation: CarriedImpersonation {
                session_id: uuid(&self.names.session_id),
                practitioner_id: uuid(&self.names.practitioner_id),
                return_url: signed
                    .get(&self.names.return_url)
                    .and_then(|c| urlencoding::decode(c.value()).ok().map(|v| v.into_owned()))
                    .filter(|v| !v.is_empty()),
            },
            user_token: bearer_token(headers)
                .or_else(|| plain.get(&self.names.user_session).map(|c| c.value().to_string())),
        }
    }

    pub fn admin_token(&self, signed: &SignedCookieJar) -> Option<String> {
        signed
            .get(&self.names.admin_session)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Sets all three carrier cookies for a freshly started session.
    /// The return URL is percent-encoded so `;`, `,` and `"` survive the cookie.
    pub fn write_impersonation(
        &self,
        jar: SignedCookieJar,
        session: &ImpersonationSession,
        return_url: &str,
    ) -> SignedCookieJar {
        let max_age = self.impersonation_max_age;
        jar.add(self.cookie(&self.names.session_id, session.id.to_string(), max_age))
            .add(self.cookie(&self.names.practitioner_id, session.practitioner_id.to_string(), max_age))
            .add(self.cookie(&self.names.return_url, urlencoding::encode(return_url).into_owned(), max_age))
    }

    /// Expires all three carrier cookies, whether or not the request carried them
    pub fn clear_impersonation(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.add(self.expired(&self.names.session_id))
            .add(self.expired(&self.names.practitioner_id))
            .add(self.expired(&self.names.return_url))
    }

    pub fn write_admin_session(&self, jar: SignedCookieJar, token: String) -> SignedCookieJar {
        jar.add(self.cookie(&self.names.admin_session, token, self.admin_max_age))
    }

    pub fn clear_admin_session(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.add(self.expired(&self.names.admin_session))
    }

    fn cookie(&self, name: &str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }

    fn expired(&self, name: &str) -> Cookie<'static> {
        Cookie::build((name.to_string(), String::new()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

/// Extract a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Accept only same-origin relative paths; anything else becomes `default`.
pub fn sanitize_return_url(candidate: Option<&str>, default: &str) -> String {
    candidate
        .and_then(same_origin_path)
        .unwrap_or_else(|| default.to_string())
}

fn same_origin_path(candidate: &str) -> Option<String> {
    if !candidate.starts_with('/') || candidate.starts_with("//") || candidate.contains('\\') {
        return None;
    }

    let base = Url::parse("http://portal.internal/").ok()?;
    let joined = base.join(candidate).ok()?;
    if joined.host_str() != base.host_str() {
        return None;
    }

    let mut path = joined.path().to_string();
    if let Some(query) = joined.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}
