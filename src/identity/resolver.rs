use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::lookup::PrivilegedLookup;
use super::{EffectiveIdentity, ImpersonationContext, RequestCredentials, ResolutionFallback, UserRef};
use crate::auth::decode_user_token;
use crate::config::SecurityConfig;
use crate::database::{SessionStore, Stores};

/// Turns request credentials into the identity downstream queries run as.
///
/// Read-only. Impersonation is honored only when the carried session row is
/// active, unexpired, targets the carried practitioner, and the practitioner
/// resolves through the privileged lookup. Any miss resolves to no identity.
pub struct IdentityResolver {
    sessions: Arc<dyn SessionStore>,
    lookup: PrivilegedLookup,
    user_token_secret: String,
    impersonation_ttl: Duration,
}

impl IdentityResolver {
    pub fn new(stores: &Stores, security: &SecurityConfig) -> Self {
        Self {
            sessions: stores.sessions.clone(),
            lookup: PrivilegedLookup::new(stores.practitioners.clone()),
            user_token_secret: security.user_token_secret.clone(),
            impersonation_ttl: Duration::minutes(security.impersonation_ttl()),
        }
    }

    pub async fn resolve(&self, credentials: &RequestCredentials) -> EffectiveIdentity {
        let carried = &credentials.impersonation;

        if let (Some(session_id), Some(practitioner_id)) = (carried.session_id, carried.practitioner_id) {
            return match self.resolve_impersonation(session_id, practitioner_id).await {
                Ok(mut identity) => {
                    identity.admin_return_url = carried.return_url.clone();
                    identity
                }
                Err(fallback) => {
                    if fallback.is_error() {
                        tracing::warn!(
                            "Impersonation session {} not honored ({}); treating request as unauthenticated",
                            session_id,
                            fallback
                        );
                    } else {
                        tracing::info!("Impersonation session {} not honored ({})", session_id, fallback);
                    }
                    EffectiveIdentity::unresolved(fallback)
                }
            };
        }

        self.resolve_user(credentials.user_token.as_deref())
    }

    async fn resolve_impersonation(
        &self,
        session_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<EffectiveIdentity, ResolutionFallback> {
        let session = match self.sessions.find(session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(ResolutionFallback::SessionNotFound),
            Err(e) => {
                tracing::warn!("Failed to load impersonation session {}: {}", session_id, e);
                return Err(ResolutionFallback::LookupFailed);
            }
        };

        if !session.is_active() {
            return Err(ResolutionFallback::SessionEnded);
        }
        if session.is_expired(Utc::now(), self.impersonation_ttl) {
            return Err(ResolutionFallback::SessionExpired);
        }
        if session.practitioner_id != practitioner_id {
            return Err(ResolutionFallback::PractitionerMismatch);
        }

        let practitioner = self.lookup.resolve(practitioner_id).await?;

        Ok(EffectiveIdentity {
            user: Some(UserRef {
                id: practitioner.user_id,
                email: practitioner.email,
            }),
            is_impersonating: true,
            practitioner_name: Some(practitioner.name),
            admin_return_url: None,
            impersonation: Some(ImpersonationContext {
                session_id: session.id,
                admin_id: session.admin_id,
                practitioner_id,
            }),
            fallback: None,
        })
    }

    fn resolve_user(&self, token: Option<&str>) -> EffectiveIdentity {
        let Some(token) = token else {
            return EffectiveIdentity::anonymous();
        };

        match decode_user_token(token, &self.user_token_secret) {
            Ok(claims) => EffectiveIdentity::user(claims.sub, claims.email),
            Err(e) => {
                tracing::debug!("Ignoring user session token: {}", e);
                EffectiveIdentity::anonymous()
            }
        }
    }
}
