use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::audit_service::AuditLogger;
use crate::auth::AdminSession;
use crate::database::models::{AdminEventType, ImpersonationSession, NewAdminEvent, PractitionerIdentity};
use crate::database::{DatabaseError, SessionStore, Stores};
use crate::error::ApiError;
use crate::identity::{PrivilegedLookup, ResolutionFallback};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("practitioner {0} cannot be impersonated ({1})")]
    PractitionerUnavailable(Uuid, ResolutionFallback),

    #[error(transparent)]
    Persistence(#[from] DatabaseError),
}

impl From<StartError> for ApiError {
    fn from(err: StartError) -> Self {
        match err {
            StartError::PractitionerUnavailable(_, ResolutionFallback::LookupFailed) => {
                ApiError::internal_server_error("Failed to start impersonation")
            }
            StartError::PractitionerUnavailable(id, _) => {
                ApiError::not_found(format!("Practitioner {} not found or has no linked account", id))
            }
            StartError::Persistence(_) => ApiError::internal_server_error("Failed to start impersonation"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartedImpersonation {
    pub session: ImpersonationSession,
    pub practitioner: PractitionerIdentity,
}

/// What ending a session did. Ending never fails from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOutcome {
    pub session_id: Option<Uuid>,
    /// This call set `ended_at`.
    pub ended: bool,
    /// The store accepted the update (or there was nothing to update).
    pub persisted: bool,
}

/// Starts and ends impersonation sessions
pub struct ImpersonationService {
    sessions: Arc<dyn SessionStore>,
    lookup: PrivilegedLookup,
    audit: AuditLogger,
}

impl ImpersonationService {
    pub fn new(stores: &Stores, audit: AuditLogger) -> Self {
        Self {
            sessions: stores.sessions.clone(),
            lookup: PrivilegedLookup::new(stores.practitioners.clone()),
            audit,
        }
    }

    /// Begin impersonating `practitioner_id`. `previous` is the session the
    /// admin's browser still carries, if any; it is ended first.
    pub async fn start(
        &self,
        admin: &AdminSession,
        practitioner_id: Uuid,
        previous: Option<Uuid>,
    ) -> Result<StartedImpersonation, StartError> {
        let practitioner = self
            .lookup
            .resolve(practitioner_id)
            .await
            .map_err(|fallback| StartError::PractitionerUnavailable(practitioner_id, fallback))?;

        if previous.is_some() {
            self.end(previous, Some(admin)).await;
        }

        let session = ImpersonationSession::new(admin.admin_id, practitioner_id);
        if let Err(e) = self.sessions.create(&session).await {
            tracing::error!(
                "Failed to create impersonation session for admin {} -> practitioner {}: {}",
                admin.admin_id,
                practitioner_id,
                e
            );
            return Err(e.into());
        }

        self.audit
            .record(
                NewAdminEvent::by_admin(admin.admin_id, &admin.email, AdminEventType::ImpersonationStarted)
                    .practitioner(practitioner_id)
                    .description(format!(
                        "Started impersonating {} <{}> (session {})",
                        practitioner.name, practitioner.email, session.id
                    )),
            )
            .await;

        tracing::info!(
            "Admin {} started impersonating practitioner {} (session {})",
            admin.admin_id,
            practitioner_id,
            session.id
        );

        Ok(StartedImpersonation { session, practitioner })
    }

    /// End the carried session. A missing id, an already-ended row, and a
    /// failed update all return normally so the caller can clear cookies.
    pub async fn end(&self, session_id: Option<Uuid>, admin: Option<&AdminSession>) -> EndOutcome {
        let Some(session_id) = session_id else {
            tracing::debug!("No impersonation session carried; nothing to end");
            return EndOutcome {
                session_id: None,
                ended: false,
                persisted: true,
            };
        };

        let (ended, persisted) = match self.sessions.end(session_id, Utc::now()).await {
            Ok(ended) => (ended, true),
            Err(e) => {
                tracing::error!("Failed to mark impersonation session {} ended: {}", session_id, e);
                (false, false)
            }
        };

        if let Some(admin) = admin {
            if ended || !persisted {
                self.record_end(session_id, admin, persisted).await;
            }
        }

        if ended {
            tracing::info!("Impersonation session {} ended", session_id);
        }

        EndOutcome {
            session_id: Some(session_id),
            ended,
            persisted,
        }
    }

    /// End a session from an operator tool, recorded with a `system` actor
    pub async fn end_as_system(&self, session_id: Uuid, reason: &str) -> Result<bool, DatabaseError> {
        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("impersonation session {}", session_id)))?;

        let ended = self.sessions.end(session_id, Utc::now()).await?;
        if ended {
            self.audit
                .record(
                    NewAdminEvent::by_system(AdminEventType::ImpersonationEnded)
                        .practitioner(session.practitioner_id)
                        .description(format!(
                            "Session {} (admin {}) ended by system: {}",
                            session_id, session.admin_id, reason
                        )),
                )
                .await;
        }
        Ok(ended)
    }

    pub async fn active_sessions(&self, limit: i64) -> Result<Vec<ImpersonationSession>, DatabaseError> {
        self.sessions.list_active(limit).await
    }

    async fn record_end(&self, session_id: Uuid, admin: &AdminSession, persisted: bool) {
        let practitioner_id = match self.sessions.find(session_id).await {
            Ok(session) => session.map(|s| s.practitioner_id),
            Err(_) => None,
        };

        let description = if persisted {
            format!("Ended impersonation session {}", session_id)
        } else {
            format!("Ended impersonation session {} (update not persisted)", session_id)
        };

        let mut event = NewAdminEvent::by_admin(admin.admin_id, &admin.email, AdminEventType::ImpersonationEnded)
            .description(description);
        if let Some(practitioner_id) = practitioner_id {
            event = event.practitioner(practitioner_id);
        }

        self.audit.record(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::AdminEvent;
    use crate::testing::TestContext;
    use async_trait::async_trait;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_start_creates_session_and_audit_event() {
        let ctx = TestContext::new();
        let admin = ctx.admin_session();
        let practitioner = ctx.seed_practitioner("Morgan Hazel").await;

        let started = ctx
            .service()
            .start(&admin, practitioner.practitioner_id, None)
            .await
            .unwrap();

        let stored = ctx.stores.sessions.find(started.session.id).await.unwrap().unwrap();
        assert_eq!(stored.admin_id, admin.admin_id);
        assert!(stored.is_active());

        let events = ctx.stores.audit.recent(10).await.unwrap();
        assert_eq!(events[0].event_type, "admin.impersonation_started");
        assert_eq!(events[0].practitioner_id, Some(practitioner.practitioner_id));
    }

    #[tokio::test]
    async fn test_start_for_unknown_practitioner_is_not_found() {
        let ctx = TestContext::new();
        let err = ctx
            .service()
            .start(&ctx.admin_session(), Uuid::new_v4(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StartError::PractitionerUnavailable(_, ResolutionFallback::PractitionerNotFound)
        ));
        assert_eq!(ApiError::from(err).status_code(), 404);
        assert!(ctx.stores.sessions.list_active(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_ends_the_previous_session() {
        let ctx = TestContext::new();
        let admin = ctx.admin_session();
        let first = ctx.seed_practitioner("First Practitioner").await;
        let second = ctx.seed_practitioner("Second Practitioner").await;
        let service = ctx.service();

        let a = service.start(&admin, first.practitioner_id, None).await.unwrap();
        let b = service
            .start(&admin, second.practitioner_id, Some(a.session.id))
            .await
            .unwrap();

        let active = service.active_sessions(10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.session.id);
    }

    #[tokio::test]
    async fn test_end_twice_only_sets_ended_at_once() {
        let ctx = TestContext::new();
        let admin = ctx.admin_session();
        let practitioner = ctx.seed_practitioner("Quinn Ivy").await;
        let service = ctx.service();
        let started = service.start(&admin, practitioner.practitioner_id, None).await.unwrap();

        let first = service.end(Some(started.session.id), Some(&admin)).await;
        assert!(first.ended && first.persisted);
        let ended_at = ctx.stores.sessions.find(started.session.id).await.unwrap().unwrap().ended_at;
        assert!(ended_at.is_some());

        let second = service.end(Some(started.session.id), Some(&admin)).await;
        assert!(!second.ended && second.persisted);
        let after = ctx.stores.sessions.find(started.session.id).await.unwrap().unwrap().ended_at;
        assert_eq!(after, ended_at);

        let ended_events = ctx
            .stores
            .audit
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == "admin.impersonation_ended")
            .collect::<Vec<_>>();
        assert_eq!(ended_events.len(), 1);
        assert_eq!(ended_events[0].actor_id, Some(admin.admin_id));
    }

    #[tokio::test]
    async fn test_end_without_session_is_a_successful_no_op() {
        let ctx = TestContext::new();
        let outcome = ctx.service().end(None, None).await;

        assert_eq!(
            outcome,
            EndOutcome {
                session_id: None,
                ended: false,
                persisted: true
            }
        );
    }

    #[tokio::test]
    async fn test_end_without_admin_writes_no_event() {
        let ctx = TestContext::new();
        let practitioner = ctx.seed_practitioner("Ro Juniper").await;
        let session = ctx.start_session(practitioner.practitioner_id).await;

        let outcome = ctx.service().end(Some(session.id), None).await;

        assert!(outcome.ended);
        assert!(ctx.stores.audit.recent(10).await.unwrap().is_empty());
    }

    struct UnwritableSessions;

    #[async_trait]
    impl SessionStore for UnwritableSessions {
        async fn create(&self, _session: &ImpersonationSession) -> Result<(), DatabaseError> {
            Err(DatabaseError::Unavailable("read-only replica".to_string()))
        }

        async fn find(&self, _id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError> {
            Err(DatabaseError::Unavailable("read-only replica".to_string()))
        }

        async fn end(&self, _id: Uuid, _at: DateTime<Utc>) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Unavailable("read-only replica".to_string()))
        }

        async fn list_active(&self, _limit: i64) -> Result<Vec<ImpersonationSession>, DatabaseError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_failed_end_update_still_returns_outcome() {
        let mut ctx = TestContext::new();
        ctx.stores.sessions = Arc::new(UnwritableSessions);
        let admin = ctx.admin_session();

        let outcome = ctx.service().end(Some(Uuid::new_v4()), Some(&admin)).await;

        assert!(!outcome.ended);
        assert!(!outcome.persisted);
        let events: Vec<AdminEvent> = ctx.stores.audit.recent(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].description.contains("not persisted"));
    }

    #[tokio::test]
    async fn test_failed_create_is_a_persistence_error() {
        let mut ctx = TestContext::new();
        let practitioner = ctx.seed_practitioner("Val Kapok").await;
        ctx.stores.sessions = Arc::new(UnwritableSessions);

        let err = ctx
            .service()
            .start(&ctx.admin_session(), practitioner.practitioner_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, StartError::Persistence(_)));
        assert_eq!(ApiError::from(err).status_code(), 500);
        assert!(ctx.stores.audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_system_end_records_system_actor() {
        let ctx = TestContext::new();
        let practitioner = ctx.seed_practitioner("Tam Larch").await;
        let session = ctx.start_session(practitioner.practitioner_id).await;

        assert!(ctx.service().end_as_system(session.id, "stale").await.unwrap());
        assert!(!ctx.service().end_as_system(session.id, "stale").await.unwrap());

        let events = ctx.stores.audit.recent(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor_type, crate::database::models::ActorType::System);
    }
}
