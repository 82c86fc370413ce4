use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::memory::MemoryStore;
use super::models::{AdminAccount, AdminEvent, ImpersonationSession, NewAdminEvent, PractitionerRecord};
use super::postgres::PgStore;

/// Persistence for impersonation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &ImpersonationSession) -> Result<(), DatabaseError>;

    async fn find(&self, id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError>;

    /// Sets `ended_at` unless already set. Returns whether this call ended the session.
    async fn end(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    async fn list_active(&self, limit: i64) -> Result<Vec<ImpersonationSession>, DatabaseError>;
}

/// Privileged practitioner lookup. Implementations must not apply per-caller scoping.
#[async_trait]
pub trait PractitionerDirectory: Send + Sync {
    async fn lookup(&self, practitioner_id: Uuid) -> Result<Option<PractitionerRecord>, DatabaseError>;
}

/// Append-only admin audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: NewAdminEvent) -> Result<AdminEvent, DatabaseError>;

    async fn recent(&self, limit: i64) -> Result<Vec<AdminEvent>, DatabaseError>;
}

#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, DatabaseError>;

    async fn create(&self, email: &str, name: &str, password_hash: &str) -> Result<AdminAccount, DatabaseError>;
}

/// The store handles the application is wired with
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub practitioners: Arc<dyn PractitionerDirectory>,
    pub audit: Arc<dyn AuditStore>,
    pub admins: Arc<dyn AdminDirectory>,
    pool: Option<PgPool>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            sessions: store.clone(),
            practitioners: store.clone(),
            audit: store.clone(),
            admins: store,
            pool: Some(pool),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            sessions: store.clone(),
            practitioners: store.clone(),
            audit: store.clone(),
            admins: store,
            pool: None,
        }
    }

    /// Memory-backed stores are always healthy
    pub async fn health_check(&self) -> Result<&'static str, DatabaseError> {
        match &self.pool {
            Some(pool) => DatabaseManager::health_check(pool).await.map(|_| "postgres"),
            None => Ok("memory"),
        }
    }
}
