use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{AdminAccount, AdminEvent, ImpersonationSession, NewAdminEvent, PractitionerRecord};
use super::stores::{AdminDirectory, AuditStore, PractitionerDirectory, SessionStore};

/// In-process stores for local development (`DATABASE_BACKEND=memory`) and tests
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, ImpersonationSession>>,
    practitioners: RwLock<HashMap<Uuid, PractitionerRecord>>,
    events: RwLock<Vec<AdminEvent>>,
    admins: RwLock<HashMap<Uuid, AdminAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_practitioner(&self, record: PractitionerRecord) {
        self.practitioners.write().await.insert(record.id, record);
    }

    pub async fn remove_practitioner(&self, practitioner_id: Uuid) -> Option<PractitionerRecord> {
        self.practitioners.write().await.remove(&practitioner_id)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &ImpersonationSession) -> Result<(), DatabaseError> {
        self.sessions.write().await.insert(session.id, session.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn end(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.ended_at.is_none() => {
                session.ended_at = Some(ended_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_active(&self, limit: i64) -> Result<Vec<ImpersonationSession>, DatabaseError> {
        let mut active: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        active.truncate(limit.max(0) as usize);
        Ok(active)
    }
}

#[async_trait]
impl PractitionerDirectory for MemoryStore {
    async fn lookup(&self, practitioner_id: Uuid) -> Result<Option<PractitionerRecord>, DatabaseError> {
        Ok(self.practitioners.read().await.get(&practitioner_id).cloned())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, event: NewAdminEvent) -> Result<AdminEvent, DatabaseError> {
        let event = event.into_event();
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AdminEvent>, DatabaseError> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit.max(0) as usize).cloned().collect())
    }
}

#[async_trait]
impl AdminDirectory for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, DatabaseError> {
        Ok(self
            .admins
            .read()
            .await
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, email: &str, name: &str, password_hash: &str) -> Result<AdminAccount, DatabaseError> {
        let admin = AdminAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        self.admins.write().await.insert(admin.id, admin.clone());
        Ok(admin)
    }
}
