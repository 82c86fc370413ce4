use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// An admin acting as a practitioner. Rows are never deleted; ending sets `ended_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ImpersonationSession {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub practitioner_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImpersonationSession {
    pub fn new(admin_id: Uuid, practitioner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_id,
            practitioner_id,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.started_at > ttl
    }
}
