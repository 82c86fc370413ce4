use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::event::AdminEventRow;
use super::models::{AdminAccount, AdminEvent, ImpersonationSession, NewAdminEvent, PractitionerRecord};
use super::stores::{AdminDirectory, AuditStore, PractitionerDirectory, SessionStore};

/// Postgres-backed stores over the service-role pool
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create(&self, session: &ImpersonationSession) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO impersonation_sessions (id, admin_id, practitioner_id, started_at, ended_at)
             VALUES ($1, $2, $3, $4, NULL)",
        )
        .bind(session.id)
        .bind(session.admin_id)
        .bind(session.practitioner_id)
        .bind(session.started_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ImpersonationSession>, DatabaseError> {
        let session = sqlx::query_as::<_, ImpersonationSession>(
            "SELECT id, admin_id, practitioner_id, started_at, ended_at
             FROM impersonation_sessions
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn end(&self, id: Uuid, ended_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE impersonation_sessions
             SET ended_at = $2
             WHERE id = $1 AND ended_at IS NULL",
        )
        .bind(id)
        .bind(ended_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self, limit: i64) -> Result<Vec<ImpersonationSession>, DatabaseError> {
        let sessions = sqlx::query_as::<_, ImpersonationSession>(
            "SELECT id, admin_id, practitioner_id, started_at, ended_at
             FROM impersonation_sessions
             WHERE ended_at IS NULL
             ORDER BY started_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[async_trait]
impl PractitionerDirectory for PgStore {
    async fn lookup(&self, practitioner_id: Uuid) -> Result<Option<PractitionerRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, PractitionerRecord>(
            "SELECT id, user_id, name, email
             FROM practitioners
             WHERE id = $1",
        )
        .bind(practitioner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append(&self, event: NewAdminEvent) -> Result<AdminEvent, DatabaseError> {
        let event = event.into_event();

        sqlx::query(
            "INSERT INTO admin_events
                (id, actor_type, actor_id, actor_email, event_type, practitioner_id, description, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(event.actor_type.as_str())
        .bind(event.actor_id)
        .bind(&event.actor_email)
        .bind(&event.event_type)
        .bind(event.practitioner_id)
        .bind(&event.description)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AdminEvent>, DatabaseError> {
        let rows = sqlx::query_as::<_, AdminEventRow>(
            "SELECT id, actor_type, actor_id, actor_email, event_type, practitioner_id, description, created_at
             FROM admin_events
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AdminEvent::try_from).collect()
    }
}

#[async_trait]
impl AdminDirectory for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, DatabaseError> {
        let admin = sqlx::query_as::<_, AdminAccount>(
            "SELECT id, email, name, password_hash, created_at
             FROM admins
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin)
    }

    async fn create(&self, email: &str, name: &str, password_hash: &str) -> Result<AdminAccount, DatabaseError> {
        let admin = sqlx::query_as::<_, AdminAccount>(
            "INSERT INTO admins (id, email, name, password_hash, created_at)
             VALUES ($1, $2, $3, $4, now())
             RETURNING id, email, name, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(admin)
    }
}
