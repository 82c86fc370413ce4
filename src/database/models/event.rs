use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Admin,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Admin => "admin",
            ActorType::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(ActorType::Admin),
            "system" => Some(ActorType::System),
            _ => None,
        }
    }
}

/// Event types written by this service. Stored as dotted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminEventType {
    Login,
    Logout,
    ImpersonationStarted,
    ImpersonationEnded,
}

impl AdminEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminEventType::Login => "admin.login",
            AdminEventType::Logout => "admin.logout",
            AdminEventType::ImpersonationStarted => "admin.impersonation_started",
            AdminEventType::ImpersonationEnded => "admin.impersonation_ended",
        }
    }
}

/// Audit row as stored. `event_type` stays a string so rows written by
/// other parts of the portal still load.
#[derive(Debug, Clone, Serialize)]
pub struct AdminEvent {
    pub id: Uuid,
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub event_type: String,
    pub practitioner_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Raw row shape for `admin_events`
#[derive(Debug, FromRow)]
pub(crate) struct AdminEventRow {
    pub id: Uuid,
    pub actor_type: String,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub event_type: String,
    pub practitioner_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdminEventRow> for AdminEvent {
    type Error = crate::database::DatabaseError;

    fn try_from(row: AdminEventRow) -> Result<Self, Self::Error> {
        let actor_type = ActorType::parse(&row.actor_type).ok_or_else(|| {
            crate::database::DatabaseError::DataCorruption(format!(
                "unknown actor_type '{}' on admin event {}",
                row.actor_type, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            actor_type,
            actor_id: row.actor_id,
            actor_email: row.actor_email,
            event_type: row.event_type,
            practitioner_id: row.practitioner_id,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewAdminEvent {
    pub actor_type: ActorType,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub event_type: AdminEventType,
    pub practitioner_id: Option<Uuid>,
    pub description: String,
}

impl NewAdminEvent {
    pub fn by_admin(admin_id: Uuid, admin_email: &str, event_type: AdminEventType) -> Self {
        Self {
            actor_type: ActorType::Admin,
            actor_id: Some(admin_id),
            actor_email: Some(admin_email.to_string()),
            event_type,
            practitioner_id: None,
            description: String::new(),
        }
    }

    pub fn by_system(event_type: AdminEventType) -> Self {
        Self {
            actor_type: ActorType::System,
            actor_id: None,
            actor_email: None,
            event_type,
            practitioner_id: None,
            description: String::new(),
        }
    }

    pub fn practitioner(mut self, practitioner_id: Uuid) -> Self {
        self.practitioner_id = Some(practitioner_id);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn into_event(self) -> AdminEvent {
        AdminEvent {
            id: Uuid::new_v4(),
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            actor_email: self.actor_email,
            event_type: self.event_type.as_str().to_string(),
            practitioner_id: self.practitioner_id,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}
