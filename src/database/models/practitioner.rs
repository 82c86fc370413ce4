use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Practitioner row as seen through the service-role connection
#[derive(Debug, Clone, FromRow)]
pub struct PractitionerRecord {
    pub id: Uuid,
    /// Account the practitioner signs in with; absent until the invite is accepted.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
}

/// A practitioner whose underlying account is fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PractitionerIdentity {
    pub practitioner_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl PractitionerRecord {
    /// Only a record with both a linked account and an email resolves.
    pub fn into_identity(self) -> Option<PractitionerIdentity> {
        Some(PractitionerIdentity {
            practitioner_id: self.id,
            user_id: self.user_id?,
            name: self.name,
            email: self.email?,
        })
    }
}
