use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AdminSession, UserClaims};
use crate::config::{AppConfig, StoreBackend};
use crate::database::models::{ImpersonationSession, PractitionerIdentity, PractitionerRecord};
use crate::database::{MemoryStore, Stores};
use crate::identity::IdentityResolver;
use crate::services::{AuditLogger, ImpersonationService};

/// Memory-backed fixtures for unit tests.
///
/// `stores` is public so a test can swap a single handle for a failing
/// implementation while seeding still goes through `store`.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub config: AppConfig,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Memory;

        Self {
            stores: Stores::memory(store.clone()),
            store,
            config,
        }
    }

    pub async fn seed_practitioner(&self, name: &str) -> PractitionerIdentity {
        let identity = PractitionerIdentity {
            practitioner_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@clinic.example", name.to_lowercase().replace(' ', ".")),
        };

        self.store
            .insert_practitioner(PractitionerRecord {
                id: identity.practitioner_id,
                user_id: Some(identity.user_id),
                name: identity.name.clone(),
                email: Some(identity.email.clone()),
            })
            .await;

        identity
    }

    /// A practitioner row whose invite was never accepted
    pub async fn seed_unlinked_practitioner(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .insert_practitioner(PractitionerRecord {
                id,
                user_id: None,
                name: name.to_string(),
                email: None,
            })
            .await;
        id
    }

    /// A session row started by an arbitrary admin
    pub async fn start_session(&self, practitioner_id: Uuid) -> ImpersonationSession {
        let session = ImpersonationSession::new(Uuid::new_v4(), practitioner_id);
        self.stores.sessions.create(&session).await.unwrap();
        session
    }

    pub fn admin_session(&self) -> AdminSession {
        AdminSession {
            admin_id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
            name: "Ops Admin".to_string(),
        }
    }

    pub fn user_token(&self, user_id: Uuid, email: &str) -> String {
        let now = Utc::now();
        let claims = UserClaims {
            sub: user_id,
            email: email.to_string(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.security.user_token_secret.as_bytes()),
        )
        .unwrap()
    }

    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(&self.stores, &self.config.security)
    }

    pub fn service(&self) -> ImpersonationService {
        ImpersonationService::new(&self.stores, AuditLogger::new(self.stores.audit.clone()))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
