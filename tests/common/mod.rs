#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use practice_api::app::{router, AppState};
use practice_api::auth::{hash_password, UserClaims};
use practice_api::config::{AppConfig, StoreBackend};
use practice_api::database::models::{AdminAccount, PractitionerRecord};
use practice_api::database::{MemoryStore, Stores};

pub const ADMIN_EMAIL: &str = "support@practice.example";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A router served on a free local port, backed by a fresh memory store.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub config: AppConfig,
    pub router: Router,
}

pub struct SeededPractitioner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StoreBackend::Memory;
    config.api.enable_request_logging = false;
    config
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_, _| {}).await
    }

    /// Like `spawn`, but lets the test replace individual store handles
    /// (for example with one that fails) before the router is built.
    pub async fn spawn_with(configure: impl FnOnce(&Arc<MemoryStore>, &mut Stores)) -> Result<Self> {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let mut stores = Stores::memory(store.clone());
        configure(&store, &mut stores);
        let router = router(AppState::new(config.clone(), stores.clone()));

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let app = router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            stores,
            config,
            router,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Browser-like client: keeps cookies, does not follow redirects
    pub fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?)
    }

    pub async fn seed_admin(&self) -> Result<AdminAccount> {
        let hash = hash_password(ADMIN_PASSWORD)?;
        Ok(self.stores.admins.create(ADMIN_EMAIL, "Support Admin", &hash).await?)
    }

    pub async fn seed_practitioner(&self, name: &str) -> SeededPractitioner {
        let practitioner = SeededPractitioner {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@clinic.example", name.to_lowercase().replace(' ', ".")),
        };

        self.store
            .insert_practitioner(PractitionerRecord {
                id: practitioner.id,
                user_id: Some(practitioner.user_id),
                name: practitioner.name.clone(),
                email: Some(practitioner.email.clone()),
            })
            .await;

        practitioner
    }

    /// Session token as the external auth provider would issue it
    pub fn user_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = UserClaims {
            sub: user_id,
            email: email.to_string(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.security.user_token_secret.as_bytes()),
        )?)
    }

    /// Sign in as the seeded admin on `client`
    pub async fn login(&self, client: &reqwest::Client) -> Result<()> {
        let res = client
            .post(self.url("/admin/login"))
            .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status().is_success(), "admin login failed: {}", res.status());
        Ok(())
    }
}
