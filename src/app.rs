use axum::{
    extract::FromRef,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::{ApiConfig, AppConfig, Environment, StoreBackend};
use crate::database::models::PractitionerRecord;
use crate::database::{DatabaseManager, MemoryStore, Stores};
use crate::handlers::{elevated, public};
use crate::identity::{signing_key, CookieCarrier, IdentityResolver, IDENTITY_INVALIDATE_HEADER};
use crate::middleware::{identity_middleware, require_admin_middleware};
use crate::services::{AuditLogger, ImpersonationService};

/// Shared per-process state. Cheap to clone; holds no identity.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub resolver: Arc<IdentityResolver>,
    pub impersonation: Arc<ImpersonationService>,
    pub audit: AuditLogger,
    pub carrier: CookieCarrier,
    cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        let audit = AuditLogger::new(stores.audit.clone());

        Self {
            resolver: Arc::new(IdentityResolver::new(&stores, &config.security)),
            impersonation: Arc::new(ImpersonationService::new(&stores, audit.clone())),
            carrier: CookieCarrier::new(&config.security),
            cookie_key: signing_key(&config.security.session_secret),
            config: Arc::new(config),
            stores,
            audit,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/impersonate", post(elevated::admin::impersonate_start))
        .route("/admin/impersonation/sessions", get(elevated::admin::sessions_list))
        .route("/admin/events", get(elevated::admin::events_list))
        .route_layer(middleware::from_fn(require_admin_middleware));

    let router = Router::new()
        .route("/", get(public::status::root))
        .route("/health", get(public::status::health))
        .route("/auth/me", get(public::auth::me))
        .route("/admin/login", post(public::auth::admin_login))
        .route("/admin/logout", post(public::auth::admin_logout))
        .route("/impersonate/end", post(public::impersonate::end))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), identity_middleware))
        .layer(cors_layer(&state.config.api));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

/// Credentialed CORS for the configured portal origins only
fn cors_layer(api: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = api
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(IDENTITY_INVALIDATE_HEADER)])
        .allow_credentials(true)
}

/// Connect the configured store backend
pub async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::service_pool(&config.database).await?;
            Ok(Stores::postgres(pool))
        }
        StoreBackend::Memory => {
            if config.environment == Environment::Production {
                anyhow::bail!("the memory store backend cannot be used in production");
            }
            tracing::warn!("Using in-memory stores; sessions and audit events are not persisted");

            let store = Arc::new(MemoryStore::new());
            let stores = Stores::memory(store.clone());
            seed_development(&stores, &store).await?;
            Ok(stores)
        }
    }
}

/// Optional fixtures for a memory-backed dev server, driven by `DEV_ADMIN_EMAIL`
/// / `DEV_ADMIN_PASSWORD` and `DEV_PRACTITIONER_NAME`.
async fn seed_development(stores: &Stores, store: &MemoryStore) -> anyhow::Result<()> {
    if let (Ok(email), Ok(password)) = (std::env::var("DEV_ADMIN_EMAIL"), std::env::var("DEV_ADMIN_PASSWORD")) {
        let hash = hash_password(&password)?;
        let admin = stores.admins.create(&email, "Development Admin", &hash).await?;
        tracing::info!("Seeded development admin {} ({})", admin.email, admin.id);
    }

    if let Ok(name) = std::env::var("DEV_PRACTITIONER_NAME") {
        let record = PractitionerRecord {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            email: Some(format!("{}@practice.local", name.to_lowercase().replace(' ', "."))),
            name,
        };
        tracing::info!("Seeded development practitioner {} ({})", record.name, record.id);
        store.insert_practitioner(record).await;
    }

    Ok(())
}
