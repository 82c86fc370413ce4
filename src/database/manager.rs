use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data corruption: {0}")]
    DataCorruption(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Owns the service-role connection pool.
///
/// Every query issued through this pool bypasses row-level security, so only
/// admin-side stores receive it.
pub struct DatabaseManager;

static SERVICE_POOL: OnceCell<PgPool> = OnceCell::const_new();

impl DatabaseManager {
    /// Get the service-role pool, connecting lazily on first use
    pub async fn service_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        SERVICE_POOL
            .get_or_try_init(|| Self::connect(config))
            .await
            .cloned()
    }

    async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .service_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("SERVICE_DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created service-role database pool ({} max connections)", config.max_connections);
        Ok(pool)
    }

    /// Apply the bundled migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
