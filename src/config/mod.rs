use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Service-role connection string. Queries on this pool bypass row-level security.
    pub service_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieNames {
    pub session_id: String,
    pub practitioner_id: String,
    pub return_url: String,
    pub admin_session: String,
    pub user_session: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            session_id: "impersonation_session_id".to_string(),
            practitioner_id: "impersonating_practitioner_id".to_string(),
            return_url: "admin_return_url".to_string(),
            admin_session: "admin_session".to_string(),
            user_session: "session".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Signs carrier cookies and admin session tokens.
    pub session_secret: String,
    /// Shared with the auth provider that issues practitioner session tokens.
    pub user_token_secret: String,
    pub admin_session_hours: u64,
    pub impersonation_ttl_minutes: u64,
    pub secure_cookies: bool,
    pub default_admin_return_url: String,
    pub cookies: CookieNames,
}

/// Longest impersonation a session may last
pub const MAX_IMPERSONATION_TTL_MINUTES: u64 = 24 * 60;
/// Longest admin portal session
pub const MAX_ADMIN_SESSION_HOURS: u64 = 7 * 24;

impl SecurityConfig {
    /// Impersonation TTL in minutes, capped at [`MAX_IMPERSONATION_TTL_MINUTES`]
    pub fn impersonation_ttl(&self) -> i64 {
        bounded(self.impersonation_ttl_minutes, MAX_IMPERSONATION_TTL_MINUTES)
    }

    /// Admin session lifetime in hours, capped at [`MAX_ADMIN_SESSION_HOURS`]
    pub fn admin_session_lifetime(&self) -> i64 {
        bounded(self.admin_session_hours, MAX_ADMIN_SESSION_HOURS)
    }
}

fn bounded(value: u64, max: u64) -> i64 {
    i64::try_from(value.min(max)).unwrap_or(0)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            self.database.backend = match v.as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            };
        }
        if let Ok(v) = env::var("SERVICE_DATABASE_URL").or_else(|_| env::var("DATABASE_URL")) {
            self.database.service_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("PRACTICE_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_CORS_ORIGINS") {
            self.api.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.security.session_secret = v;
        }
        if let Ok(v) = env::var("USER_TOKEN_SECRET") {
            self.security.user_token_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ADMIN_SESSION_HOURS") {
            self.security.admin_session_hours = v.parse().unwrap_or(self.security.admin_session_hours);
        }
        if let Ok(v) = env::var("SECURITY_IMPERSONATION_TTL_MINUTES") {
            self.security.impersonation_ttl_minutes =
                v.parse().unwrap_or(self.security.impersonation_ttl_minutes);
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_DEFAULT_ADMIN_RETURN_URL") {
            self.security.default_admin_return_url = v;
        }

        self
    }

    /// Refuses to run outside development with the built-in secrets.
    pub fn validate(&self) -> Result<(), String> {
        if self.security.session_secret.len() < 32 {
            return Err("SESSION_SECRET must be at least 32 characters".to_string());
        }
        if self.security.user_token_secret.is_empty() {
            return Err("USER_TOKEN_SECRET must be set".to_string());
        }
        if self.environment != Environment::Development
            && self.security.session_secret == Self::DEV_SESSION_SECRET
        {
            return Err("SESSION_SECRET must be overridden outside development".to_string());
        }
        if !(1..=MAX_IMPERSONATION_TTL_MINUTES).contains(&self.security.impersonation_ttl_minutes) {
            return Err(format!(
                "SECURITY_IMPERSONATION_TTL_MINUTES must be between 1 and {}",
                MAX_IMPERSONATION_TTL_MINUTES
            ));
        }
        if !(1..=MAX_ADMIN_SESSION_HOURS).contains(&self.security.admin_session_hours) {
            return Err(format!(
                "SECURITY_ADMIN_SESSION_HOURS must be between 1 and {}",
                MAX_ADMIN_SESSION_HOURS
            ));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.service_url.is_none() {
            return Err("SERVICE_DATABASE_URL or DATABASE_URL is required for the postgres backend".to_string());
        }
        Ok(())
    }

    const DEV_SESSION_SECRET: &'static str = "development-only-session-secret-change-me";

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                service_url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                enable_request_logging: true,
            },
            security: SecurityConfig {
                session_secret: Self::DEV_SESSION_SECRET.to_string(),
                user_token_secret: "development-only-user-token-secret".to_string(),
                admin_session_hours: 12,
                impersonation_ttl_minutes: 4 * 60,
                secure_cookies: false,
                default_admin_return_url: "/admin/practitioners".to_string(),
                cookies: CookieNames::default(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                service_url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_request_logging: true,
            },
            security: SecurityConfig {
                session_secret: Self::DEV_SESSION_SECRET.to_string(),
                user_token_secret: String::new(),
                admin_session_hours: 8,
                impersonation_ttl_minutes: 60,
                secure_cookies: true,
                default_admin_return_url: "/admin/practitioners".to_string(),
                cookies: CookieNames::default(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                service_url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_request_logging: false,
            },
            security: SecurityConfig {
                session_secret: Self::DEV_SESSION_SECRET.to_string(),
                user_token_secret: String::new(),
                admin_session_hours: 4,
                impersonation_ttl_minutes: 60,
                secure_cookies: true,
                default_admin_return_url: "/admin/practitioners".to_string(),
                cookies: CookieNames::default(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.security.secure_cookies);
        assert_eq!(config.security.cookies.session_id, "impersonation_session_id");
        assert_eq!(config.security.cookies.practitioner_id, "impersonating_practitioner_id");
        assert_eq!(config.security.cookies.return_url, "admin_return_url");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.secure_cookies);
        assert_eq!(config.security.impersonation_ttl_minutes, 60);
    }

    #[test]
    fn test_production_rejects_development_secret() {
        let mut config = AppConfig::production();
        config.security.user_token_secret = "provider-secret".to_string();
        config.database.service_url = Some("postgres://localhost/practice".to_string());
        assert!(config.validate().is_err());

        config.security.session_secret = "x".repeat(48);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_lifetimes_are_rejected() {
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Memory;

        config.security.impersonation_ttl_minutes = u64::MAX / 2;
        assert!(config.validate().unwrap_err().contains("IMPERSONATION_TTL"));
        assert_eq!(config.security.impersonation_ttl(), MAX_IMPERSONATION_TTL_MINUTES as i64);

        config.security.impersonation_ttl_minutes = 0;
        assert!(config.validate().is_err());

        config.security.impersonation_ttl_minutes = 60;
        config.security.admin_session_hours = u64::MAX;
        assert!(config.validate().unwrap_err().contains("ADMIN_SESSION_HOURS"));
        assert_eq!(config.security.admin_session_lifetime(), MAX_ADMIN_SESSION_HOURS as i64);
    }

    #[test]
    fn test_memory_backend_needs_no_database_url() {
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Memory;
        assert!(config.validate().is_ok());
    }
}
