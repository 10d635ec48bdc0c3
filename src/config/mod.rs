use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::identity::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub navigation: NavigationConfig,
    pub identity: IdentityConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    Clerk,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub timeout_secs: u64,
    pub default_list_limit: u32,
    pub max_list_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Shared secret for the server-to-server navbar read endpoint.
    #[serde(skip_serializing)]
    pub navbar_api_token: Option<String>,
    /// RS256 public key (PEM) the identity provider signs session tokens with.
    #[serde(skip_serializing)]
    pub session_public_key: Option<String>,
    /// HS256 secret for locally minted session tokens.
    #[serde(skip_serializing)]
    pub session_hmac_secret: Option<String>,
    pub session_leeway_secs: u64,
    pub session_token_expiry_hours: u64,
    pub navbar_roles: Vec<Role>,
    pub user_admin_roles: Vec<Role>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("NAVBAR_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("NAV_STORE") {
            match v.as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown NAV_STORE '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Navigation overrides
        if let Ok(v) = env::var("NAV_MAX_DEPTH") {
            self.navigation.max_depth = v.parse().ok().filter(|depth| *depth > 0);
        }

        // Identity overrides
        if let Ok(v) = env::var("IDENTITY_PROVIDER") {
            match v.as_str() {
                "memory" => self.identity.backend = IdentityBackend::Memory,
                "clerk" => self.identity.backend = IdentityBackend::Clerk,
                other => tracing::warn!("Ignoring unknown IDENTITY_PROVIDER '{}'", other),
            }
        }
        if let Ok(v) = env::var("CLERK_API_URL") {
            self.identity.api_url = v;
        }
        if let Ok(v) = env::var("CLERK_SECRET_KEY") {
            self.identity.secret_key = Some(v);
        }
        if let Ok(v) = env::var("IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = v.parse().unwrap_or(self.identity.timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        // The navbar token historically reused the provider secret key.
        self.security.navbar_api_token = env::var("NAVBAR_API_TOKEN")
            .ok()
            .or_else(|| self.identity.secret_key.clone());
        if let Ok(v) = env::var("SESSION_PUBLIC_KEY") {
            self.security.session_public_key = Some(v.replace("\\n", "\n"));
        }
        if let Ok(v) = env::var("SESSION_HMAC_SECRET") {
            self.security.session_hmac_secret = Some(v);
        }
        if let Ok(v) = env::var("SESSION_LEEWAY_SECS") {
            self.security.session_leeway_secs = v.parse().unwrap_or(self.security.session_leeway_secs);
        }
        if let Ok(v) = env::var("SESSION_TOKEN_EXPIRY_HOURS") {
            self.security.session_token_expiry_hours =
                v.parse().unwrap_or(self.security.session_token_expiry_hours);
        }
        if let Ok(v) = env::var("NAVBAR_ROLES") {
            self.security.navbar_roles = parse_roles(&v);
        }
        if let Ok(v) = env::var("USER_ADMIN_ROLES") {
            self.security.user_admin_roles = parse_roles(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            navigation: NavigationConfig { max_depth: None },
            identity: IdentityConfig {
                backend: IdentityBackend::Clerk,
                api_url: "https://api.clerk.com/v1".to_string(),
                secret_key: None,
                timeout_secs: 30,
                default_list_limit: 200,
                max_list_limit: 500,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                navbar_api_token: None,
                session_public_key: None,
                session_hmac_secret: None,
                session_leeway_secs: 60,
                session_token_expiry_hours: 24,
                navbar_roles: vec![Role::Admin, Role::Staff],
                user_admin_roles: vec![Role::Admin],
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.host = "0.0.0.0".to_string();
        config.database.max_connections = 10;
        config.database.connection_timeout = 10;
        config.identity.timeout_secs = 15;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.session_token_expiry_hours = 8;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.host = "0.0.0.0".to_string();
        config.database.max_connections = 20;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config.identity.timeout_secs = 10;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.security.session_leeway_secs = 5;
        config.security.session_token_expiry_hours = 1;
        config
    }

    /// Defaults for in-process runs: memory store, memory identity, HS256 sessions.
    pub fn for_tests(session_secret: &str, navbar_token: &str) -> Self {
        let mut config = Self::development();
        config.database.backend = StoreBackend::Memory;
        config.identity.backend = IdentityBackend::Memory;
        config.security.session_hmac_secret = Some(session_secret.to_string());
        config.security.navbar_api_token = Some(navbar_token.to_string());
        config
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_roles(raw: &str) -> Vec<Role> {
    split_list(raw)
        .iter()
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!("Ignoring unknown role '{}'", name);
                None
            }
        })
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
