use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{AppConfig, IdentityBackend, StoreBackend};
use crate::database::{DatabaseManager, MemoryNavStore, NavStore, PgNavStore};
use crate::identity::{ClerkClient, IdentityProvider, MemoryIdentityProvider};
use crate::navigation::NavRules;
use crate::services::NavbarService;

/// Everything a handler needs, built once at startup and shared through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub navbar: NavbarService,
    pub identity: Arc<dyn IdentityProvider>,
    database: Option<DatabaseManager>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn NavStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let rules = nav_rules(&config);
        Self {
            config: Arc::new(config),
            navbar: NavbarService::new(store, rules),
            identity,
            database: None,
        }
    }

    /// Connects the configured store and identity provider.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let (store, database) = connect_store(&config).await?;
        let identity = connect_identity(&config)?;

        let mut state = Self::new(config, store, identity);
        state.database = database;
        info!("Navigation store backend: {}", state.navbar.backend());
        Ok(state)
    }

    pub async fn shutdown(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}

pub fn nav_rules(config: &AppConfig) -> NavRules {
    NavRules {
        max_depth: config.navigation.max_depth,
    }
}

/// Opens the configured navigation store, running migrations when enabled.
///
/// The pool handle is returned alongside so the caller can close it.
pub async fn connect_store(config: &AppConfig) -> Result<(Arc<dyn NavStore>, Option<DatabaseManager>)> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let manager = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            if config.database.run_migrations {
                manager.migrate().await.context("failed to run migrations")?;
            }
            let store = PgNavStore::new(&manager);
            Ok((Arc::new(store), Some(manager)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory navigation store; changes are lost on restart");
            Ok((Arc::new(MemoryNavStore::new()), None))
        }
    }
}

pub fn connect_identity(config: &AppConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.identity.backend {
        IdentityBackend::Clerk => Ok(Arc::new(
            ClerkClient::new(&config.identity).context("failed to set up the identity provider client")?,
        )),
        IdentityBackend::Memory => {
            warn!("Using the in-memory identity provider");
            Ok(Arc::new(MemoryIdentityProvider::new()))
        }
    }
}
