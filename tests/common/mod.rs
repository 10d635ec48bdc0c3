#![allow(dead_code)]
//! Shared harness: runs the real router on a free port, backed by the
//! in-memory store and identity provider, and talks to it over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use navbar_admin::app::app;
use navbar_admin::auth::{generate_session_token, SessionClaims};
use navbar_admin::config::AppConfig;
use navbar_admin::database::MemoryNavStore;
use navbar_admin::identity::{MemoryIdentityProvider, Role, User};
use navbar_admin::state::AppState;

pub const SESSION_SECRET: &str = "integration-session-secret";
pub const NAVBAR_TOKEN: &str = "integration-navbar-token";

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub config: AppConfig,
    pub store: Arc<MemoryNavStore>,
    pub identity: Arc<MemoryIdentityProvider>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::for_tests(SESSION_SECRET, NAVBAR_TOKEN);
        customize(&mut config);

        let store = Arc::new(MemoryNavStore::new());
        let identity = Arc::new(MemoryIdentityProvider::new());
        let state = AppState::new(config.clone(), store.clone(), identity.clone());

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            config,
            store,
            identity,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seeds an account with `role` and returns it with a valid session token.
    pub async fn session(&self, email: &str, role: Option<Role>) -> Result<(User, String)> {
        let user = self.identity.seed(email, role).await;
        let claims = SessionClaims::new(user.id.clone(), 1);
        let token = generate_session_token(&claims, &self.config.security)?;
        Ok((user, token))
    }

    pub async fn staff_token(&self) -> Result<String> {
        Ok(self.session("staff@example.com", Some(Role::Staff)).await?.1)
    }

    pub async fn admin_token(&self) -> Result<String> {
        Ok(self.session("admin@example.com", Some(Role::Admin)).await?.1)
    }

    /// Public navbar read with the shared token.
    pub fn public_navbar(&self, query: &str) -> RequestBuilder {
        self.client
            .get(self.url(&format!("/api/public-navbar{}", query)))
            .bearer_auth(NAVBAR_TOKEN)
    }

    /// Creates a navigation item through the API and returns its JSON.
    pub async fn create_item(&self, token: &str, body: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/internal/public-navbar"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(
            res.status() == StatusCode::CREATED,
            "create returned {}: {}",
            res.status(),
            res.text().await?
        );
        let json: Value = res.json().await?;
        Ok(json["data"]["item"].clone())
    }
}

/// `data` of a success envelope, failing on anything else.
pub async fn data(res: reqwest::Response) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status.is_success(), "unexpected {}: {}", status, body);
    anyhow::ensure!(body["success"] == true, "missing success envelope: {}", body);
    Ok(body["data"].clone())
}

pub fn id_of(item: &Value) -> String {
    item["id"].as_str().unwrap_or_default().to_string()
}
