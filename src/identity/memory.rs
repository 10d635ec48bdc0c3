use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{IdentityError, IdentityProvider, Role, User, UserPatch};

/// Process-local accounts for development runs and tests.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    users: RwLock<Vec<User>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account directly, bypassing email checks.
    pub async fn seed(&self, email: &str, role: Option<Role>) -> User {
        let user = new_user(email, role);
        self.users.write().await.push(user.clone());
        user
    }
}

fn new_user(email: &str, role: Option<Role>) -> User {
    User {
        id: format!("user_{}", Uuid::new_v4().simple()),
        email: Some(email.to_string()),
        first_name: None,
        last_name: None,
        role,
        last_sign_in_at: None,
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn list_users(&self, limit: u32) -> Result<Vec<User>, IdentityError> {
        let users = self.users.read().await;
        // Newest first, like the hosted provider's default listing.
        Ok(users.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn get_user(&self, id: &str) -> Result<User, IdentityError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }

    async fn create_user(&self, email: &str, role: Option<Role>) -> Result<User, IdentityError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
        {
            return Err(IdentityError::Rejected(format!("'{}' is already registered", email)));
        }
        let user = new_user(email, Some(role.unwrap_or_default()));
        users.push(user.clone());
        info!("Created user {}", user.id);
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, IdentityError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        if let Some(role) = patch.role {
            user.role = Some(role);
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), IdentityError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        info!("Deleted user {}", id);
        Ok(())
    }
}
