//! Identity-provider gateway: staff accounts and their role attribute.

pub mod clerk;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clerk::ClerkClient;
pub use memory::MemoryIdentityProvider;

/// Authorization role stored in the provider's private metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Staff,
    Normal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Staff => "Staff",
            Role::Normal => "Normal",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Normal
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "normal" => Ok(Role::Normal),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A staff account as the rest of the service sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub role: Option<Role>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Identity provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected identity provider payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// User-management capability of the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn list_users(&self, limit: u32) -> Result<Vec<User>, IdentityError>;

    async fn get_user(&self, id: &str) -> Result<User, IdentityError>;

    /// Creates the account; `role` defaults to [`Role::Normal`].
    async fn create_user(&self, email: &str, role: Option<Role>) -> Result<User, IdentityError>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, IdentityError>;

    async fn delete_user(&self, id: &str) -> Result<(), IdentityError>;
}

/// Provider user ids are short `[A-Za-z0-9_]` tokens such as `user_2abc`.
///
/// Anything else cannot name an account, so it is reported as not found.
pub fn validate_user_id(id: &str) -> Result<&str, IdentityError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(IdentityError::NotFound(id.to_string()))
    }
}

/// Minimal shape check before handing an address to the provider.
pub fn validate_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err(IdentityError::Rejected(format!("'{}' is not a valid email address", email)))
    }
}
