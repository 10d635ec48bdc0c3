use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::{validate_user_id, IdentityError, IdentityProvider, Role, User, UserPatch};
use crate::config::IdentityConfig;

/// HTTP client for the provider's user-management REST API.
#[derive(Clone)]
pub struct ClerkClient {
    client: Client,
    base_url: Url,
    secret_key: String,
}

/// User object as the provider returns it.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ProviderEmail>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    private_metadata: Map<String, Value>,
    last_sign_in_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProviderEmail {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrors {
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
    long_message: Option<String>,
}

impl From<ProviderUser> for User {
    fn from(raw: ProviderUser) -> Self {
        let email = raw
            .primary_email_address_id
            .as_deref()
            .and_then(|primary| raw.email_addresses.iter().find(|e| e.id == primary))
            .or_else(|| raw.email_addresses.first())
            .map(|e| e.email_address.clone());

        let role = match raw.private_metadata.get("role") {
            Some(Value::String(name)) => match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    warn!("User {} has unrecognised role '{}'", raw.id, name);
                    None
                }
            },
            _ => None,
        };

        let last_sign_in_at = raw
            .last_sign_in_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        User {
            id: raw.id,
            email,
            first_name: raw.first_name,
            last_name: raw.last_name,
            role,
            last_sign_in_at,
        }
    }
}

impl ClerkClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let secret_key = config
            .secret_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(IdentityError::NotConfigured("CLERK_SECRET_KEY"))?;

        let base_url = Url::parse(&config.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(IdentityError::NotConfigured("CLERK_API_URL"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;

        info!("Identity provider client targeting {}", config.api_url);
        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);
        self.client.request(method, url).bearer_auth(&self.secret_key)
    }

    /// Maps non-success statuses; `subject` names what was addressed, for 404s.
    async fn check(response: Response, subject: &str) -> Result<Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderErrors>(&body)
            .ok()
            .and_then(|e| e.errors.into_iter().next())
            .and_then(|e| e.long_message.or(e.message))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        match status {
            StatusCode::NOT_FOUND => Err(IdentityError::NotFound(subject.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(IdentityError::Rejected(message)),
            _ => {
                warn!("Identity provider returned {} for {}: {}", status, subject, message);
                Err(IdentityError::Upstream {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn read_user(response: Response) -> Result<User, IdentityError> {
        let raw: ProviderUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        Ok(raw.into())
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn list_users(&self, limit: u32) -> Result<Vec<User>, IdentityError> {
        let response = self
            .request(Method::GET, &["users"])
            .query(&[("limit", limit.to_string()), ("order_by", "-created_at".to_string())])
            .send()
            .await?;
        let response = Self::check(response, "users").await?;

        let raw: Vec<ProviderUser> = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        Ok(raw.into_iter().map(User::from).collect())
    }

    async fn get_user(&self, id: &str) -> Result<User, IdentityError> {
        let id = validate_user_id(id)?;
        let response = self.request(Method::GET, &["users", id]).send().await?;
        Self::read_user(Self::check(response, id).await?).await
    }

    async fn create_user(&self, email: &str, role: Option<Role>) -> Result<User, IdentityError> {
        let role = role.unwrap_or_default();
        let response = self
            .request(Method::POST, &["users"])
            .json(&json!({
                "email_address": [email],
                "private_metadata": { "role": role },
                "skip_password_requirement": true,
            }))
            .send()
            .await?;
        let user = Self::read_user(Self::check(response, email).await?).await?;
        info!("Created user {} with role {}", user.id, role);
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, IdentityError> {
        let Some(role) = patch.role else {
            return self.get_user(id).await;
        };
        let id = validate_user_id(id)?;
        let response = self
            .request(Method::PATCH, &["users", id, "metadata"])
            .json(&json!({ "private_metadata": { "role": role } }))
            .send()
            .await?;
        let user = Self::read_user(Self::check(response, id).await?).await?;
        info!("Set role of user {} to {}", id, role);
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> Result<(), IdentityError> {
        let id = validate_user_id(id)?;
        let response = self.request(Method::DELETE, &["users", id]).send().await?;
        Self::check(response, id).await?;
        info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: Value) -> User {
        serde_json::from_value::<ProviderUser>(raw).unwrap().into()
    }

    #[test]
    fn picks_primary_email_and_role() {
        let signed_in = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let user = normalize(json!({
            "id": "user_1",
            "first_name": "Ada",
            "last_name": null,
            "email_addresses": [
                { "id": "idn_a", "email_address": "old@example.com" },
                { "id": "idn_b", "email_address": "ada@example.com" }
            ],
            "primary_email_address_id": "idn_b",
            "private_metadata": { "role": "Staff" },
            "last_sign_in_at": signed_in.timestamp_millis(),
            "public_metadata": {}
        }));

        assert_eq!(user.id, "user_1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name, None);
        assert_eq!(user.role, Some(Role::Staff));
        assert_eq!(user.last_sign_in_at, Some(signed_in));
    }

    #[test]
    fn falls_back_to_first_email() {
        let user = normalize(json!({
            "id": "user_2",
            "email_addresses": [{ "id": "idn_a", "email_address": "first@example.com" }],
            "primary_email_address_id": null
        }));
        assert_eq!(user.email.as_deref(), Some("first@example.com"));
        assert_eq!(user.role, None);
        assert_eq!(user.last_sign_in_at, None);
    }

    #[test]
    fn unknown_role_is_unset() {
        let user = normalize(json!({
            "id": "user_3",
            "private_metadata": { "role": "Superuser" }
        }));
        assert_eq!(user.role, None);
        assert_eq!(user.email, None);
    }

    #[test]
    fn normalized_user_serializes_camel_case() {
        let user = normalize(json!({
            "id": "user_4",
            "last_sign_in_at": 0
        }));
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["lastSignInAt"], "1970-01-01T00:00:00Z");
        assert!(value.get("firstName").is_some());
    }

    fn client() -> ClerkClient {
        let mut config = crate::config::AppConfig::for_tests("s", "t").identity;
        config.secret_key = Some("sk_test_key".into());
        ClerkClient::new(&config).unwrap()
    }

    #[test]
    fn segments_stay_inside_users_path() {
        let client = client();
        assert_eq!(
            client.endpoint(&["users", "user_1", "metadata"]).as_str(),
            "https://api.clerk.com/v1/users/user_1/metadata"
        );

        let url = client.endpoint(&["users", "../invitations/inv_1/revoke"]);
        assert!(url.path().starts_with("/v1/users/"), "{url}");
        assert!(!url.path().contains("/invitations/"), "{url}");
    }

    #[tokio::test]
    async fn traversal_ids_never_reach_the_provider() {
        let client = client();
        for id in ["../organizations/org_1", "..", "user_1/metadata"] {
            assert!(matches!(client.get_user(id).await, Err(IdentityError::NotFound(_))));
            assert!(matches!(client.delete_user(id).await, Err(IdentityError::NotFound(_))));
            let patch = UserPatch { role: Some(Role::Admin) };
            assert!(matches!(client.update_user(id, patch).await, Err(IdentityError::NotFound(_))));
        }
    }

    #[test]
    fn rejects_unusable_api_url() {
        let mut config = crate::config::AppConfig::for_tests("s", "t").identity;
        config.secret_key = Some("sk_test_key".into());
        config.api_url = "not a url".into();
        assert!(matches!(
            ClerkClient::new(&config),
            Err(IdentityError::NotConfigured("CLERK_API_URL"))
        ));
    }

    #[test]
    fn requires_secret_key() {
        let config = crate::config::AppConfig::for_tests("s", "t").identity;
        assert!(matches!(
            ClerkClient::new(&config),
            Err(IdentityError::NotConfigured(_))
        ));
    }
}
