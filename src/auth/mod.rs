use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Claims of a session token. `sub` is the identity provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(user_id: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.into(),
            sid: Some(format!("sess_{}", Uuid::new_v4().simple())),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    NotConfigured,
    UnsupportedAlgorithm(Algorithm),
    InvalidKey(String),
    TokenGeneration(String),
    InvalidToken(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotConfigured => write!(f, "Session verification is not configured"),
            SessionError::UnsupportedAlgorithm(alg) => write!(f, "Unsupported session token algorithm {:?}", alg),
            SessionError::InvalidKey(msg) => write!(f, "Invalid session key: {}", msg),
            SessionError::TokenGeneration(msg) => write!(f, "Session token generation error: {}", msg),
            SessionError::InvalidToken(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Mints an HS256 session token for local development and tests.
pub fn generate_session_token(claims: &SessionClaims, security: &SecurityConfig) -> Result<String, SessionError> {
    let secret = security
        .session_hmac_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(SessionError::NotConfigured)?;

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| SessionError::TokenGeneration(e.to_string()))
}

/// Verifies a session token against whichever key matches its header:
/// the provider's RS256 public key, or the local HS256 secret.
pub fn verify_session_token(token: &str, security: &SecurityConfig) -> Result<SessionClaims, SessionError> {
    let header = decode_header(token).map_err(|e| SessionError::InvalidToken(e.to_string()))?;

    let key = match header.alg {
        Algorithm::RS256 => {
            let pem = security
                .session_public_key
                .as_deref()
                .ok_or(SessionError::NotConfigured)?;
            DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| SessionError::InvalidKey(e.to_string()))?
        }
        Algorithm::HS256 => {
            let secret = security
                .session_hmac_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(SessionError::NotConfigured)?;
            DecodingKey::from_secret(secret.as_bytes())
        }
        other => return Err(SessionError::UnsupportedAlgorithm(other)),
    };

    let mut validation = Validation::new(header.alg);
    validation.leeway = security.session_leeway_secs;
    validation.validate_aud = false;

    let data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| SessionError::InvalidToken(e.to_string()))?;
    Ok(data.claims)
}

/// Constant-time comparison of a presented bearer token with the configured one.
///
/// Both sides are hashed first so the comparison length never depends on input.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected.as_slice().ct_eq(provided.as_slice()).into()
}
