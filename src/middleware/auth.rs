use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::verify_session_token;
use crate::error::ApiError;
use crate::identity::{IdentityError, Role, User};
use crate::state::AppState;

/// Cookie the identity provider's frontend SDK stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated staff member, resolved from the session token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub session_id: Option<String>,
}

impl AuthUser {
    pub fn role(&self) -> Option<Role> {
        self.user.role
    }
}

/// Session authentication middleware: verifies the token, loads the user from
/// the identity provider and injects [`AuthUser`] into the request.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers()).map_err(ApiError::unauthorized)?;

    let claims = verify_session_token(&token, &state.config.security).map_err(|e| {
        tracing::warn!("Rejected session token: {}", e);
        ApiError::unauthorized("Invalid or expired session")
    })?;

    let user = match state.identity.get_user(&claims.sub).await {
        Ok(user) => user,
        Err(IdentityError::NotFound(_)) => {
            tracing::warn!("Session for unknown user {}", claims.sub);
            return Err(ApiError::unauthorized("Invalid or expired session"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::debug!("Authenticated {} ({:?})", user.id, user.role);
    request.extensions_mut().insert(AuthUser {
        user,
        session_id: claims.sid,
    });

    Ok(next.run(request).await)
}

/// Role gate for the navigation management routes.
pub async fn require_navbar_role(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &state.config.security.navbar_roles)?;
    Ok(next.run(request).await)
}

/// Role gate for the user management routes.
pub async fn require_user_admin_role(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_role(&request, &state.config.security.user_admin_roles)?;
    Ok(next.run(request).await)
}

/// Admits anyone allowed on either internal surface.
pub async fn require_any_internal_role(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = &state.config.security;
    let allowed: Vec<Role> = security
        .navbar_roles
        .iter()
        .chain(security.user_admin_roles.iter())
        .copied()
        .collect();
    check_role(&request, &allowed)?;
    Ok(next.run(request).await)
}

fn check_role(request: &Request, allowed: &[Role]) -> Result<(), ApiError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    match auth.role() {
        Some(role) if allowed.contains(&role) => Ok(()),
        role => {
            tracing::warn!("User {} with role {:?} denied", auth.user.id, role);
            Err(ApiError::forbidden("Your role does not allow this operation"))
        }
    }
}

/// Extract the session token from `Authorization: Bearer` or the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Result<String, String> {
    if headers.contains_key(header::AUTHORIZATION) {
        return extract_bearer_token(headers);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "Missing session token".to_string())
}

/// Extract a Bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session=cookie"));
        assert_eq!(extract_session_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session_other=x; __session=tok.en.sig"),
        );
        assert_eq!(extract_session_token(&headers).unwrap(), "tok.en.sig");
    }

    #[test]
    fn rejects_missing_or_malformed() {
        assert!(extract_session_token(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
