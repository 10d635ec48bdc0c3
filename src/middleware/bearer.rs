use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::extract_bearer_token;
use crate::auth::tokens_match;
use crate::error::ApiError;
use crate::state::AppState;

/// Gate for the server-to-server navbar read: the caller must present the
/// shared navbar token as a Bearer credential.
pub async fn navbar_token_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.security.navbar_api_token.as_deref().filter(|t| !t.is_empty()) else {
        tracing::error!("NAVBAR_API_TOKEN is not configured; refusing public navbar reads");
        return Err(ApiError::service_unavailable("Navbar API is not configured"));
    };

    let provided = extract_bearer_token(request.headers()).map_err(ApiError::unauthorized)?;
    if !tokens_match(expected, &provided) {
        tracing::warn!("Rejected navbar read with a wrong bearer token");
        return Err(ApiError::unauthorized("Invalid bearer token"));
    }

    Ok(next.run(request).await)
}
