use std::collections::HashMap;

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Path, Query, State,
};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::identity::{validate_email, Role, User, UserPatch};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct OkBody {
    pub ok: bool,
}

fn field_error(field: &str, problem: &str) -> HashMap<String, String> {
    HashMap::from([(field.to_string(), problem.to_string())])
}

/// GET /api/internal/users - Newest accounts first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<User>> {
    let Query(query) = query?;
    let identity = &state.config.identity;
    let limit = query
        .limit
        .unwrap_or(identity.default_list_limit)
        .clamp(1, identity.max_list_limit);

    Ok(ApiResponse::success(state.identity.list_users(limit).await?))
}

/// POST /api/internal/users - Create an account; role defaults to Normal
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = body?;
    let email = validate_email(&request.email)
        .map_err(|e| ApiError::validation_error(e.to_string(), Some(field_error("email", "must be an email address"))))?;
    let user = state.identity.create_user(&email, request.role).await?;
    tracing::info!("{} created user {}", auth.user.id, user.id);
    Ok(ApiResponse::created(user))
}

/// GET /api/internal/users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    Ok(ApiResponse::success(state.identity.get_user(&id).await?))
}

/// PATCH /api/internal/users/:id - Change the role attribute
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<User> {
    let Json(patch) = body?;
    let Some(role) = patch.role else {
        return Err(ApiError::validation_error(
            "role is required",
            Some(field_error("role", "one of Admin, Staff, Normal")),
        ));
    };
    let user = state.identity.update_user(&id, UserPatch { role: Some(role) }).await?;
    tracing::info!("{} set role of {} to {}", auth.user.id, id, role);
    Ok(ApiResponse::success(user))
}

/// DELETE /api/internal/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<OkBody> {
    if auth.user.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    state.identity.delete_user(&id).await?;
    tracing::info!("{} deleted user {}", auth.user.id, id);
    Ok(ApiResponse::success(OkBody { ok: true }))
}
