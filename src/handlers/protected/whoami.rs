use axum::Extension;
use serde::Serialize;

use crate::identity::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    #[serde(flatten)]
    pub user: User,
    pub session_id: Option<String>,
}

/// GET /api/internal/whoami - The signed-in staff member and their session
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<WhoAmI> {
    Ok(ApiResponse::success(WhoAmI {
        user: auth.user,
        session_id: auth.session_id,
    }))
}
