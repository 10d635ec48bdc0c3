use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NavListing;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NavbarQuery {
    /// Only return items (and subtrees) marked visible.
    #[serde(default)]
    pub visible: Option<bool>,
}

/// GET /api/public-navbar - Navigation for the public website
///
/// Called server-to-server with the shared navbar token. Returns the flat
/// item list plus the nested tree.
pub async fn navbar_get(
    State(state): State<AppState>,
    query: Result<Query<NavbarQuery>, QueryRejection>,
) -> ApiResult<NavListing> {
    let Query(query) = query?;
    let listing = state.navbar.listing(query.visible.unwrap_or(false)).await?;
    Ok(ApiResponse::success(listing))
}
