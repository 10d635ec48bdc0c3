use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path, State,
};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::navigation::{Direction, NavItem, NavItemPatch, NewNavItem};
use crate::services::NavListing;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ItemBody {
    pub item: NavItem,
}

#[derive(Debug, Serialize)]
pub struct OkBody {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct NormalizeBody {
    pub writes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Sibling group to reorder; `null` or absent means the root group.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

/// GET /api/internal/public-navbar
pub async fn list(State(state): State<AppState>) -> ApiResult<NavListing> {
    Ok(ApiResponse::success(state.navbar.listing(false).await?))
}

/// POST /api/internal/public-navbar - Append a new item to its sibling group
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<NewNavItem>, JsonRejection>,
) -> ApiResult<ItemBody> {
    let Json(fields) = body?;
    let item = state.navbar.create(fields).await?;
    tracing::info!("{} created navigation item {}", auth.user.id, item.id);
    Ok(ApiResponse::created(ItemBody { item }))
}

/// PATCH /api/internal/public-navbar/:id
///
/// `parentId: null` moves the item to the root; an absent key leaves it alone.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<NavItemPatch>, JsonRejection>,
) -> ApiResult<ItemBody> {
    let Path(id) = id?;
    let Json(patch) = body?;
    let item = state.navbar.update(id, patch).await?;
    tracing::info!("{} updated navigation item {}", auth.user.id, id);
    Ok(ApiResponse::success(ItemBody { item }))
}

/// DELETE /api/internal/public-navbar/:id - Children move up into its slot
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<OkBody> {
    let Path(id) = id?;
    state.navbar.delete(id).await?;
    tracing::info!("{} deleted navigation item {}", auth.user.id, id);
    Ok(ApiResponse::success(OkBody { ok: true }))
}

/// PUT /api/internal/public-navbar/order - Replace one sibling group's order
pub async fn reorder(
    State(state): State<AppState>,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<NavListing> {
    let Json(request) = body?;
    let listing = state.navbar.reorder(request.parent_id, &request.ids).await?;
    Ok(ApiResponse::success(listing))
}

/// POST /api/internal/public-navbar/:id/move - Swap with the previous or next sibling
pub async fn move_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<NavListing> {
    let Path(id) = id?;
    let Json(request) = body?;
    let listing = state.navbar.move_item(id, request.direction).await?;
    Ok(ApiResponse::success(listing))
}

/// POST /api/internal/public-navbar/normalize - Renumber every sibling group 1..N
pub async fn normalize(State(state): State<AppState>) -> ApiResult<NormalizeBody> {
    let writes = state.navbar.normalize().await?;
    Ok(ApiResponse::success(NormalizeBody { writes }))
}
