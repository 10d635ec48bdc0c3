use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{
    navbar_token_middleware, require_any_internal_role, require_navbar_role, require_user_admin_role,
    session_auth_middleware,
};
use crate::state::AppState;

/// The complete HTTP surface.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Unauthenticated
        .route("/", get(root))
        .route("/health", get(health))
        // Server-to-server read
        .merge(public_navbar_routes(&state))
        // Staff sessions
        .merge(internal_routes(&state))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_navbar_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/public-navbar", get(public::navbar_get))
        .route_layer(from_fn_with_state(state.clone(), navbar_token_middleware))
}

fn internal_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(navbar_routes(state))
        .merge(user_routes(state))
        .merge(
            Router::new()
                .route("/api/internal/whoami", get(protected::whoami))
                .route_layer(from_fn_with_state(state.clone(), require_any_internal_role)),
        )
        // Added last so it runs before the per-group role gates
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware))
}

fn navbar_routes(state: &AppState) -> Router<AppState> {
    use protected::navbar;

    Router::new()
        .route("/api/internal/public-navbar", get(navbar::list).post(navbar::create))
        .route("/api/internal/public-navbar/order", put(navbar::reorder))
        .route("/api/internal/public-navbar/normalize", post(navbar::normalize))
        .route(
            "/api/internal/public-navbar/:id",
            axum::routing::patch(navbar::update).delete(navbar::delete),
        )
        .route("/api/internal/public-navbar/:id/move", post(navbar::move_item))
        .route_layer(from_fn_with_state(state.clone(), require_navbar_role))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/internal/users", get(users::list).post(users::create))
        .route(
            "/api/internal/users/:id",
            get(users::get).patch(users::update).delete(users::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), require_user_admin_role))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Navbar Admin API",
            "version": version,
            "description": "Administration backend for the public website's navigation menu",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_navbar": "/api/public-navbar[?visible=true] (navbar bearer token)",
                "navbar": "/api/internal/public-navbar[/:id[/move]|/order|/normalize] (staff session)",
                "users": "/api/internal/users[/:id] (admin session)",
                "whoami": "/api/internal/whoami (staff session)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.navbar.backend();

    match state.navbar.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": backend
                    }
                })),
            )
        }
    }
}
