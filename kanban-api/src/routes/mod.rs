//! REST API Routes Module
//!
//! Route handlers organized by entity type:
//! - Auth (login, refresh, logout, me)
//! - Boards (public reads, owner-gated mutations)
//! - Columns (owner-gated mutations)
//! - Cards (public detail read, authenticated mutations)
//! - Health checks
//! - CORS support for browser-based clients

pub mod auth;
pub mod board;
pub mod card;
pub mod column;
pub mod health;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::middleware::AuthMiddlewareState;
use crate::state::AppState;

// Re-export route creation functions for convenience
pub use auth::create_router as auth_router;
pub use board::create_router as board_router;
pub use card::create_router as card_router;
pub use column::create_router as column_router;
pub use health::create_router as health_router;

// ============================================================================
// API ROUTER
// ============================================================================

/// Create the complete API router.
///
/// - Entity routes under `/api/v1/*`; board and card reads are public,
///   everything else requires a bearer token
/// - Health checks at `/health/*` (public)
/// - CORS configured from [`ApiConfig`]
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let auth_state = AuthMiddlewareState::new(state.db.clone());

    let api_routes = Router::new()
        .nest("/auth", auth::create_router(auth_state.clone()))
        .nest("/boards", board::create_router(auth_state.clone()))
        .nest("/columns", column::create_router(auth_state.clone()))
        .nest("/cards", card::create_router(auth_state));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router())
        .layer(build_cors_layer(api_config))
        .with_state(state)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        // Production mode: only allow configured origins
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        let cors = cors.allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]);

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
