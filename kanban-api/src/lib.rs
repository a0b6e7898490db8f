//! Kanban API - REST API Layer
//!
//! Axum REST surface for the kanban board service. Implements the
//! PostgreSQL-backed [`kanban_storage::BoardStore`] on [`DbClient`], the
//! opaque-token session layer, and the route handlers that call the shared
//! board/column/card services.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    extract_bearer_token, generate_token, hash_password, verify_password, AuthConfig,
    AuthContext, RotatedToken, SessionToken, TokenPair,
};
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
