//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::db::DbClient;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Database client backing both the board store and the session store.
    pub db: DbClient,
    /// Token lifetimes for login and refresh.
    pub auth_config: Arc<AuthConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(db: DbClient, auth_config: AuthConfig) -> Self {
        Self {
            db,
            auth_config: Arc::new(auth_config),
            start_time: std::time::Instant::now(),
        }
    }
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(DbClient, db);
crate::impl_from_ref!(Arc<AuthConfig>, auth_config);
crate::impl_from_ref!(std::time::Instant, start_time);
