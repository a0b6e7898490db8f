//! Authentication REST API Routes
//!
//! Login exchanges credentials for an opaque access/refresh token pair.
//! Refresh rotates the access token in place; logout revokes the session.
//! `/me` echoes the authenticated user.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use kanban_storage::BoardStore;

use crate::auth::{
    extract_bearer_token, verify_password, AuthConfig, RotatedToken, TokenPair,
};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
use crate::state::AppState;
use crate::types::{LoginRequest, RefreshRequest, UserResponse};
use crate::validation::ValidateNonEmpty;

// ============================================================================
// TYPES
// ============================================================================

/// Successful login: the user and their fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// Successful refresh: the rotated access token.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub tokens: RotatedToken,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/auth/login - Exchange credentials for a token pair
pub async fn login(
    State(db): State<DbClient>,
    State(config): State<Arc<AuthConfig>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.email.validate_non_empty("email")?;
    req.password.validate_non_empty("password")?;

    let user = db
        .user_get_by_email(req.email.trim())
        .await?
        .filter(|user| verify_password(user, &req.password))
        .ok_or_else(ApiError::invalid_credentials)?;

    let tokens = db.token_issue(user.user_id, &config).await?;
    tracing::info!(user_id = %user.user_id, "user logged in");

    Ok(Json(LoginResponse {
        user: UserResponse::from(&user),
        tokens,
    }))
}

/// POST /api/v1/auth/refresh - Rotate the access token on a session
pub async fn refresh(
    State(db): State<DbClient>,
    State(config): State<Arc<AuthConfig>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    req.refresh_token.validate_non_empty("refresh_token")?;

    let tokens = db
        .token_rotate(&req.refresh_token, &config)
        .await?
        .ok_or_else(|| ApiError::invalid_token("Refresh token is invalid or expired"))?;

    Ok(Json(RefreshResponse { tokens }))
}

/// POST /api/v1/auth/logout - Revoke the presented access token
pub async fn logout(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let revoked = db.token_revoke(auth.user_id, token).await?;
    if !revoked {
        return Err(ApiError::invalid_token("Access token is not active"));
    }

    tracing::info!(user_id = %auth.user_id, "user logged out");
    Ok(StatusCode::OK)
}

/// GET /api/v1/auth/me - The authenticated user's profile
pub async fn me(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let user = db
        .user_get(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(auth.user_id))?;

    Ok(Json(UserResponse::from(&user)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(auth_state: AuthMiddlewareState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(from_fn_with_state(auth_state, auth_middleware));

    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
}
