//! Axum middleware for bearer-token authentication.
//!
//! The middleware resolves `Authorization: Bearer <token>` against the
//! session store, injects an [`AuthContext`] into request extensions on
//! success, and answers 401 otherwise. Handlers opt in via the typed
//! [`AuthExtractor`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{extract_bearer_token, AuthContext};
use crate::db::DbClient;
use crate::error::ApiError;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for the authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub db: DbClient,
}

impl AuthMiddlewareState {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Authenticate a request by its bearer token.
///
/// 1. Extracts the `Authorization: Bearer` header
/// 2. Resolves the token against the session store (touching `last_used_at`)
/// 3. Returns 401 when the header is missing, malformed, or the token is
///    unknown or expired
/// 4. Injects [`AuthContext`] into request extensions on success
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let token = auth_header.and_then(extract_bearer_token).ok_or_else(|| {
        AuthMiddlewareError(ApiError::unauthorized(
            "Authentication required: provide an Authorization: Bearer header",
        ))
    })?;

    let user = state
        .db
        .user_by_access_token(token)
        .await
        .map_err(|e| AuthMiddlewareError(ApiError::from(e)))?
        .ok_or_else(|| {
            AuthMiddlewareError(ApiError::invalid_token("Access token is invalid or expired"))
        })?;

    request.extensions_mut().insert(AuthContext::from_user(&user));

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed extractor for the authenticated caller.
///
/// Requires `auth_middleware` on the route; without it the extractor answers
/// 500 because the context was never injected.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
