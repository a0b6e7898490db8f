//! Token-based authentication.
//!
//! Sessions are opaque bearer tokens: a random 64-character string handed to
//! the client, with only its SHA-256 digest stored server-side. Each session
//! row carries both an access token (short-lived) and a refresh token
//! (long-lived). Refreshing rotates the access token in place and keeps the
//! refresh token until it expires.

use chrono::{Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tokio_postgres::Row;

use kanban_core::{hash_secret, new_entity_id, EntityId, KanbanResult, Timestamp, User};

use crate::db::{db_err, row_to_user, DbClient, USER_COLS};

// ============================================================================
// Configuration
// ============================================================================

/// Lifetimes for issued tokens.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token time-to-live in seconds. Default 1 hour.
    pub access_ttl_secs: i64,
    /// Refresh token time-to-live in seconds. Default 14 days.
    pub refresh_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,
            refresh_ttl_secs: 14 * 24 * 3600,
        }
    }
}

impl AuthConfig {
    /// Load from `KANBAN_AUTH_ACCESS_TTL_SECS` / `KANBAN_AUTH_REFRESH_TTL_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            access_ttl_secs: std::env::var("KANBAN_AUTH_ACCESS_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.access_ttl_secs),
            refresh_ttl_secs: std::env::var("KANBAN_AUTH_REFRESH_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_ttl_secs),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_ttl_secs)
    }
}

// ============================================================================
// Token material
// ============================================================================

/// Length of the opaque token string handed to clients.
pub const TOKEN_LEN: usize = 64;

/// Generate a random alphanumeric token. The clear text is returned to the
/// client exactly once; only its digest is persisted.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Generate a random per-user password salt.
pub fn new_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Digest a password with its salt for storage or comparison.
pub fn hash_password(password: &str, salt: &str) -> String {
    hash_secret(&format!("{}{}", salt, password))
}

/// Constant-shape comparison of a candidate password against a stored digest.
pub fn verify_password(user: &User, password: &str) -> bool {
    hash_password(password, &user.password_salt) == user.password_hash
}

/// Fresh token pair returned from a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

/// Rotated access token returned from a refresh. The refresh token itself is
/// unchanged, so it is not echoed back.
#[derive(Debug, Clone, Serialize)]
pub struct RotatedToken {
    pub access_token: String,
    pub expires_at: Timestamp,
}

/// Authenticated caller, injected into request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: EntityId,
    pub name: String,
    pub email: String,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

// ============================================================================
// Session store
// ============================================================================

const TOKEN_COLS: &str = "token_id, user_id, token_hash, refresh_token_hash, \
     expires_at, refresh_expires_at, created_at, last_used_at";

/// One session row in `access_tokens`.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token_id: EntityId,
    pub user_id: EntityId,
    pub token_hash: String,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
    pub created_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

fn row_to_token(row: &Row) -> SessionToken {
    SessionToken {
        token_id: row.get("token_id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        refresh_token_hash: row.get("refresh_token_hash"),
        expires_at: row.get("expires_at"),
        refresh_expires_at: row.get("refresh_expires_at"),
        created_at: row.get("created_at"),
        last_used_at: row.get("last_used_at"),
    }
}

impl DbClient {
    /// Issue a fresh access/refresh pair for a user. Expired sessions for the
    /// same user are pruned as a side effect.
    pub async fn token_issue(
        &self,
        user_id: EntityId,
        config: &AuthConfig,
    ) -> KanbanResult<TokenPair> {
        let conn = self.get_conn().await?;
        let now = Utc::now();

        conn.execute(
            "DELETE FROM access_tokens WHERE user_id = $1 AND refresh_expires_at < $2",
            &[&user_id, &now],
        )
        .await
        .map_err(db_err)?;

        let access_token = generate_token();
        let refresh_token = generate_token();
        let expires_at = now + config.access_ttl();
        let refresh_expires_at = now + config.refresh_ttl();

        conn.execute(
            "INSERT INTO access_tokens \
             (token_id, user_id, token_hash, refresh_token_hash, \
              expires_at, refresh_expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &new_entity_id(),
                &user_id,
                &hash_secret(&access_token),
                &hash_secret(&refresh_token),
                &expires_at,
                &refresh_expires_at,
                &now,
            ],
        )
        .await
        .map_err(db_err)?;

        tracing::debug!(user_id = %user_id, "issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
            refresh_expires_at,
        })
    }

    /// Rotate the access token on the session identified by a refresh token.
    /// Returns `None` when the refresh token is unknown or expired.
    pub async fn token_rotate(
        &self,
        refresh_token: &str,
        config: &AuthConfig,
    ) -> KanbanResult<Option<RotatedToken>> {
        let conn = self.get_conn().await?;
        let now = Utc::now();

        let access_token = generate_token();
        let expires_at = now + config.access_ttl();

        let updated = conn
            .execute(
                "UPDATE access_tokens \
                 SET token_hash = $1, expires_at = $2 \
                 WHERE refresh_token_hash = $3 AND refresh_expires_at > $4",
                &[
                    &hash_secret(&access_token),
                    &expires_at,
                    &hash_secret(refresh_token),
                    &now,
                ],
            )
            .await
            .map_err(db_err)?;

        if updated == 0 {
            return Ok(None);
        }

        Ok(Some(RotatedToken {
            access_token,
            expires_at,
        }))
    }

    /// Delete the session matching an access token. Returns whether a row
    /// was removed.
    pub async fn token_revoke(&self, user_id: EntityId, access_token: &str) -> KanbanResult<bool> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM access_tokens WHERE user_id = $1 AND token_hash = $2",
                &[&user_id, &hash_secret(access_token)],
            )
            .await
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    /// Resolve an access token to its user, touching `last_used_at`. Returns
    /// `None` when the token is unknown or past its expiry.
    pub async fn user_by_access_token(&self, access_token: &str) -> KanbanResult<Option<User>> {
        let conn = self.get_conn().await?;
        let now = Utc::now();
        let token_hash = hash_secret(access_token);

        let row = conn
            .query_opt(
                &format!(
                    "SELECT {TOKEN_COLS} FROM access_tokens \
                     WHERE token_hash = $1 AND expires_at > $2"
                ),
                &[&token_hash, &now],
            )
            .await
            .map_err(db_err)?;

        let token = match row {
            Some(row) => row_to_token(&row),
            None => return Ok(None),
        };

        conn.execute(
            "UPDATE access_tokens SET last_used_at = $1 WHERE token_id = $2",
            &[&now, &token.token_id],
        )
        .await
        .map_err(db_err)?;

        let user = conn
            .query_opt(
                &format!("SELECT {USER_COLS} FROM users WHERE user_id = $1"),
                &[&token.user_id],
            )
            .await
            .map_err(db_err)?
            .map(|row| row_to_user(&row));

        Ok(user)
    }
}

// ============================================================================
// Bearer header parsing
// ============================================================================

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
