//! Column REST API Routes
//!
//! All column mutations are restricted to the owner of the board the column
//! sits on. Creation appends at the end of the board's sequence; deletion
//! requires the column to be empty and closes the ordering gap.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::patch,
    Json, Router,
};
use uuid::Uuid;

use kanban_core::COLUMN_NAME_MAX;
use kanban_storage::{columns, ColumnUpdate};

use crate::db::DbClient;
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
use crate::state::AppState;
use crate::types::{ColumnResponse, CreateColumnRequest, UpdateColumnRequest};
use crate::validation::{HasUpdates, ValidateLength, ValidateNonEmpty};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/boards/:id/columns - Append a column to a board (owner only)
pub async fn create_column(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateColumnRequest>,
) -> ApiResult<impl IntoResponse> {
    req.name.validate_non_empty("name")?;
    req.name.validate_max_length("name", COLUMN_NAME_MAX)?;

    let column =
        columns::create_column(&db, auth.user_id, board_id, req.name.trim(), req.wip_limit)
            .await?;

    Ok((StatusCode::CREATED, Json(ColumnResponse::from(&column))))
}

/// PATCH /api/v1/columns/:id - Rename or adjust the WIP limit (owner only)
///
/// Lowering the limit below the column's current card count is refused;
/// shrinking never evicts cards.
pub async fn update_column(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(column_id): Path<Uuid>,
    Json(req): Json<UpdateColumnRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate_has_updates()?;
    if let Some(name) = &req.name {
        name.validate_non_empty("name")?;
        name.validate_max_length("name", COLUMN_NAME_MAX)?;
    }

    let update = ColumnUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        wip_limit: req.wip_limit,
    };
    let column = columns::update_column(&db, auth.user_id, column_id, update).await?;

    Ok(Json(ColumnResponse::from(&column)))
}

/// DELETE /api/v1/columns/:id - Delete an empty column (owner only)
pub async fn delete_column(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(column_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    columns::delete_column(&db, auth.user_id, column_id).await?;
    Ok(StatusCode::OK)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(auth_state: AuthMiddlewareState) -> Router<AppState> {
    Router::new()
        .route("/:id", patch(update_column).delete(delete_column))
        .route_layer(from_fn_with_state(auth_state, auth_middleware))
}
