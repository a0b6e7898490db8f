//! Card REST API Routes
//!
//! The card detail read is public and carries the card's recent history.
//! Mutations require authentication but not board ownership: any
//! authenticated user can create, edit, move, or delete cards.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use kanban_core::{CARD_DESCRIPTION_MAX, CARD_TITLE_MAX};
use kanban_storage::{
    placement::{self, CardChange, CardDraft},
    BoardStore,
};

use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
use crate::state::AppState;
use crate::types::{
    BoardRef, CardDetailResponse, CardResponse, ColumnRef, CreateCardRequest,
    HistoryEntryResponse, UpdateCardRequest,
};
use crate::validation::{HasUpdates, ValidateLength, ValidateNonEmpty, ValidateRange};

/// How many history entries the card detail view carries.
const CARD_HISTORY_LIMIT: i64 = 10;

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/cards/:id - Public card detail with recent history
pub async fn get_card(
    State(db): State<DbClient>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let card = db
        .card_get(card_id)
        .await?
        .ok_or_else(|| ApiError::card_not_found(card_id))?;

    let board = db
        .board_get(card.board_id)
        .await?
        .ok_or_else(|| ApiError::board_not_found(card.board_id))?;
    let column = db
        .column_get(card.column_id)
        .await?
        .ok_or_else(|| ApiError::column_not_found(card.column_id))?;

    let history: Vec<HistoryEntryResponse> = db
        .history_for_card(card.card_id, CARD_HISTORY_LIMIT)
        .await?
        .iter()
        .map(HistoryEntryResponse::from)
        .collect();

    Ok(Json(CardDetailResponse {
        card_id: card.card_id,
        title: card.title,
        description: card.description,
        position: card.position,
        board: BoardRef {
            board_id: board.board_id,
            title: board.title,
        },
        column: ColumnRef {
            column_id: column.column_id,
            name: column.name,
        },
        created_by: card.created_by,
        history,
        created_at: card.created_at,
        updated_at: card.updated_at,
    }))
}

/// POST /api/v1/boards/:id/cards - Create a card in one of the board's columns
pub async fn create_card(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    req.title.validate_non_empty("title")?;
    req.title.validate_max_length("title", CARD_TITLE_MAX)?;
    req.description
        .validate_max_length("description", CARD_DESCRIPTION_MAX)?;
    if let Some(position) = req.position {
        position.validate_positive("position")?;
    }

    let draft = CardDraft {
        board_id,
        column_id: req.column_id,
        title: req.title.trim().to_string(),
        description: req.description,
        position: req.position,
    };
    let card = placement::create_card(&db, auth.user_id, draft).await?;

    Ok((StatusCode::CREATED, Json(CardResponse::from(&card))))
}

/// PATCH /api/v1/cards/:id - Edit a card in place or move it
///
/// When the target column differs from the card's current one, the move is
/// WIP-checked against the destination; in-place edits are not.
pub async fn update_card(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(card_id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate_has_updates()?;
    if let Some(title) = &req.title {
        title.validate_non_empty("title")?;
        title.validate_max_length("title", CARD_TITLE_MAX)?;
    }
    req.description
        .validate_max_length("description", CARD_DESCRIPTION_MAX)?;
    if let Some(position) = req.position {
        position.validate_positive("position")?;
    }

    let change = CardChange {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        column_id: req.column_id,
        position: req.position,
    };
    let card = placement::update_card(&db, auth.user_id, card_id, change).await?;

    Ok(Json(CardResponse::from(&card)))
}

/// DELETE /api/v1/cards/:id - Delete a card, leaving its history behind
pub async fn delete_card(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(card_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    placement::delete_card(&db, auth.user_id, card_id).await?;
    Ok(StatusCode::OK)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(auth_state: AuthMiddlewareState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/:id",
            axum::routing::patch(update_card).delete(delete_card),
        )
        .route_layer(from_fn_with_state(auth_state, auth_middleware));

    Router::new().route("/:id", get(get_card)).merge(protected)
}
