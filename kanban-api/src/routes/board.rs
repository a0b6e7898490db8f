//! Board REST API Routes
//!
//! Board reads are public. Creating a board seeds the default columns;
//! updating and deleting are restricted to the board's owner. Column and
//! card creation are nested under the board they belong to.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use kanban_core::{Board, BOARD_DESCRIPTION_MAX, BOARD_TITLE_MAX};
use kanban_storage::{columns, BoardStore, BoardUpdate};

use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
use crate::state::AppState;
use crate::types::{
    BoardCreatedResponse, BoardDetailResponse, BoardResponse, BoardSummaryResponse,
    CardResponse, ColumnDetailResponse, ColumnResponse, CreateBoardRequest, ListBoardsResponse,
    UpdateBoardRequest, UserRef,
};
use crate::validation::{HasUpdates, ValidateLength, ValidateNonEmpty};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/boards - Public board listing with aggregate counts
pub async fn list_boards(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    let boards = db.board_list().await?;

    let mut summaries = Vec::with_capacity(boards.len());
    for board in &boards {
        let owner = board_owner(&db, board).await?;
        let columns_count = db.column_list_by_board(board.board_id).await?.len() as i64;
        let cards_count = db.card_count_by_board(board.board_id).await?;

        summaries.push(BoardSummaryResponse {
            board_id: board.board_id,
            title: board.title.clone(),
            description: board.description.clone(),
            owner,
            columns_count,
            cards_count,
            created_at: board.created_at,
            updated_at: board.updated_at,
        });
    }

    Ok(Json(ListBoardsResponse { boards: summaries }))
}

/// GET /api/v1/boards/:id - Public materialized board view
///
/// Columns come back in board order, each carrying its cards in position
/// order.
pub async fn get_board(
    State(db): State<DbClient>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let board = db
        .board_get(board_id)
        .await?
        .ok_or_else(|| ApiError::board_not_found(board_id))?;
    let owner = board_owner(&db, &board).await?;

    let mut column_views = Vec::new();
    for column in db.column_list_by_board(board.board_id).await? {
        let cards: Vec<CardResponse> = db
            .card_list_by_column(column.column_id)
            .await?
            .iter()
            .map(CardResponse::from)
            .collect();

        column_views.push(ColumnDetailResponse {
            column_id: column.column_id,
            name: column.name,
            order: column.order,
            wip_limit: column.wip_limit,
            cards_count: cards.len() as i64,
            cards,
        });
    }

    Ok(Json(BoardDetailResponse {
        board_id: board.board_id,
        title: board.title,
        description: board.description,
        owner,
        columns: column_views,
        created_at: board.created_at,
        updated_at: board.updated_at,
    }))
}

/// POST /api/v1/boards - Create a board with the default columns
pub async fn create_board(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<impl IntoResponse> {
    req.title.validate_non_empty("title")?;
    req.title.validate_max_length("title", BOARD_TITLE_MAX)?;
    req.description
        .validate_max_length("description", BOARD_DESCRIPTION_MAX)?;

    let (board, seeded) =
        columns::create_board(&db, auth.user_id, req.title.trim(), req.description).await?;

    Ok((
        StatusCode::CREATED,
        Json(BoardCreatedResponse {
            board_id: board.board_id,
            title: board.title,
            description: board.description,
            owner_id: board.owner_id,
            columns: seeded.iter().map(ColumnResponse::from).collect(),
            created_at: board.created_at,
            updated_at: board.updated_at,
        }),
    ))
}

/// PATCH /api/v1/boards/:id - Update title/description (owner only)
pub async fn update_board(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(board_id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate_has_updates()?;
    if let Some(title) = &req.title {
        title.validate_non_empty("title")?;
        title.validate_max_length("title", BOARD_TITLE_MAX)?;
    }
    req.description
        .validate_max_length("description", BOARD_DESCRIPTION_MAX)?;

    let update = BoardUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
    };
    let board = columns::update_board(&db, auth.user_id, board_id, update).await?;

    Ok(Json(BoardResponse::from(&board)))
}

/// DELETE /api/v1/boards/:id - Delete a board and its contents (owner only)
///
/// Card history is a weak reference and survives the cascade.
pub async fn delete_board(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(board_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    columns::delete_board(&db, auth.user_id, board_id).await?;
    Ok(StatusCode::OK)
}

async fn board_owner(db: &DbClient, board: &Board) -> ApiResult<UserRef> {
    let owner = db
        .user_get(board.owner_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(board.owner_id))?;
    Ok(UserRef::from(&owner))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(auth_state: AuthMiddlewareState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_board))
        .route("/:id", patch(update_board).delete(delete_board))
        .route("/:id/columns", post(super::column::create_column))
        .route("/:id/cards", post(super::card::create_card))
        .route_layer(from_fn_with_state(auth_state, auth_middleware));

    Router::new()
        .route("/", get(list_boards))
        .route("/:id", get(get_board))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_board_request_validation() {
        let req = CreateBoardRequest {
            title: "".to_string(),
            description: None,
        };
        assert!(req.title.validate_non_empty("title").is_err());

        let long = CreateBoardRequest {
            title: "x".repeat(BOARD_TITLE_MAX + 1),
            description: None,
        };
        assert!(long
            .title
            .validate_max_length("title", BOARD_TITLE_MAX)
            .is_err());
    }

    #[test]
    fn update_board_request_requires_a_field() {
        let req = UpdateBoardRequest {
            title: None,
            description: None,
        };
        assert!(req.validate_has_updates().is_err());
    }
}
