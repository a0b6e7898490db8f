//! Board and column lifecycle service.
//!
//! Boards come into existence with their three default columns in one atomic
//! insert. Column mutation is owner-gated; the WIP limit can never be lowered
//! below the column's current card count, and only empty columns can be
//! deleted.

use crate::{BoardStore, BoardUpdate, ColumnUpdate};
use kanban_core::{
    next_position, validate_wip_limit_change, Board, BoardColumn, EntityId, EntityType,
    KanbanError, KanbanResult,
};
use tracing::{debug, info};

/// Columns every new board starts with, in order.
pub const DEFAULT_COLUMN_NAMES: [&str; 3] = ["To Do", "Doing", "Done"];

async fn load_board<S: BoardStore>(store: &S, board_id: EntityId) -> KanbanResult<Board> {
    store
        .board_get(board_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Board, board_id))
}

fn require_owner(board: &Board, actor: EntityId, action: &str) -> KanbanResult<()> {
    if !board.is_owned_by(actor) {
        return Err(KanbanError::Authorization {
            user_id: actor,
            action: action.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// BOARDS
// ============================================================================

/// Create a board owned by `actor`, seeded with the default columns.
pub async fn create_board<S: BoardStore>(
    store: &S,
    actor: EntityId,
    title: &str,
    description: Option<String>,
) -> KanbanResult<(Board, Vec<BoardColumn>)> {
    let board = Board::new(title, description, actor);
    let columns: Vec<BoardColumn> = DEFAULT_COLUMN_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| BoardColumn::new(board.board_id, name, i as i32 + 1, None))
        .collect();

    store.board_insert(&board, &columns).await?;
    info!(board_id = %board.board_id, owner_id = %actor, "board created");
    Ok((board, columns))
}

/// Update a board's title or description. Owner only.
pub async fn update_board<S: BoardStore>(
    store: &S,
    actor: EntityId,
    board_id: EntityId,
    update: BoardUpdate,
) -> KanbanResult<Board> {
    let board = load_board(store, board_id).await?;
    require_owner(&board, actor, "update board")?;
    store.board_update(board_id, update).await
}

/// Delete a board and everything on it. Owner only. Card history survives.
pub async fn delete_board<S: BoardStore>(
    store: &S,
    actor: EntityId,
    board_id: EntityId,
) -> KanbanResult<()> {
    let board = load_board(store, board_id).await?;
    require_owner(&board, actor, "delete board")?;
    store.board_delete(board_id).await?;
    info!(board_id = %board_id, "board deleted");
    Ok(())
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Add a column at the end of the board's sequence. Owner only.
pub async fn create_column<S: BoardStore>(
    store: &S,
    actor: EntityId,
    board_id: EntityId,
    name: &str,
    wip_limit: Option<i32>,
) -> KanbanResult<BoardColumn> {
    let board = load_board(store, board_id).await?;
    require_owner(&board, actor, "create column")?;

    if let Some(limit) = wip_limit {
        validate_wip_limit_change(limit, 0)?;
    }
    let order = next_position(store.column_max_order(board_id).await?);
    let column = BoardColumn::new(board_id, name, order, wip_limit);
    store.column_insert(&column).await?;

    debug!(column_id = %column.column_id, board_id = %board_id, order, "column created");
    Ok(column)
}

/// Rename a column or adjust its WIP limit. Owner only.
///
/// A new limit below the column's current card count is refused; shrinking a
/// column never evicts cards.
pub async fn update_column<S: BoardStore>(
    store: &S,
    actor: EntityId,
    column_id: EntityId,
    update: ColumnUpdate,
) -> KanbanResult<BoardColumn> {
    let column = store
        .column_get(column_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Column, column_id))?;
    let board = load_board(store, column.board_id).await?;
    require_owner(&board, actor, "update column")?;

    if let Some(new_limit) = update.wip_limit {
        let stats = store.column_card_stats(column_id).await?;
        validate_wip_limit_change(new_limit, stats.card_count)?;
    }
    store.column_update(column_id, update).await
}

/// Delete an empty column and close the gap in its board's ordering.
/// Owner only.
pub async fn delete_column<S: BoardStore>(
    store: &S,
    actor: EntityId,
    column_id: EntityId,
) -> KanbanResult<()> {
    let column = store
        .column_get(column_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Column, column_id))?;
    let board = load_board(store, column.board_id).await?;
    require_owner(&board, actor, "delete column")?;

    store.column_delete_and_reorder(column_id).await?;
    debug!(column_id = %column_id, "column deleted");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{create_card, CardDraft};
    use crate::MockStore;
    use kanban_core::{new_entity_id, DEFAULT_WIP_LIMIT};

    #[tokio::test]
    async fn test_new_board_gets_default_columns() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let (board, columns) = create_board(&store, owner, "Roadmap", None).await.unwrap();

        assert_eq!(board.owner_id, owner);
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "Doing", "Done"]);
        let orders: Vec<i32> = columns.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert!(columns.iter().all(|c| c.wip_limit == DEFAULT_WIP_LIMIT));

        // The insert actually landed as one unit.
        let stored = store.column_list_by_board(board.board_id).await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_board_mutation_is_owner_only() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let stranger = new_entity_id();
        let (board, _) = create_board(&store, owner, "Private", None).await.unwrap();

        let err = update_board(
            &store,
            stranger,
            board.board_id,
            BoardUpdate {
                title: Some("Hijacked".to_string()),
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, KanbanError::Authorization { .. }));

        let err = delete_board(&store, stranger, board.board_id)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Authorization { .. }));

        // The owner can.
        let updated = update_board(
            &store,
            owner,
            board.board_id,
            BoardUpdate {
                title: Some("Renamed".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Renamed");
    }

    #[tokio::test]
    async fn test_new_column_appends_after_defaults() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let (board, _) = create_board(&store, owner, "Roadmap", None).await.unwrap();

        let column = create_column(&store, owner, board.board_id, "Blocked", Some(2))
            .await
            .unwrap();
        assert_eq!(column.order, 4);
        assert_eq!(column.wip_limit, 2);
    }

    #[tokio::test]
    async fn test_column_mutation_is_owner_only() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let stranger = new_entity_id();
        let (board, columns) = create_board(&store, owner, "Roadmap", None).await.unwrap();

        let err = create_column(&store, stranger, board.board_id, "Sneaky", None)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Authorization { .. }));

        let err = delete_column(&store, stranger, columns[0].column_id)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Authorization { .. }));
    }

    #[tokio::test]
    async fn test_wip_limit_cannot_drop_below_occupancy() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let (board, columns) = create_board(&store, owner, "Roadmap", None).await.unwrap();
        let target = &columns[0];

        for i in 0..3 {
            create_card(
                &store,
                owner,
                CardDraft {
                    board_id: board.board_id,
                    column_id: target.column_id,
                    title: format!("card {i}"),
                    description: None,
                    position: None,
                },
            )
            .await
            .unwrap();
        }

        let err = update_column(
            &store,
            owner,
            target.column_id,
            ColumnUpdate {
                name: None,
                wip_limit: Some(2),
            },
        )
        .await
        .unwrap_err();
        match err {
            KanbanError::WipLimitTooLow {
                current_count,
                wip_limit,
            } => {
                assert_eq!(current_count, 3);
                assert_eq!(wip_limit, 2);
            }
            other => panic!("expected WipLimitTooLow, got {other:?}"),
        }

        // Equal to the occupancy is the floor.
        let updated = update_column(
            &store,
            owner,
            target.column_id,
            ColumnUpdate {
                name: None,
                wip_limit: Some(3),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.wip_limit, 3);
    }

    #[tokio::test]
    async fn test_negative_wip_limit_is_invalid() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let (board, _) = create_board(&store, owner, "Roadmap", None).await.unwrap();

        let err = create_column(&store, owner, board.board_id, "Bad", Some(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_column_refused_until_empty() {
        let store = MockStore::new();
        let owner = new_entity_id();
        let (board, columns) = create_board(&store, owner, "Roadmap", None).await.unwrap();
        let target = &columns[1];

        let card = create_card(
            &store,
            owner,
            CardDraft {
                board_id: board.board_id,
                column_id: target.column_id,
                title: "occupant".to_string(),
                description: None,
                position: None,
            },
        )
        .await
        .unwrap();

        let err = delete_column(&store, owner, target.column_id)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::ColumnNotEmpty { .. }));

        crate::placement::delete_card(&store, owner, card.card_id)
            .await
            .unwrap();
        delete_column(&store, owner, target.column_id).await.unwrap();

        let remaining = store.column_list_by_board(board.board_id).await.unwrap();
        let orders: Vec<i32> = remaining.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(remaining[1].name, "Done");
    }
}
