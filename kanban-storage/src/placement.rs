//! Card placement service.
//!
//! Every card mutation flows through here: admission against the destination
//! column's WIP limit, position resolution, and the paired history record are
//! decided in one place, then handed to the store as one atomic unit.
//!
//! The checks here run against a snapshot of column stats; the store repeats
//! the WIP check inside its transaction and rewrites a move event's from-side
//! from its own locked read, so a concurrent placement that slips past the
//! snapshot still cannot overfill a column or mis-record where a card came
//! from. Two concurrent appends
//! may land on the same position, which readers tolerate by ordering ties on
//! card id.

use crate::{BoardStore, CardUpdate};
use kanban_core::{
    check_admission, resolve_position, validate_explicit_position, Card, CardEvent, EntityId,
    EntityType, KanbanError, KanbanResult, MoveHistory,
};
use tracing::debug;

/// Input for creating a card.
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub board_id: EntityId,
    pub column_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// Append to the end of the column when absent.
    pub position: Option<i32>,
}

/// Input for editing or moving a card. All fields optional; a `column_id`
/// differing from the card's current column makes the update a move.
#[derive(Debug, Clone, Default)]
pub struct CardChange {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<EntityId>,
    pub position: Option<i32>,
}

/// Create a card in a column, appending unless an explicit position is given.
///
/// Fails with `CrossBoardReference` when the column belongs to a different
/// board than the draft names, and with `WipLimitReached` when the column is
/// at capacity.
pub async fn create_card<S: BoardStore>(
    store: &S,
    actor: EntityId,
    draft: CardDraft,
) -> KanbanResult<Card> {
    let column = store
        .column_get(draft.column_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Column, draft.column_id))?;
    if column.board_id != draft.board_id {
        return Err(KanbanError::CrossBoardReference {
            column_id: draft.column_id,
            board_id: draft.board_id,
        });
    }

    let stats = store.column_card_stats(draft.column_id).await?;
    check_admission(&column, stats.card_count)?;
    let position = resolve_position(draft.position, stats.max_position)?;

    let card = Card::new(
        draft.board_id,
        draft.column_id,
        &draft.title,
        draft.description,
        position,
        actor,
    );
    let history = MoveHistory::record(
        &card,
        CardEvent::Created {
            column_id: card.column_id,
        },
        actor,
    );
    store.card_insert(&card, &history).await?;

    debug!(
        card_id = %card.card_id,
        column_id = %card.column_id,
        position = card.position,
        "card created"
    );
    Ok(card)
}

/// Edit a card in place or move it to another column.
///
/// The WIP admission check runs only when the card changes columns; an
/// in-place edit of a card in a full column must still succeed. A move
/// re-resolves the position against the destination column, appending when
/// no explicit position is given.
pub async fn update_card<S: BoardStore>(
    store: &S,
    actor: EntityId,
    card_id: EntityId,
    change: CardChange,
) -> KanbanResult<Card> {
    let current = store
        .card_get(card_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Card, card_id))?;

    let is_move = change
        .column_id
        .is_some_and(|dest| dest != current.column_id);

    let (event, position) = if is_move {
        let destination_id = change.column_id.unwrap_or(current.column_id);
        let destination = store
            .column_get(destination_id)
            .await?
            .ok_or(KanbanError::not_found(EntityType::Column, destination_id))?;
        if destination.board_id != current.board_id {
            return Err(KanbanError::CrossBoardReference {
                column_id: destination_id,
                board_id: current.board_id,
            });
        }

        let stats = store.column_card_stats(destination_id).await?;
        check_admission(&destination, stats.card_count)?;
        let position = resolve_position(change.position, stats.max_position)?;

        (
            CardEvent::Moved {
                from_column_id: current.column_id,
                to_column_id: destination_id,
            },
            Some(position),
        )
    } else {
        let position = match change.position {
            Some(p) => Some(validate_explicit_position(p)?),
            None => None,
        };
        (
            CardEvent::Updated {
                column_id: current.column_id,
            },
            position,
        )
    };

    // The history row snapshots the title as it reads after this update.
    let mut snapshot = current.clone();
    if let Some(ref title) = change.title {
        snapshot.title = title.clone();
    }
    let history = MoveHistory::record(&snapshot, event, actor);

    let update = CardUpdate {
        title: change.title,
        description: change.description,
        column_id: if is_move { change.column_id } else { None },
        position,
    };
    let updated = store.card_update(card_id, update, &history).await?;

    debug!(
        card_id = %card_id,
        event = history.event.kind(),
        column_id = %updated.column_id,
        position = updated.position,
        "card updated"
    );
    Ok(updated)
}

/// Delete a card. The terminal "deleted" history row is written in the same
/// unit as the removal and retains the card's title.
pub async fn delete_card<S: BoardStore>(
    store: &S,
    actor: EntityId,
    card_id: EntityId,
) -> KanbanResult<()> {
    let current = store
        .card_get(card_id)
        .await?
        .ok_or(KanbanError::not_found(EntityType::Card, card_id))?;

    let history = MoveHistory::record(
        &current,
        CardEvent::Deleted {
            column_id: current.column_id,
        },
        actor,
    );
    store.card_delete(card_id, &history).await?;

    debug!(card_id = %card_id, "card deleted");
    Ok(())
}

/// A card's history, most recent first. History outlives the card, so this
/// answers for deleted cards too; an unknown id reads as an empty list.
pub async fn card_history<S: BoardStore>(
    store: &S,
    card_id: EntityId,
    limit: i64,
) -> KanbanResult<Vec<MoveHistory>> {
    store.history_for_card(card_id, limit).await
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockStore;
    use kanban_core::{new_entity_id, Board, BoardColumn};

    struct Fixture {
        store: MockStore,
        actor: EntityId,
        board: Board,
        col_a: BoardColumn,
        col_b: BoardColumn,
    }

    /// One board, two columns: "A" (wip 3) and "B" (wip 1).
    async fn fixture() -> Fixture {
        let store = MockStore::new();
        let actor = new_entity_id();
        let board = Board::new("Sprint 12", None, actor);
        let col_a = BoardColumn::new(board.board_id, "A", 1, Some(3));
        let col_b = BoardColumn::new(board.board_id, "B", 2, Some(1));
        store
            .board_insert(&board, &[col_a.clone(), col_b.clone()])
            .await
            .unwrap();
        Fixture {
            store,
            actor,
            board,
            col_a,
            col_b,
        }
    }

    fn draft(fx: &Fixture, column_id: EntityId, title: &str) -> CardDraft {
        CardDraft {
            board_id: fx.board.board_id,
            column_id,
            title: title.to_string(),
            description: None,
            position: None,
        }
    }

    #[tokio::test]
    async fn test_appends_get_strictly_increasing_positions() {
        let fx = fixture().await;
        let mut positions = Vec::new();
        for i in 0..3 {
            let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, &format!("c{i}")))
                .await
                .unwrap();
            positions.push(card.position);
        }
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_explicit_position_is_honored_verbatim() {
        let fx = fixture().await;
        let mut d = draft(&fx, fx.col_a.column_id, "pinned");
        d.position = Some(7);
        let card = create_card(&fx.store, fx.actor, d).await.unwrap();
        assert_eq!(card.position, 7);

        // Next append lands after the gap, not inside it.
        let next = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "after"))
            .await
            .unwrap();
        assert_eq!(next.position, 8);
    }

    #[tokio::test]
    async fn test_position_below_minimum_is_rejected() {
        let fx = fixture().await;
        let mut d = draft(&fx, fx.col_a.column_id, "bad");
        d.position = Some(0);
        let err = create_card(&fx.store, fx.actor, d).await.unwrap_err();
        assert!(matches!(err, KanbanError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_into_full_column_is_refused() {
        let fx = fixture().await;
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "only"))
            .await
            .unwrap();

        let err = create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "overflow"))
            .await
            .unwrap_err();
        match err {
            KanbanError::WipLimitReached {
                column_name,
                wip_limit,
            } => {
                assert_eq!(column_name, "B");
                assert_eq!(wip_limit, 1);
            }
            other => panic!("expected WipLimitReached, got {other:?}"),
        }
        // The refused create left no card and no history row.
        assert_eq!(fx.store.card_count(), 1);
        assert_eq!(fx.store.history_count(), 1);
    }

    #[tokio::test]
    async fn test_move_into_full_column_is_refused_and_card_stays() {
        let fx = fixture().await;
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "blocker"))
            .await
            .unwrap();
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "mover"))
            .await
            .unwrap();

        let change = CardChange {
            column_id: Some(fx.col_b.column_id),
            ..Default::default()
        };
        let err = update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::WipLimitReached { .. }));

        let unchanged = fx.store.card_get(card.card_id).await.unwrap().unwrap();
        assert_eq!(unchanged.column_id, fx.col_a.column_id);
        assert_eq!(unchanged.position, card.position);
    }

    #[tokio::test]
    async fn test_in_place_edit_skips_wip_check_even_when_full() {
        let fx = fixture().await;
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "only"))
            .await
            .unwrap();

        // Column B is at its limit of 1; editing its resident card is fine.
        let change = CardChange {
            title: Some("renamed".to_string()),
            column_id: Some(fx.col_b.column_id),
            ..Default::default()
        };
        let updated = update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.column_id, fx.col_b.column_id);
    }

    #[tokio::test]
    async fn test_move_appends_to_destination_sequence() {
        let fx = fixture().await;
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "a1"))
            .await
            .unwrap();
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "a2"))
            .await
            .unwrap();
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "b1"))
            .await
            .unwrap();

        let change = CardChange {
            column_id: Some(fx.col_a.column_id),
            ..Default::default()
        };
        let moved = update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap();
        assert_eq!(moved.column_id, fx.col_a.column_id);
        assert_eq!(moved.position, 3);
    }

    #[tokio::test]
    async fn test_cross_board_create_and_move_are_rejected() {
        let fx = fixture().await;
        let other_board = Board::new("Other", None, fx.actor);
        let other_col = BoardColumn::new(other_board.board_id, "Elsewhere", 1, None);
        fx.store
            .board_insert(&other_board, &[other_col.clone()])
            .await
            .unwrap();

        // Create naming a column from another board.
        let mut d = draft(&fx, other_col.column_id, "stray");
        d.board_id = fx.board.board_id;
        let err = create_card(&fx.store, fx.actor, d).await.unwrap_err();
        assert!(matches!(err, KanbanError::CrossBoardReference { .. }));

        // Move across boards.
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "stay"))
            .await
            .unwrap();
        let change = CardChange {
            column_id: Some(other_col.column_id),
            ..Default::default()
        };
        let err = update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::CrossBoardReference { .. }));
    }

    #[tokio::test]
    async fn test_move_records_source_and_destination() {
        let fx = fixture().await;
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "tracked"))
            .await
            .unwrap();
        let change = CardChange {
            column_id: Some(fx.col_b.column_id),
            ..Default::default()
        };
        update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap();

        let history = card_history(&fx.store, card.card_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        match &history[0].event {
            CardEvent::Moved {
                from_column_id,
                to_column_id,
            } => {
                assert_eq!(*from_column_id, fx.col_a.column_id);
                assert_eq!(*to_column_id, fx.col_b.column_id);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
        assert_eq!(history[1].event.kind(), "created");
        assert_eq!(history[0].actor_id, fx.actor);
    }

    #[tokio::test]
    async fn test_history_snapshots_new_title_on_rename() {
        let fx = fixture().await;
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "old name"))
            .await
            .unwrap();
        let change = CardChange {
            title: Some("new name".to_string()),
            ..Default::default()
        };
        update_card(&fx.store, fx.actor, card.card_id, change)
            .await
            .unwrap();

        let history = card_history(&fx.store, card.card_id, 10).await.unwrap();
        assert_eq!(history[0].card_title, "new name");
        assert_eq!(history[1].card_title, "old name");
    }

    #[tokio::test]
    async fn test_deleted_card_leaves_readable_history() {
        let fx = fixture().await;
        let card = create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "ephemeral"))
            .await
            .unwrap();
        delete_card(&fx.store, fx.actor, card.card_id).await.unwrap();

        assert!(fx.store.card_get(card.card_id).await.unwrap().is_none());
        let history = card_history(&fx.store, card.card_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event.kind(), "deleted");
        assert_eq!(history[0].card_title, "ephemeral");
    }

    #[tokio::test]
    async fn test_unknown_card_yields_not_found() {
        let fx = fixture().await;
        let ghost = new_entity_id();

        let err = update_card(&fx.store, fx.actor, ghost, CardChange::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KanbanError::NotFound {
                entity_type: EntityType::Card,
                ..
            }
        ));
        let err = delete_card(&fx.store, fx.actor, ghost).await.unwrap_err();
        assert!(matches!(err, KanbanError::NotFound { .. }));

        // History of an unknown card is an empty list, not an error.
        assert!(card_history(&fx.store, ghost, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequence_ignores_sibling_columns() {
        let fx = fixture().await;
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "a1"))
            .await
            .unwrap();
        create_card(&fx.store, fx.actor, draft(&fx, fx.col_a.column_id, "a2"))
            .await
            .unwrap();

        let b1 = create_card(&fx.store, fx.actor, draft(&fx, fx.col_b.column_id, "b1"))
            .await
            .unwrap();
        assert_eq!(b1.position, 1);
    }
}
