//! In-memory mock store for testing.
//!
//! A single interior lock makes every trait method a serialized atomic unit,
//! which is exactly the transactional guarantee the Postgres implementation
//! provides per operation.

use crate::{BoardStore, BoardUpdate, CardUpdate, ColumnCardStats, ColumnUpdate};
use async_trait::async_trait;
use kanban_core::{
    admits, order_after_removal, Board, BoardColumn, Card, CardEvent, EntityId, EntityType,
    KanbanError, KanbanResult, MoveHistory, User,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct MockState {
    users: HashMap<EntityId, User>,
    boards: HashMap<EntityId, Board>,
    columns: HashMap<EntityId, BoardColumn>,
    cards: HashMap<EntityId, Card>,
    histories: Vec<MoveHistory>,
}

impl MockState {
    fn column_count(&self, column_id: EntityId) -> i64 {
        self.cards
            .values()
            .filter(|c| c.column_id == column_id)
            .count() as i64
    }
}

/// In-memory mock store for testing.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<RwLock<MockState>>,
}

impl MockStore {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user directly (there is no user-creation API surface).
    pub fn seed_user(&self, user: &User) {
        self.state
            .write()
            .unwrap()
            .users
            .insert(user.user_id, user.clone());
    }

    /// Total number of history rows, across all cards.
    pub fn history_count(&self) -> usize {
        self.state.read().unwrap().histories.len()
    }

    /// Number of stored cards.
    pub fn card_count(&self) -> usize {
        self.state.read().unwrap().cards.len()
    }
}

#[async_trait]
impl BoardStore for MockStore {
    // === User Operations ===

    async fn user_get(&self, id: EntityId) -> KanbanResult<Option<User>> {
        Ok(self.state.read().unwrap().users.get(&id).cloned())
    }

    async fn user_get_by_email(&self, email: &str) -> KanbanResult<Option<User>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    // === Board Operations ===

    async fn board_insert(&self, board: &Board, columns: &[BoardColumn]) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        if state.boards.contains_key(&board.board_id) {
            return Err(KanbanError::storage("board already exists"));
        }
        state.boards.insert(board.board_id, board.clone());
        for column in columns {
            state.columns.insert(column.column_id, column.clone());
        }
        Ok(())
    }

    async fn board_get(&self, id: EntityId) -> KanbanResult<Option<Board>> {
        Ok(self.state.read().unwrap().boards.get(&id).cloned())
    }

    async fn board_list(&self) -> KanbanResult<Vec<Board>> {
        let state = self.state.read().unwrap();
        let mut boards: Vec<Board> = state.boards.values().cloned().collect();
        boards.sort_by(|a, b| b.board_id.cmp(&a.board_id));
        Ok(boards)
    }

    async fn board_update(&self, id: EntityId, update: BoardUpdate) -> KanbanResult<Board> {
        let mut state = self.state.write().unwrap();
        let board = state
            .boards
            .get_mut(&id)
            .ok_or(KanbanError::not_found(EntityType::Board, id))?;
        if let Some(title) = update.title {
            board.title = title;
        }
        if let Some(description) = update.description {
            board.description = Some(description);
        }
        board.updated_at = chrono::Utc::now();
        Ok(board.clone())
    }

    async fn board_delete(&self, id: EntityId) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        if state.boards.remove(&id).is_none() {
            return Err(KanbanError::not_found(EntityType::Board, id));
        }
        state.columns.retain(|_, c| c.board_id != id);
        state.cards.retain(|_, c| c.board_id != id);
        // History rows are weak references and survive the cascade.
        Ok(())
    }

    // === Column Operations ===

    async fn column_get(&self, id: EntityId) -> KanbanResult<Option<BoardColumn>> {
        Ok(self.state.read().unwrap().columns.get(&id).cloned())
    }

    async fn column_list_by_board(&self, board_id: EntityId) -> KanbanResult<Vec<BoardColumn>> {
        let state = self.state.read().unwrap();
        let mut columns: Vec<BoardColumn> = state
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.order);
        Ok(columns)
    }

    async fn column_max_order(&self, board_id: EntityId) -> KanbanResult<Option<i32>> {
        let state = self.state.read().unwrap();
        Ok(state
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .map(|c| c.order)
            .max())
    }

    async fn column_insert(&self, column: &BoardColumn) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        if state.columns.contains_key(&column.column_id) {
            return Err(KanbanError::storage("column already exists"));
        }
        state.columns.insert(column.column_id, column.clone());
        Ok(())
    }

    async fn column_update(&self, id: EntityId, update: ColumnUpdate) -> KanbanResult<BoardColumn> {
        let mut state = self.state.write().unwrap();
        let column = state
            .columns
            .get_mut(&id)
            .ok_or(KanbanError::not_found(EntityType::Column, id))?;
        if let Some(name) = update.name {
            column.name = name;
        }
        if let Some(wip_limit) = update.wip_limit {
            column.wip_limit = wip_limit;
        }
        column.updated_at = chrono::Utc::now();
        Ok(column.clone())
    }

    async fn column_delete_and_reorder(&self, id: EntityId) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        let column = state
            .columns
            .get(&id)
            .cloned()
            .ok_or(KanbanError::not_found(EntityType::Column, id))?;

        let card_count = state.column_count(id);
        if card_count > 0 {
            return Err(KanbanError::ColumnNotEmpty {
                column_name: column.name,
                card_count,
            });
        }

        state.columns.remove(&id);
        for sibling in state
            .columns
            .values_mut()
            .filter(|c| c.board_id == column.board_id)
        {
            sibling.order = order_after_removal(sibling.order, column.order);
        }
        Ok(())
    }

    async fn column_card_stats(&self, column_id: EntityId) -> KanbanResult<ColumnCardStats> {
        let state = self.state.read().unwrap();
        let positions: Vec<i32> = state
            .cards
            .values()
            .filter(|c| c.column_id == column_id)
            .map(|c| c.position)
            .collect();
        Ok(ColumnCardStats {
            card_count: positions.len() as i64,
            max_position: positions.into_iter().max(),
        })
    }

    // === Card Operations ===

    async fn card_get(&self, id: EntityId) -> KanbanResult<Option<Card>> {
        Ok(self.state.read().unwrap().cards.get(&id).cloned())
    }

    async fn card_list_by_column(&self, column_id: EntityId) -> KanbanResult<Vec<Card>> {
        let state = self.state.read().unwrap();
        let mut cards: Vec<Card> = state
            .cards
            .values()
            .filter(|c| c.column_id == column_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.card_id.cmp(&b.card_id))
        });
        Ok(cards)
    }

    async fn card_count_by_board(&self, board_id: EntityId) -> KanbanResult<i64> {
        let state = self.state.read().unwrap();
        Ok(state
            .cards
            .values()
            .filter(|c| c.board_id == board_id)
            .count() as i64)
    }

    async fn card_insert(&self, card: &Card, history: &MoveHistory) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        if state.cards.contains_key(&card.card_id) {
            return Err(KanbanError::storage("card already exists"));
        }
        let column = state
            .columns
            .get(&card.column_id)
            .cloned()
            .ok_or(KanbanError::not_found(EntityType::Column, card.column_id))?;

        // Same re-check the Postgres implementation runs inside its
        // transaction: admission is decided against the serialized count.
        if !admits(state.column_count(card.column_id), column.wip_limit) {
            return Err(KanbanError::WipLimitReached {
                column_name: column.name,
                wip_limit: column.wip_limit,
            });
        }

        state.cards.insert(card.card_id, card.clone());
        state.histories.push(history.clone());
        Ok(())
    }

    async fn card_update(
        &self,
        id: EntityId,
        update: CardUpdate,
        history: &MoveHistory,
    ) -> KanbanResult<Card> {
        let mut state = self.state.write().unwrap();
        let current = state
            .cards
            .get(&id)
            .cloned()
            .ok_or(KanbanError::not_found(EntityType::Card, id))?;

        if let Some(destination_id) = update.column_id {
            if destination_id != current.column_id {
                let destination = state
                    .columns
                    .get(&destination_id)
                    .cloned()
                    .ok_or(KanbanError::not_found(EntityType::Column, destination_id))?;
                if !admits(state.column_count(destination_id), destination.wip_limit) {
                    return Err(KanbanError::WipLimitReached {
                        column_name: destination.name,
                        wip_limit: destination.wip_limit,
                    });
                }
            }
        }

        let card = state.cards.get_mut(&id).expect("card present under lock");
        if let Some(title) = update.title {
            card.title = title;
        }
        if let Some(description) = update.description {
            card.description = Some(description);
        }
        if let Some(column_id) = update.column_id {
            card.column_id = column_id;
        }
        if let Some(position) = update.position {
            card.position = position;
        }
        card.updated_at = chrono::Utc::now();
        let updated = card.clone();

        // The caller built the move event from an earlier read; the
        // serialized read above is authoritative for the from-side.
        let mut history = history.clone();
        if let CardEvent::Moved { to_column_id, .. } = history.event {
            history.event = CardEvent::Moved {
                from_column_id: current.column_id,
                to_column_id,
            };
        }
        state.histories.push(history);
        Ok(updated)
    }

    async fn card_delete(&self, id: EntityId, history: &MoveHistory) -> KanbanResult<()> {
        let mut state = self.state.write().unwrap();
        if state.cards.remove(&id).is_none() {
            return Err(KanbanError::not_found(EntityType::Card, id));
        }
        state.histories.push(history.clone());
        Ok(())
    }

    // === Move History Operations ===

    async fn history_for_card(
        &self,
        card_id: EntityId,
        limit: i64,
    ) -> KanbanResult<Vec<MoveHistory>> {
        let state = self.state.read().unwrap();
        let mut entries: Vec<MoveHistory> = state
            .histories
            .iter()
            .filter(|h| h.card_id == card_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.history_id.cmp(&a.history_id)));
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_board(owner: EntityId) -> Board {
        Board::new("Test board", None, owner)
    }

    fn make_column(board_id: EntityId, order: i32, wip_limit: Option<i32>) -> BoardColumn {
        BoardColumn::new(board_id, &format!("Column {order}"), order, wip_limit)
    }

    fn make_card(board: &Board, column: &BoardColumn, position: i32, by: EntityId) -> Card {
        Card::new(board.board_id, column.column_id, "A card", None, position, by)
    }

    fn created_history(card: &Card, actor: EntityId) -> MoveHistory {
        MoveHistory::record(
            card,
            CardEvent::Created {
                column_id: card.column_id,
            },
            actor,
        )
    }

    #[tokio::test]
    async fn test_board_insert_with_columns_is_atomic_unit() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let columns = vec![
            make_column(board.board_id, 1, None),
            make_column(board.board_id, 2, None),
        ];

        store.board_insert(&board, &columns).await.unwrap();
        let listed = store.column_list_by_board(board.board_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order, 1);
        assert_eq!(listed[1].order, 2);
    }

    #[tokio::test]
    async fn test_card_insert_rechecks_wip_under_lock() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let column = make_column(board.board_id, 1, Some(1));
        store.board_insert(&board, &[column.clone()]).await.unwrap();

        let first = make_card(&board, &column, 1, owner);
        store
            .card_insert(&first, &created_history(&first, owner))
            .await
            .unwrap();

        let second = make_card(&board, &column, 2, owner);
        let err = store
            .card_insert(&second, &created_history(&second, owner))
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::WipLimitReached { wip_limit: 1, .. }));
        // Nothing partial: card and history both absent.
        assert_eq!(store.card_count(), 1);
        assert_eq!(store.history_count(), 1);
    }

    #[tokio::test]
    async fn test_card_update_rewrites_move_source_from_stored_card() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let col_a = make_column(board.board_id, 1, None);
        let col_b = make_column(board.board_id, 2, None);
        store
            .board_insert(&board, &[col_a.clone(), col_b.clone()])
            .await
            .unwrap();
        let card = make_card(&board, &col_a, 1, owner);
        store
            .card_insert(&card, &created_history(&card, owner))
            .await
            .unwrap();

        // Event claims a from-side that went stale between read and update;
        // the store must record the column the card actually left.
        let stale_from = kanban_core::new_entity_id();
        let event = MoveHistory::record(
            &card,
            CardEvent::Moved {
                from_column_id: stale_from,
                to_column_id: col_b.column_id,
            },
            owner,
        );
        let update = CardUpdate {
            column_id: Some(col_b.column_id),
            position: Some(1),
            ..Default::default()
        };
        store.card_update(card.card_id, update, &event).await.unwrap();

        let history = store.history_for_card(card.card_id, 10).await.unwrap();
        match &history[0].event {
            CardEvent::Moved {
                from_column_id,
                to_column_id,
            } => {
                assert_eq!(*from_column_id, col_a.column_id);
                assert_eq!(*to_column_id, col_b.column_id);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_column_delete_renumbers_siblings() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let c1 = make_column(board.board_id, 1, None);
        let c2 = make_column(board.board_id, 2, None);
        let c3 = make_column(board.board_id, 3, None);
        store
            .board_insert(&board, &[c1.clone(), c2.clone(), c3.clone()])
            .await
            .unwrap();

        store.column_delete_and_reorder(c2.column_id).await.unwrap();

        let remaining = store.column_list_by_board(board.board_id).await.unwrap();
        let orders: Vec<i32> = remaining.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(remaining[0].column_id, c1.column_id);
        assert_eq!(remaining[1].column_id, c3.column_id);
    }

    #[tokio::test]
    async fn test_column_delete_rejected_while_holding_cards() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let column = make_column(board.board_id, 1, None);
        store.board_insert(&board, &[column.clone()]).await.unwrap();
        let card = make_card(&board, &column, 1, owner);
        store
            .card_insert(&card, &created_history(&card, owner))
            .await
            .unwrap();

        let err = store
            .column_delete_and_reorder(column.column_id)
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::ColumnNotEmpty { card_count: 1, .. }));
        assert!(store.column_get(column.column_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_history_reads_most_recent_first_and_survives_card() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let column = make_column(board.board_id, 1, None);
        store.board_insert(&board, &[column.clone()]).await.unwrap();
        let card = make_card(&board, &column, 1, owner);
        store
            .card_insert(&card, &created_history(&card, owner))
            .await
            .unwrap();

        let deleted = MoveHistory::record(
            &card,
            CardEvent::Deleted {
                column_id: column.column_id,
            },
            owner,
        );
        store.card_delete(card.card_id, &deleted).await.unwrap();

        let history = store.history_for_card(card.card_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event.kind(), "deleted");
        assert_eq!(history[1].event.kind(), "created");
        assert_eq!(history[0].card_title, "A card");
        assert!(store.card_get(card.card_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_limit_applies() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let column = make_column(board.board_id, 1, None);
        store.board_insert(&board, &[column.clone()]).await.unwrap();
        let card = make_card(&board, &column, 1, owner);
        store
            .card_insert(&card, &created_history(&card, owner))
            .await
            .unwrap();

        for _ in 0..5 {
            let event = MoveHistory::record(
                &card,
                CardEvent::Updated {
                    column_id: column.column_id,
                },
                owner,
            );
            store
                .card_update(card.card_id, CardUpdate::default(), &event)
                .await
                .unwrap();
        }

        let history = store.history_for_card(card.card_id, 3).await.unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_board_delete_cascades_columns_and_cards_but_not_history() {
        let store = MockStore::new();
        let owner = kanban_core::new_entity_id();
        let board = make_board(owner);
        let column = make_column(board.board_id, 1, None);
        store.board_insert(&board, &[column.clone()]).await.unwrap();
        let card = make_card(&board, &column, 1, owner);
        store
            .card_insert(&card, &created_history(&card, owner))
            .await
            .unwrap();

        store.board_delete(board.board_id).await.unwrap();

        assert!(store.board_get(board.board_id).await.unwrap().is_none());
        assert!(store.column_get(column.column_id).await.unwrap().is_none());
        assert!(store.card_get(card.card_id).await.unwrap().is_none());
        assert_eq!(store.history_count(), 1);
    }

    #[tokio::test]
    async fn test_user_lookup_by_email() {
        let store = MockStore::new();
        let now = chrono::Utc::now();
        let user = User {
            user_id: kanban_core::new_entity_id(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            password_salt: String::new(),
            created_at: now,
            updated_at: now,
        };
        store.seed_user(&user);

        let found = store.user_get_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(user.user_id));
        assert!(store.user_get_by_email("bob@example.com").await.unwrap().is_none());
    }
}
