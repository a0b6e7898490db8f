//! Kanban Storage - Storage Trait and Mock Implementation
//!
//! Defines the transactional data-access abstraction for kanban entities.
//! The production Postgres implementation lives in kanban-api; [`MockStore`]
//! backs the unit tests here and in dependent crates.
//!
//! Methods that mutate more than one row ([`BoardStore::card_insert`],
//! [`BoardStore::card_update`], [`BoardStore::card_delete`],
//! [`BoardStore::column_delete_and_reorder`], [`BoardStore::board_insert`])
//! are atomic units: implementations commit all listed rows together or none.

pub mod columns;
pub mod mock;
pub mod placement;

pub use mock::MockStore;

use async_trait::async_trait;
use kanban_core::{Board, BoardColumn, Card, EntityId, KanbanResult, MoveHistory, User};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for boards.
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Update payload for columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnUpdate {
    pub name: Option<String>,
    pub wip_limit: Option<i32>,
}

/// Update payload for cards. A `column_id` change is a move and re-triggers
/// the WIP admission check inside the storage transaction.
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<EntityId>,
    pub position: Option<i32>,
}

/// Current card count and highest position within a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnCardStats {
    pub card_count: i64,
    pub max_position: Option<i32>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Transactional data-access trait for kanban entities.
///
/// The column's card set (count + position sequence) is the only contended
/// resource; implementations must make each multi-row method an all-or-nothing
/// unit and must re-validate the destination column's WIP headroom inside
/// that unit when a card enters a column.
#[async_trait]
pub trait BoardStore: Send + Sync {
    // === User Operations ===

    /// Get a user by ID.
    async fn user_get(&self, id: EntityId) -> KanbanResult<Option<User>>;

    /// Get a user by email (login lookup).
    async fn user_get_by_email(&self, email: &str) -> KanbanResult<Option<User>>;

    // === Board Operations ===

    /// Insert a board together with its initial columns, atomically.
    async fn board_insert(&self, board: &Board, columns: &[BoardColumn]) -> KanbanResult<()>;

    /// Get a board by ID.
    async fn board_get(&self, id: EntityId) -> KanbanResult<Option<Board>>;

    /// List all boards, newest first.
    async fn board_list(&self) -> KanbanResult<Vec<Board>>;

    /// Update a board's title/description.
    async fn board_update(&self, id: EntityId, update: BoardUpdate) -> KanbanResult<Board>;

    /// Delete a board, cascading its columns and cards. Move history rows
    /// are weak references and survive.
    async fn board_delete(&self, id: EntityId) -> KanbanResult<()>;

    // === Column Operations ===

    /// Get a column by ID.
    async fn column_get(&self, id: EntityId) -> KanbanResult<Option<BoardColumn>>;

    /// List a board's columns ascending by `order`.
    async fn column_list_by_board(&self, board_id: EntityId) -> KanbanResult<Vec<BoardColumn>>;

    /// Highest `order` among a board's columns, None when the board has none.
    async fn column_max_order(&self, board_id: EntityId) -> KanbanResult<Option<i32>>;

    /// Insert a new column.
    async fn column_insert(&self, column: &BoardColumn) -> KanbanResult<()>;

    /// Update a column's name/WIP limit.
    async fn column_update(&self, id: EntityId, update: ColumnUpdate) -> KanbanResult<BoardColumn>;

    /// Delete an empty column and decrement the `order` of its higher
    /// siblings by one, atomically. Fails with `ColumnNotEmpty` when the
    /// column still holds cards.
    async fn column_delete_and_reorder(&self, id: EntityId) -> KanbanResult<()>;

    /// Card count and max position for a column.
    async fn column_card_stats(&self, column_id: EntityId) -> KanbanResult<ColumnCardStats>;

    // === Card Operations ===

    /// Get a card by ID.
    async fn card_get(&self, id: EntityId) -> KanbanResult<Option<Card>>;

    /// List a column's cards ascending by position, ties by id (creation order).
    async fn card_list_by_column(&self, column_id: EntityId) -> KanbanResult<Vec<Card>>;

    /// Total card count across a board.
    async fn card_count_by_board(&self, board_id: EntityId) -> KanbanResult<i64>;

    /// Insert a card and its "created" history row atomically, re-checking
    /// the destination column's WIP headroom inside the transaction.
    async fn card_insert(&self, card: &Card, history: &MoveHistory) -> KanbanResult<()>;

    /// Apply a card update and append its history row atomically. When the
    /// update moves the card, the destination's WIP headroom is re-checked
    /// inside the transaction and the move event's from-side is taken from
    /// the card row as read there, not from the caller's earlier snapshot.
    async fn card_update(
        &self,
        id: EntityId,
        update: CardUpdate,
        history: &MoveHistory,
    ) -> KanbanResult<Card>;

    /// Append the "deleted" history row and remove the card atomically. The
    /// history row is durably ordered with the delete; it carries the title
    /// snapshot and survives the card.
    async fn card_delete(&self, id: EntityId, history: &MoveHistory) -> KanbanResult<()>;

    // === Move History Operations ===

    /// A card's history entries, most recent first, at most `limit`.
    /// Append happens only inside the card_* transactions above; rows are
    /// never updated or deleted.
    async fn history_for_card(
        &self,
        card_id: EntityId,
        limit: i64,
    ) -> KanbanResult<Vec<MoveHistory>>;
}
