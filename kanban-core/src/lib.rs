//! Kanban Core - Entity Types
//!
//! Pure data structures plus the two pure placement contracts (position
//! sequencing and WIP admission). No I/O lives here; the storage and API
//! crates depend on this one.

pub mod entities;
pub mod error;
pub mod event;
pub mod identity;
pub mod sequencer;
pub mod wip;

pub use entities::{Board, BoardColumn, Card, MoveHistory, User};
pub use error::{KanbanError, KanbanResult};
pub use event::CardEvent;
pub use identity::{hash_secret, new_entity_id, EntityId, Timestamp};
pub use sequencer::{
    next_position, order_after_removal, resolve_position, validate_explicit_position, MIN_POSITION,
};
pub use wip::{admits, check_admission, validate_wip_limit_change, DEFAULT_WIP_LIMIT};

// ============================================================================
// FIELD CONSTRAINTS
// ============================================================================

/// Maximum board title length.
pub const BOARD_TITLE_MAX: usize = 80;
/// Maximum board description length.
pub const BOARD_DESCRIPTION_MAX: usize = 500;
/// Maximum column name length.
pub const COLUMN_NAME_MAX: usize = 40;
/// Maximum card title length.
pub const CARD_TITLE_MAX: usize = 120;
/// Maximum card description length.
pub const CARD_DESCRIPTION_MAX: usize = 1000;

/// Entity type discriminator for error reporting and polymorphic references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityType {
    User,
    Board,
    Column,
    Card,
    MoveHistory,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityType::User => "User",
            EntityType::Board => "Board",
            EntityType::Column => "Column",
            EntityType::Card => "Card",
            EntityType::MoveHistory => "MoveHistory",
        };
        write!(f, "{}", name)
    }
}
