//! Core entity structures

use crate::{CardEvent, EntityId, Timestamp, DEFAULT_WIP_LIMIT};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user. Owns boards, creates cards, acts in history events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: EntityId,
    pub name: String,
    pub email: String,
    /// SHA-256 digest of salt + password, hex-encoded. Never the clear text.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Per-user random salt mixed into the password digest.
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Board - top-level container with exactly one owner.
/// Only the owner may mutate the board or its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub board_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Board {
    /// Create a new board owned by `owner_id`.
    pub fn new(title: &str, description: Option<String>, owner_id: EntityId) -> Self {
        let now = Utc::now();
        Self {
            board_id: Uuid::now_v7(),
            title: title.to_string(),
            description,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether `user_id` is the board owner.
    pub fn is_owned_by(&self, user_id: EntityId) -> bool {
        self.owner_id == user_id
    }
}

/// Column - ordered, WIP-limited card container within a board.
///
/// `order` values within a board form a contiguous ascending sequence
/// starting at 1; deletion of a column renumbers its higher siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub column_id: EntityId,
    pub board_id: EntityId,
    pub name: String,
    pub order: i32,
    pub wip_limit: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BoardColumn {
    /// Create a new column at the given order slot.
    pub fn new(board_id: EntityId, name: &str, order: i32, wip_limit: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            column_id: Uuid::now_v7(),
            board_id,
            name: name.to_string(),
            order,
            wip_limit: wip_limit.unwrap_or(DEFAULT_WIP_LIMIT),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Card - the unit of work, placed in exactly one column.
///
/// `board_id` is denormalized from the column's board for fast scoping.
/// `position` orders cards within their column; ties are tolerated and
/// broken by creation order (UUIDv7 ids sort by creation time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: EntityId,
    pub board_id: EntityId,
    pub column_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_by: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Card {
    /// Create a new card placed in `column_id` at `position`.
    pub fn new(
        board_id: EntityId,
        column_id: EntityId,
        title: &str,
        description: Option<String>,
        position: i32,
        created_by: EntityId,
    ) -> Self {
        let now = Utc::now();
        Self {
            card_id: Uuid::now_v7(),
            board_id,
            column_id,
            title: title.to_string(),
            description,
            position,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One append-only move history record.
///
/// The row snapshots the card title at event time so a "deleted" event stays
/// meaningful after the card row itself is gone. History rows reference but
/// never own cards, columns, or users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveHistory {
    pub history_id: EntityId,
    pub card_id: EntityId,
    pub event: CardEvent,
    pub actor_id: EntityId,
    pub card_title: String,
    pub at: Timestamp,
}

impl MoveHistory {
    /// Record an event against a card, attributed to `actor_id`.
    pub fn record(card: &Card, event: CardEvent, actor_id: EntityId) -> Self {
        Self {
            history_id: Uuid::now_v7(),
            card_id: card.card_id,
            event,
            actor_id,
            card_title: card.title.clone(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;

    #[test]
    fn test_board_ownership() {
        let owner = new_entity_id();
        let board = Board::new("Sprint 12", None, owner);
        assert!(board.is_owned_by(owner));
        assert!(!board.is_owned_by(new_entity_id()));
    }

    #[test]
    fn test_column_defaults_wip_limit() {
        let column = BoardColumn::new(new_entity_id(), "Doing", 2, None);
        assert_eq!(column.wip_limit, DEFAULT_WIP_LIMIT);
        let limited = BoardColumn::new(new_entity_id(), "Doing", 2, Some(3));
        assert_eq!(limited.wip_limit, 3);
    }

    #[test]
    fn test_history_record_snapshots_title() {
        let board = new_entity_id();
        let column = new_entity_id();
        let actor = new_entity_id();
        let card = Card::new(board, column, "Fix flaky test", None, 1, actor);

        let entry = MoveHistory::record(
            &card,
            CardEvent::Deleted { column_id: column },
            actor,
        );
        assert_eq!(entry.card_id, card.card_id);
        assert_eq!(entry.card_title, "Fix flaky test");
        assert_eq!(entry.event.kind(), "deleted");
    }
}
