//! API Request and Response Types
//!
//! Request payloads the REST handlers deserialize and the response shapes
//! they serialize. Entity-to-response conversions live here so route
//! handlers stay thin.

use kanban_core::{Board, BoardColumn, Card, CardEvent, EntityId, MoveHistory, Timestamp, User};
use serde::{Deserialize, Serialize};

use crate::validation::HasUpdates;

// ============================================================================
// AUTH TYPES
// ============================================================================

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Public view of a user. Credential fields never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: EntityId,
    pub name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Abbreviated user reference embedded in board and card responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: EntityId,
    pub name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name.clone(),
        }
    }
}

// ============================================================================
// BOARD TYPES
// ============================================================================

/// Request to create a new board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBoardRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Request to update an existing board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBoardRequest {
    /// New title (if changing)
    pub title: Option<String>,
    /// New description (if changing)
    pub description: Option<String>,
}

impl HasUpdates for UpdateBoardRequest {
    fn has_any_updates(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }
}

/// One board in the public listing, with aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSummaryResponse {
    pub board_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub owner: UserRef,
    pub columns_count: i64,
    pub cards_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Response containing the public board listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBoardsResponse {
    pub boards: Vec<BoardSummaryResponse>,
}

/// Board response without materialized columns, returned from mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardResponse {
    pub board_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Board> for BoardResponse {
    fn from(board: &Board) -> Self {
        Self {
            board_id: board.board_id,
            title: board.title.clone(),
            description: board.description.clone(),
            owner_id: board.owner_id,
            created_at: board.created_at,
            updated_at: board.updated_at,
        }
    }
}

/// Board created response: the board plus its seeded columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCreatedResponse {
    pub board_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: EntityId,
    pub columns: Vec<ColumnResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fully materialized board: columns in order, each with its cards in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDetailResponse {
    pub board_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub owner: UserRef,
    pub columns: Vec<ColumnDetailResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ============================================================================
// COLUMN TYPES
// ============================================================================

/// Request to add a column to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateColumnRequest {
    pub name: String,
    /// Omitted means the default WIP limit.
    pub wip_limit: Option<i32>,
}

/// Request to rename a column or adjust its WIP limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateColumnRequest {
    pub name: Option<String>,
    pub wip_limit: Option<i32>,
}

impl HasUpdates for UpdateColumnRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.wip_limit.is_some()
    }
}

/// Column response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnResponse {
    pub column_id: EntityId,
    pub board_id: EntityId,
    pub name: String,
    pub order: i32,
    pub wip_limit: i32,
}

impl From<&BoardColumn> for ColumnResponse {
    fn from(column: &BoardColumn) -> Self {
        Self {
            column_id: column.column_id,
            board_id: column.board_id,
            name: column.name.clone(),
            order: column.order,
            wip_limit: column.wip_limit,
        }
    }
}

/// Column with its cards materialized, embedded in the board detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDetailResponse {
    pub column_id: EntityId,
    pub name: String,
    pub order: i32,
    pub wip_limit: i32,
    pub cards_count: i64,
    pub cards: Vec<CardResponse>,
}

// ============================================================================
// CARD TYPES
// ============================================================================

/// Request to create a card on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub column_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// Omitted means append at the end of the column.
    pub position: Option<i32>,
}

/// Request to edit a card in place or move it to another column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<EntityId>,
    pub position: Option<i32>,
}

impl HasUpdates for UpdateCardRequest {
    fn has_any_updates(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.column_id.is_some()
            || self.position.is_some()
    }
}

/// Card response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardResponse {
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

impl From<&Card> for CardResponse {
    fn from(card: &Card) -> Self {
        Self {
            card_id: card.card_id,
            board_id: card.board_id,
            column_id: card.column_id,
            title: card.title.clone(),
            description: card.description.clone(),
            position: card.position,
            created_by: card.created_by,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// Single card with its surrounding context and recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetailResponse {
    pub card_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub board: BoardRef,
    pub column: ColumnRef,
    pub created_by: EntityId,
    /// Most recent history entries, newest first.
    pub history: Vec<HistoryEntryResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Abbreviated board reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRef {
    pub board_id: EntityId,
    pub title: String,
}

/// Abbreviated column reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub column_id: EntityId,
    pub name: String,
}

// ============================================================================
// HISTORY TYPES
// ============================================================================

/// One entry in a card's history trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub history_id: EntityId,
    #[serde(flatten)]
    pub event: CardEvent,
    pub actor_id: EntityId,
    /// Title of the card at the time of the event.
    pub card_title: String,
    pub at: Timestamp,
}

impl From<&MoveHistory> for HistoryEntryResponse {
    fn from(history: &MoveHistory) -> Self {
        Self {
            history_id: history.history_id,
            event: history.event.clone(),
            actor_id: history.actor_id,
            card_title: history.card_title.clone(),
            at: history.at,
        }
    }
}

/// History listing for a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardHistoryResponse {
    pub card_id: EntityId,
    pub history: Vec<HistoryEntryResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kanban_core::new_entity_id;

    #[test]
    fn update_requests_report_updates() {
        let empty = UpdateBoardRequest {
            title: None,
            description: None,
        };
        assert!(!empty.has_any_updates());
        assert!(empty.validate_has_updates().is_err());

        let some = UpdateCardRequest {
            title: None,
            description: None,
            column_id: Some(new_entity_id()),
            position: None,
        };
        assert!(some.has_any_updates());
        assert!(some.validate_has_updates().is_ok());
    }

    #[test]
    fn card_response_mirrors_entity() {
        let card = Card::new(
            new_entity_id(),
            new_entity_id(),
            "Write docs",
            Some("outline first".to_string()),
            3,
            new_entity_id(),
        );
        let response = CardResponse::from(&card);
        assert_eq!(response.card_id, card.card_id);
        assert_eq!(response.position, 3);
        assert_eq!(response.title, "Write docs");
    }

    #[test]
    fn history_entry_flattens_event() {
        let actor = new_entity_id();
        let card = Card::new(new_entity_id(), new_entity_id(), "Task", None, 1, actor);
        let history = MoveHistory::record(
            &card,
            CardEvent::Created {
                column_id: card.column_id,
            },
            actor,
        );
        let entry = HistoryEntryResponse::from(&history);
        let json = serde_json::to_value(&entry).unwrap();
        // Event fields are flattened into the entry object.
        assert_eq!(json["type"], "created");
        assert_eq!(json["card_title"], "Task");
    }

    #[test]
    fn user_response_drops_credentials() {
        let now = Utc::now();
        let user = User {
            user_id: new_entity_id(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "digest".to_string(),
            password_salt: "salt".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_salt").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
