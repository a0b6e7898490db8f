//! Error types for kanban operations

use crate::EntityType;
use thiserror::Error;
use uuid::Uuid;

/// Master error type for all kanban operations.
///
/// `WipLimitReached` and `WipLimitTooLow` are distinguished variants rather
/// than generic validation failures because client UIs branch on them; both
/// carry the numbers a caller needs without parsing message text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KanbanError {
    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{entity_type} with id {id} not found")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Column {column_id} does not belong to board {board_id}")]
    CrossBoardReference { column_id: Uuid, board_id: Uuid },

    #[error("Column '{column_name}' has reached its WIP limit ({wip_limit})")]
    WipLimitReached { column_name: String, wip_limit: i32 },

    #[error("WIP limit {wip_limit} is below the column's current card count ({current_count})")]
    WipLimitTooLow { current_count: i64, wip_limit: i32 },

    #[error("Column '{column_name}' still holds {card_count} card(s) and cannot be deleted")]
    ColumnNotEmpty { column_name: String, card_count: i64 },

    #[error("User {user_id} is not allowed to {action}")]
    Authorization { user_id: Uuid, action: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

impl KanbanError {
    /// Convenience constructor for field-level validation failures.
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        KanbanError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for missing entities.
    pub fn not_found(entity_type: EntityType, id: Uuid) -> Self {
        KanbanError::NotFound { entity_type, id }
    }

    /// Convenience constructor for storage failures after rollback.
    pub fn storage(reason: impl Into<String>) -> Self {
        KanbanError::Storage {
            reason: reason.into(),
        }
    }
}

/// Result type alias for kanban operations.
pub type KanbanResult<T> = Result<T, KanbanError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = KanbanError::not_found(EntityType::Card, Uuid::nil());
        let msg = format!("{}", err);
        assert!(msg.contains("Card"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_wip_limit_reached_carries_name_and_limit() {
        let err = KanbanError::WipLimitReached {
            column_name: "Doing".to_string(),
            wip_limit: 2,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Doing"));
        assert!(msg.contains('2'));
        // Machine-checkable without message parsing.
        assert!(matches!(err, KanbanError::WipLimitReached { wip_limit: 2, .. }));
    }

    #[test]
    fn test_wip_limit_too_low_names_current_count() {
        let err = KanbanError::WipLimitTooLow {
            current_count: 3,
            wip_limit: 1,
        };
        assert!(format!("{}", err).contains('3'));
    }

    #[test]
    fn test_cross_board_reference_display() {
        let err = KanbanError::CrossBoardReference {
            column_id: Uuid::nil(),
            board_id: Uuid::nil(),
        };
        assert!(format!("{}", err).contains("does not belong"));
    }
}
