//! Card lifecycle events
//!
//! Each placement operation appends exactly one of these to the move history
//! log. The variant payloads differ: only a move carries both sides of the
//! transition.

use crate::EntityId;
use serde::{Deserialize, Serialize};

/// A single card lifecycle event, as recorded in the move history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardEvent {
    /// Card was created in a column.
    Created { column_id: EntityId },
    /// Card was moved between two columns of the same board.
    Moved {
        from_column_id: EntityId,
        to_column_id: EntityId,
    },
    /// Card was edited in place (title/description/position), column unchanged.
    Updated { column_id: EntityId },
    /// Card was deleted while sitting in a column.
    Deleted { column_id: EntityId },
}

impl CardEvent {
    /// Wire name of the event type ("created" | "moved" | "updated" | "deleted").
    pub fn kind(&self) -> &'static str {
        match self {
            CardEvent::Created { .. } => "created",
            CardEvent::Moved { .. } => "moved",
            CardEvent::Updated { .. } => "updated",
            CardEvent::Deleted { .. } => "deleted",
        }
    }

    /// Source column of the transition; only a move has one.
    pub fn from_column_id(&self) -> Option<EntityId> {
        match self {
            CardEvent::Moved { from_column_id, .. } => Some(*from_column_id),
            _ => None,
        }
    }

    /// Destination (or resident) column of the event.
    pub fn to_column_id(&self) -> EntityId {
        match self {
            CardEvent::Created { column_id }
            | CardEvent::Updated { column_id }
            | CardEvent::Deleted { column_id } => *column_id,
            CardEvent::Moved { to_column_id, .. } => *to_column_id,
        }
    }

    /// Reconstruct an event from its flattened storage columns.
    pub fn from_columns(
        kind: &str,
        from_column_id: Option<EntityId>,
        to_column_id: EntityId,
    ) -> Option<Self> {
        match kind {
            "created" => Some(CardEvent::Created {
                column_id: to_column_id,
            }),
            "moved" => Some(CardEvent::Moved {
                from_column_id: from_column_id?,
                to_column_id,
            }),
            "updated" => Some(CardEvent::Updated {
                column_id: to_column_id,
            }),
            "deleted" => Some(CardEvent::Deleted {
                column_id: to_column_id,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;

    #[test]
    fn test_kind_names_match_wire_format() {
        let col = new_entity_id();
        assert_eq!(CardEvent::Created { column_id: col }.kind(), "created");
        assert_eq!(CardEvent::Updated { column_id: col }.kind(), "updated");
        assert_eq!(CardEvent::Deleted { column_id: col }.kind(), "deleted");
        let moved = CardEvent::Moved {
            from_column_id: new_entity_id(),
            to_column_id: col,
        };
        assert_eq!(moved.kind(), "moved");
    }

    #[test]
    fn test_only_moves_carry_a_from_column() {
        let from = new_entity_id();
        let to = new_entity_id();
        let moved = CardEvent::Moved {
            from_column_id: from,
            to_column_id: to,
        };
        assert_eq!(moved.from_column_id(), Some(from));
        assert_eq!(moved.to_column_id(), to);
        assert_eq!(CardEvent::Created { column_id: to }.from_column_id(), None);
    }

    #[test]
    fn test_column_roundtrip() {
        let from = new_entity_id();
        let to = new_entity_id();
        let moved = CardEvent::Moved {
            from_column_id: from,
            to_column_id: to,
        };
        let rebuilt =
            CardEvent::from_columns(moved.kind(), moved.from_column_id(), moved.to_column_id())
                .unwrap();
        assert_eq!(rebuilt, moved);

        // A move without a from side is malformed storage data.
        assert!(CardEvent::from_columns("moved", None, to).is_none());
        assert!(CardEvent::from_columns("renamed", None, to).is_none());
    }
}
