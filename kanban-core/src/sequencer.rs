//! Position sequencer
//!
//! Computes insertion positions for cards within a column's ordered list and
//! the column-order renumbering applied when a column is deleted. Positions
//! are per-column monotonically increasing integers; they are never
//! renumbered on read, only on explicit reorder requests that supply an
//! explicit position.

use crate::{KanbanError, KanbanResult};

/// Smallest valid position/order value.
pub const MIN_POSITION: i32 = 1;

/// Position for a card appended to a column.
///
/// Returns max + 1 over the column's existing positions, or [`MIN_POSITION`]
/// when the column is empty. Saturates at `i32::MAX`: a column already
/// holding a card at the maximum position appends as a tie, which the
/// (position, card_id) read ordering settles.
pub fn next_position(current_max: Option<i32>) -> i32 {
    match current_max {
        Some(max) => max.saturating_add(1),
        None => MIN_POSITION,
    }
}

/// Validate a caller-supplied explicit position.
///
/// Explicit positions are accepted as-is (no gap compaction); overlaps are
/// tolerated and ordering among ties is settled by creation order.
pub fn validate_explicit_position(position: i32) -> KanbanResult<i32> {
    if position < MIN_POSITION {
        return Err(KanbanError::validation(
            "position",
            format!("must be >= {}", MIN_POSITION),
        ));
    }
    Ok(position)
}

/// Resolve the position to store for a placement.
///
/// `explicit` wins when supplied; otherwise the append rule applies against
/// the destination column's current maximum.
pub fn resolve_position(explicit: Option<i32>, current_max: Option<i32>) -> KanbanResult<i32> {
    match explicit {
        Some(position) => validate_explicit_position(position),
        None => Ok(next_position(current_max)),
    }
}

/// New `order` value for a sibling column after one at `removed_order` is
/// deleted. Columns above the removed slot shift down by one so the board's
/// column ordering stays contiguous from 1.
pub fn order_after_removal(order: i32, removed_order: i32) -> i32 {
    if order > removed_order {
        order - 1
    } else {
        order
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_next_position_appends_after_max() {
        assert_eq!(next_position(None), 1);
        assert_eq!(next_position(Some(1)), 2);
        assert_eq!(next_position(Some(41)), 42);
    }

    #[test]
    fn test_next_position_saturates_at_max() {
        // An explicit card at i32::MAX must not make the next append panic
        // or wrap below MIN_POSITION; it lands as a tolerated tie.
        assert_eq!(next_position(Some(i32::MAX)), i32::MAX);
        assert_eq!(next_position(Some(i32::MAX - 1)), i32::MAX);
        assert_eq!(resolve_position(None, Some(i32::MAX)).unwrap(), i32::MAX);
    }

    #[test]
    fn test_explicit_position_accepted_verbatim() {
        assert_eq!(resolve_position(Some(7), Some(2)).unwrap(), 7);
        // Overlap with an occupied slot is allowed.
        assert_eq!(resolve_position(Some(2), Some(5)).unwrap(), 2);
    }

    #[test]
    fn test_explicit_position_below_one_rejected() {
        assert!(resolve_position(Some(0), None).is_err());
        assert!(resolve_position(Some(-3), Some(4)).is_err());
    }

    #[test]
    fn test_order_after_removal_keeps_contiguity() {
        // Board ordered [1,2,3]; deleting order 2 leaves [1,2].
        let remaining: Vec<i32> = [1, 3].iter().map(|&o| order_after_removal(o, 2)).collect();
        assert_eq!(remaining, vec![1, 2]);
    }

    proptest! {
        /// The append rule always yields a strictly larger position.
        #[test]
        fn prop_next_position_is_strictly_increasing(max in 1i32..1_000_000) {
            prop_assert!(next_position(Some(max)) > max);
        }

        /// After removing any column, the surviving orders stay contiguous
        /// from 1 and preserve relative order.
        #[test]
        fn prop_removal_renumbering_is_contiguous(len in 2usize..20, pick in 0usize..20) {
            let removed = (pick % len) as i32 + 1;
            let survivors: Vec<i32> = (1..=len as i32)
                .filter(|&o| o != removed)
                .map(|o| order_after_removal(o, removed))
                .collect();
            let expected: Vec<i32> = (1..=(len as i32 - 1)).collect();
            prop_assert_eq!(survivors, expected);
        }
    }
}
