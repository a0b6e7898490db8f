//! WIP gate
//!
//! Admission check deciding whether a column may accept one more card, and
//! the matching guard for lowering a column's WIP limit. The limit is an
//! inclusive ceiling: reaching it blocks further admission until a card
//! leaves. The gate applies only when a card's column actually changes; an
//! in-place edit is exempt even when the column is full.

use crate::entities::BoardColumn;
use crate::{KanbanError, KanbanResult};

/// Default WIP limit for new columns - effectively unlimited.
pub const DEFAULT_WIP_LIMIT: i32 = 999;

/// Whether a column holding `card_count` cards admits one more under `wip_limit`.
pub fn admits(card_count: i64, wip_limit: i32) -> bool {
    card_count < wip_limit as i64
}

/// Gate a card entering `column`, returning the distinguishable limit-reached
/// error when the column is full.
pub fn check_admission(column: &BoardColumn, card_count: i64) -> KanbanResult<()> {
    if !admits(card_count, column.wip_limit) {
        return Err(KanbanError::WipLimitReached {
            column_name: column.name.clone(),
            wip_limit: column.wip_limit,
        });
    }
    Ok(())
}

/// Gate a WIP limit edit: the new limit may not undercut the column's
/// current card count.
pub fn validate_wip_limit_change(new_limit: i32, current_count: i64) -> KanbanResult<()> {
    if new_limit < 0 {
        return Err(KanbanError::validation("wip_limit", "must be >= 0"));
    }
    if (new_limit as i64) < current_count {
        return Err(KanbanError::WipLimitTooLow {
            current_count,
            wip_limit: new_limit,
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;
    use proptest::prelude::*;

    fn column_with_limit(limit: i32) -> BoardColumn {
        BoardColumn::new(new_entity_id(), "Doing", 1, Some(limit))
    }

    #[test]
    fn test_limit_is_an_inclusive_ceiling() {
        assert!(admits(0, 2));
        assert!(admits(1, 2));
        assert!(!admits(2, 2));
        assert!(!admits(3, 2));
    }

    #[test]
    fn test_zero_limit_admits_nothing() {
        assert!(!admits(0, 0));
    }

    #[test]
    fn test_check_admission_reports_name_and_limit() {
        let column = column_with_limit(2);
        let err = check_admission(&column, 2).unwrap_err();
        match err {
            KanbanError::WipLimitReached {
                column_name,
                wip_limit,
            } => {
                assert_eq!(column_name, "Doing");
                assert_eq!(wip_limit, 2);
            }
            other => panic!("expected WipLimitReached, got {other:?}"),
        }
    }

    #[test]
    fn test_limit_edit_below_count_rejected() {
        let err = validate_wip_limit_change(2, 3).unwrap_err();
        match err {
            KanbanError::WipLimitTooLow { current_count, .. } => {
                assert_eq!(current_count, 3)
            }
            other => panic!("expected WipLimitTooLow, got {other:?}"),
        }
        assert!(validate_wip_limit_change(3, 3).is_ok());
        assert!(validate_wip_limit_change(0, 0).is_ok());
        assert!(validate_wip_limit_change(-1, 0).is_err());
    }

    proptest! {
        /// Admission succeeds exactly when count < limit.
        #[test]
        fn prop_admission_matches_strict_inequality(count in 0i64..10_000, limit in 0i32..10_000) {
            prop_assert_eq!(admits(count, limit), count < limit as i64);
        }

        /// A limit edit is accepted exactly when it covers the current count.
        #[test]
        fn prop_limit_edit_covers_count(limit in 0i32..10_000, count in 0i64..10_000) {
            prop_assert_eq!(
                validate_wip_limit_change(limit, count).is_ok(),
                limit as i64 >= count
            );
        }
    }
}
