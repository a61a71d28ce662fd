//! Fractional position assignment for card moves.
//!
//! # Responsibility
//! - Compute the position value that lands one card at a target index.
//! - Detect when a lane's fractional gaps are exhausted.
//!
//! # Invariants
//! - `compute_position` is pure arithmetic; it cannot fail and has no side
//!   effects. Persisting the result is the caller's job.
//! - When both neighbors exist and are strictly ordered, the returned value
//!   sorts strictly between them, so no sibling needs rewriting.
//! - A same-lane move never uses the moved card's own position as a neighbor.

use crate::model::item::{HubItem, ItemId};

/// Computes the position that places `moved_item` at `destination_index`
/// inside the destination lane.
///
/// `destination_items` is the destination lane's current content sorted by
/// `(position, created_at)`. On a same-lane move the moved card is stripped
/// from the list before neighbor lookup, so the before/after neighbors
/// reflect the lane *without* it.
///
/// Neighbor policy:
/// - both neighbors present: arithmetic midpoint;
/// - only a predecessor (append): predecessor + 1;
/// - only a successor (prepend): successor - 1;
/// - empty lane: 0.
///
/// Once repeated midpoints exhaust IEEE-754 precision the result may
/// collide with a neighbor; this function reports whatever the arithmetic
/// yields and leaves recovery to [`gap_exhausted`] callers.
pub fn compute_position(
    destination_items: &[HubItem],
    destination_index: usize,
    moved_item: ItemId,
    same_lane_move: bool,
) -> f64 {
    let (before, after) = neighbor_positions(
        destination_items,
        destination_index,
        moved_item,
        same_lane_move,
    );

    match (before, after) {
        (Some(before), Some(after)) => (before + after) / 2.0,
        (Some(before), None) => before + 1.0,
        (None, Some(after)) => after - 1.0,
        (None, None) => 0.0,
    }
}

/// Reports whether `candidate` failed to strictly separate its neighbors at
/// the target slot, i.e. the lane's fractional density is used up there.
///
/// Callers that see `true` should rebalance the lane and recompute before
/// persisting; persisting the collided value would produce a duplicate sort
/// key that only a later rebalance untangles.
pub fn gap_exhausted(
    destination_items: &[HubItem],
    destination_index: usize,
    moved_item: ItemId,
    same_lane_move: bool,
    candidate: f64,
) -> bool {
    let (before, after) = neighbor_positions(
        destination_items,
        destination_index,
        moved_item,
        same_lane_move,
    );

    if let Some(before) = before {
        if candidate <= before {
            return true;
        }
    }
    if let Some(after) = after {
        if candidate >= after {
            return true;
        }
    }
    false
}

/// Sorts one lane snapshot into display order:
/// `(position ASC, created_at ASC, uuid ASC)`.
///
/// Positions are finite on every persisted item (`HubItem::validate`), so
/// `total_cmp` matches numeric order here.
pub fn sort_for_display(items: &mut [HubItem]) {
    items.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.uuid.cmp(&b.uuid))
    });
}

fn neighbor_positions(
    destination_items: &[HubItem],
    destination_index: usize,
    moved_item: ItemId,
    same_lane_move: bool,
) -> (Option<f64>, Option<f64>) {
    let mut positions = Vec::with_capacity(destination_items.len());
    for item in destination_items {
        if same_lane_move && item.uuid == moved_item {
            continue;
        }
        positions.push(item.position);
    }

    let slot = destination_index.min(positions.len());
    let before = slot.checked_sub(1).and_then(|i| positions.get(i)).copied();
    let after = positions.get(slot).copied();
    (before, after)
}

#[cfg(test)]
mod tests {
    use super::{compute_position, gap_exhausted, sort_for_display};
    use crate::model::item::{HubItem, ItemKind};
    use uuid::Uuid;

    fn card(position: f64) -> HubItem {
        let mut item = HubItem::new(ItemKind::Note, "card");
        item.position = position;
        item
    }

    fn lane(positions: &[f64]) -> Vec<HubItem> {
        positions.iter().copied().map(card).collect()
    }

    #[test]
    fn midpoint_lands_strictly_between_neighbors() {
        let items = lane(&[0.0, 1.0, 2.0]);
        let value = compute_position(&items, 1, Uuid::new_v4(), false);
        assert!(value > 0.0 && value < 1.0);
        assert_eq!(value, 0.5);
    }

    #[test]
    fn append_goes_one_past_the_tail() {
        let items = lane(&[0.0, 1.0]);
        assert_eq!(compute_position(&items, 2, Uuid::new_v4(), false), 2.0);
        // An index past the end clamps to appending.
        assert_eq!(compute_position(&items, 9, Uuid::new_v4(), false), 2.0);
    }

    #[test]
    fn prepend_goes_one_before_the_head() {
        let items = lane(&[0.0, 1.0]);
        assert_eq!(compute_position(&items, 0, Uuid::new_v4(), false), -1.0);
    }

    #[test]
    fn empty_lane_starts_at_zero() {
        assert_eq!(compute_position(&[], 0, Uuid::new_v4(), false), 0.0);
    }

    #[test]
    fn same_lane_move_excludes_the_moved_card() {
        // Lane: A(0), B(1), C(2). Moving C to the front must compare against
        // [A, B] only, so the result is A - 1, never C's own position.
        let items = lane(&[0.0, 1.0, 2.0]);
        let moved = items[2].uuid;
        let value = compute_position(&items, 0, moved, true);
        assert_eq!(value, -1.0);
    }

    #[test]
    fn cross_lane_move_keeps_every_destination_card_as_neighbor() {
        let items = lane(&[0.0, 1.0]);
        let foreign = Uuid::new_v4();
        assert_eq!(compute_position(&items, 1, foreign, false), 0.5);
    }

    #[test]
    fn negative_positions_midpoint_correctly() {
        let items = lane(&[-2.0, -1.0]);
        let value = compute_position(&items, 1, Uuid::new_v4(), false);
        assert_eq!(value, -1.5);
    }

    #[test]
    fn exhausted_gap_is_detected() {
        let before: f64 = 1.0;
        let after = f64::from_bits(before.to_bits() + 1);
        let items = lane(&[before, after]);
        let candidate = compute_position(&items, 1, Uuid::new_v4(), false);
        assert!(gap_exhausted(&items, 1, Uuid::new_v4(), false, candidate));
    }

    #[test]
    fn healthy_gap_is_not_flagged() {
        let items = lane(&[0.0, 1.0]);
        let candidate = compute_position(&items, 1, Uuid::new_v4(), false);
        assert!(!gap_exhausted(&items, 1, Uuid::new_v4(), false, candidate));
    }

    #[test]
    fn display_sort_breaks_position_ties_by_creation_time() {
        let mut older = card(1.0);
        older.created_at = 100;
        let mut newer = card(1.0);
        newer.created_at = 200;
        let mut items = vec![newer.clone(), older.clone()];
        sort_for_display(&mut items);
        assert_eq!(items[0].uuid, older.uuid);
        assert_eq!(items[1].uuid, newer.uuid);
    }
}
