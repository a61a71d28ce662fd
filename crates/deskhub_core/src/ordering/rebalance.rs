//! Rebalancing plans: reset a lane to evenly spaced integer positions.
//!
//! # Responsibility
//! - Turn one lane snapshot into a batch of position writes.
//!
//! # Invariants
//! - Rebalancing is a pure re-spacing: the relative order of the input is
//!   preserved exactly, never re-sorted by another key.
//! - Planned positions are `0.0, 1.0, 2.0, …` in input order, restoring a
//!   uniform gap of 1 between consecutive cards.

use crate::model::item::{HubItem, ItemId};

/// One planned position write.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// Card to rewrite.
    pub id: ItemId,
    /// New fractional sort key.
    pub position: f64,
}

/// Plans integer positions for one lane snapshot.
///
/// `lane_items` must already be sorted by `(position, created_at)` — the
/// order the user currently sees. Applying the plan leaves that visual
/// sequence untouched while maximizing future midpoint insertions.
pub fn plan_rebalance(lane_items: &[HubItem]) -> Vec<PositionUpdate> {
    lane_items
        .iter()
        .enumerate()
        .map(|(index, item)| PositionUpdate {
            id: item.uuid,
            position: index as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::plan_rebalance;
    use crate::model::item::{HubItem, ItemKind};
    use crate::ordering::position::sort_for_display;

    fn card(position: f64, created_at: i64) -> HubItem {
        let mut item = HubItem::new(ItemKind::Note, "card");
        item.position = position;
        item.created_at = created_at;
        item
    }

    #[test]
    fn plan_preserves_input_order_with_unit_gaps() {
        let mut items = vec![card(-3.5, 10), card(0.25, 20), card(0.25, 30), card(7.0, 5)];
        sort_for_display(&mut items);
        let expected: Vec<_> = items.iter().map(|item| item.uuid).collect();

        let plan = plan_rebalance(&items);
        assert_eq!(plan.len(), 4);
        for (index, update) in plan.iter().enumerate() {
            assert_eq!(update.id, expected[index]);
            assert_eq!(update.position, index as f64);
        }
    }

    #[test]
    fn plan_is_idempotent_over_its_own_output() {
        let mut items = vec![card(0.1, 1), card(0.2, 2), card(0.3, 3)];
        sort_for_display(&mut items);
        let first = plan_rebalance(&items);

        for (item, update) in items.iter_mut().zip(&first) {
            item.position = update.position;
        }
        sort_for_display(&mut items);
        let second = plan_rebalance(&items);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_lane_plans_nothing() {
        assert!(plan_rebalance(&[]).is_empty());
    }
}
