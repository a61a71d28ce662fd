//! Optimistic placement overlay for in-flight card moves.
//!
//! # Responsibility
//! - Track placements the user already sees but the store has not confirmed.
//! - Project pending placements over authoritative lane reads.
//!
//! # Invariants
//! - The overlay never outranks a fresh authoritative read: absorbing a read
//!   drops every staged entry that read covered, confirmed or not
//!   (last-read-wins).
//! - Entries absent from a read stay staged; the store may simply not have
//!   served that card in the read's scope.

use crate::model::item::{HubItem, ItemId};
use crate::ordering::position::sort_for_display;
use std::collections::BTreeMap;

/// One staged, not-yet-confirmed placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPlacement {
    pub lane: String,
    pub position: f64,
}

/// In-memory overlay of pending placements keyed by card id.
///
/// The UI stages a placement right after computing it, persists in the
/// background, and absorbs the next authoritative read. Until that read
/// arrives, projections show the staged values so the drop feels instant.
#[derive(Debug, Default)]
pub struct PositionOverlay {
    pending: BTreeMap<ItemId, PendingPlacement>,
}

impl PositionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one placement, replacing any earlier staged value for the card.
    pub fn stage(&mut self, id: ItemId, lane: impl Into<String>, position: f64) {
        self.pending.insert(
            id,
            PendingPlacement {
                lane: lane.into(),
                position,
            },
        );
    }

    /// Drops one staged entry. Returns whether it existed.
    pub fn clear(&mut self, id: ItemId) -> bool {
        self.pending.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the staged placement for one card, if any.
    pub fn staged(&self, id: ItemId) -> Option<&PendingPlacement> {
        self.pending.get(&id)
    }

    /// Applies staged placements onto a lane snapshot and restores display
    /// order. Cards without staged entries are untouched.
    pub fn apply(&self, items: &mut Vec<HubItem>) {
        for item in items.iter_mut() {
            if let Some(placement) = self.pending.get(&item.uuid) {
                item.lane = placement.lane.clone();
                item.position = placement.position;
            }
        }
        sort_for_display(items);
    }

    /// Absorbs an authoritative read issued after the staged writes were
    /// acknowledged: every staged card present in `authoritative` is
    /// unstaged, whether the store confirmed the staged value or another
    /// writer won. Returns how many entries were dropped.
    pub fn absorb(&mut self, authoritative: &[HubItem]) -> usize {
        let before = self.pending.len();
        for item in authoritative {
            self.pending.remove(&item.uuid);
        }
        before - self.pending.len()
    }
}
