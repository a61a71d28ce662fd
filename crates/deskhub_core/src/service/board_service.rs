//! Board use-case service: card moves and lane rebalancing.
//!
//! # Responsibility
//! - Turn drop gestures into one fractional-position write.
//! - Re-space lanes whose fractional density is exhausted.
//!
//! # Invariants
//! - A move writes exactly one card; siblings keep their stored positions.
//! - Rebalancing preserves the pre-rebalance visual sequence exactly.
//! - Persistence failures surface to the caller; nothing here retries or
//!   rolls back on the caller's behalf.

use crate::model::item::{ItemId, ItemKind, TaskStatus};
use crate::ordering::position::{compute_position, gap_exhausted};
use crate::ordering::rebalance::plan_rebalance;
use crate::repo::item_repo::{ItemRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from board use-case operations.
#[derive(Debug)]
pub enum BoardServiceError {
    /// Target card does not exist or is soft-deleted.
    ItemNotFound(ItemId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// The placement write landed but the status re-tag that follows a
    /// cross-lane task drop failed; the card sits in the new lane with its
    /// old status until a retry.
    RetagFailed {
        id: ItemId,
        lane: String,
        source: RepoError,
    },
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::RetagFailed { id, lane, source } => write!(
                f,
                "card {id} moved to lane `{lane}` but status re-tag failed: {source}"
            ),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ItemNotFound(_) => None,
            Self::Repo(err) => Some(err),
            Self::RetagFailed { source, .. } => Some(source),
        }
    }
}

impl From<RepoError> for BoardServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Scope for one rebalance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceTarget {
    /// Re-space one lane.
    Lane(String),
    /// Re-space every lane independently; indices restart at 0 per lane.
    All,
}

/// Outcome of one card move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub item: ItemId,
    pub lane: String,
    pub position: f64,
    /// The destination lane had to be re-spaced before the insert fit.
    pub rebalanced_first: bool,
    /// Status the card was re-tagged to by a cross-lane drop, if any.
    pub retagged_status: Option<TaskStatus>,
}

/// Board service facade over the item repository.
pub struct BoardService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> BoardService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Moves one card to `destination_index` within `destination_lane`.
    ///
    /// Computes a fractional position against the destination lane snapshot
    /// and persists lane + position as a single combined write. When the
    /// target slot's fractional gap is exhausted, the lane is re-spaced
    /// first and the position recomputed.
    ///
    /// Dropping a task card onto a status lane re-tags its status in a
    /// second write; that write's failure is reported as `RetagFailed`
    /// because the placement is already persisted at that point.
    pub fn move_item(
        &self,
        id: ItemId,
        destination_lane: &str,
        destination_index: usize,
    ) -> Result<MoveReport, BoardServiceError> {
        let item = self
            .repo
            .get_item(id, false)?
            .ok_or(BoardServiceError::ItemNotFound(id))?;
        let same_lane_move = item.lane == destination_lane;

        let mut lane_items = self.repo.list_items_in_lane(destination_lane)?;
        let mut position = compute_position(&lane_items, destination_index, id, same_lane_move);
        let mut rebalanced_first = false;

        if gap_exhausted(&lane_items, destination_index, id, same_lane_move, position) {
            warn!(
                "event=lane_respaced module=board status=start lane={destination_lane} \
                 trigger=gap_exhausted"
            );
            self.repo.set_item_positions(&plan_rebalance(&lane_items))?;
            lane_items = self.repo.list_items_in_lane(destination_lane)?;
            position = compute_position(&lane_items, destination_index, id, same_lane_move);
            rebalanced_first = true;
        }

        self.repo
            .set_item_position(id, destination_lane, position)?;

        let mut retagged_status = None;
        if item.kind == ItemKind::Task {
            if let Some(status) = TaskStatus::from_lane(destination_lane) {
                if item.task_status != Some(status) {
                    self.repo.set_task_status(id, status).map_err(|source| {
                        BoardServiceError::RetagFailed {
                            id,
                            lane: destination_lane.to_string(),
                            source,
                        }
                    })?;
                    retagged_status = Some(status);
                }
            }
        }

        info!(
            "event=card_moved module=board status=ok lane={destination_lane} \
             index={destination_index} rebalanced_first={rebalanced_first}"
        );

        Ok(MoveReport {
            item: id,
            lane: destination_lane.to_string(),
            position,
            rebalanced_first,
            retagged_status,
        })
    }

    /// Re-spaces lane positions to `0, 1, 2, …`, preserving visual order.
    ///
    /// Returns the number of cards whose position was rewritten. Batch
    /// writes are best-effort: an interrupted batch surfaces as
    /// `RepoError::BatchInterrupted` with the applied count, and already
    /// rewritten lanes stay rewritten.
    pub fn rebalance(&self, target: RebalanceTarget) -> Result<usize, BoardServiceError> {
        let lanes = match &target {
            RebalanceTarget::Lane(lane) => vec![lane.clone()],
            RebalanceTarget::All => self.repo.list_lanes()?,
        };

        let mut updated = 0;
        for lane in &lanes {
            let lane_items = self.repo.list_items_in_lane(lane)?;
            if lane_items.is_empty() {
                continue;
            }
            updated += self.repo.set_item_positions(&plan_rebalance(&lane_items))?;
        }

        info!(
            "event=rebalance module=board status=ok lanes={} updated={updated}",
            lanes.len()
        );
        Ok(updated)
    }
}
