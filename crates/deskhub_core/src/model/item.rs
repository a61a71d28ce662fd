//! Hub item domain model.
//!
//! # Responsibility
//! - Define the canonical card record shared by note/task/event/file views.
//! - Provide status cycling, lane defaults and write-path validation.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another item.
//! - `position` is always finite; within one lane, sorting by
//!   `(position, created_at)` reproduces the user-intended card sequence.
//! - `is_deleted` is the source of truth for tombstone state.
//! - `event_end` must not be earlier than `event_start` when both are set.
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Lane for cards that have no more specific home (new notes, uploads).
pub const INBOX_LANE: &str = "inbox";

/// Stable identifier for every hub card.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ItemId = Uuid;

/// Tagged union of everything the hub can place on a board.
///
/// One storage shape backs all four projections; kind-specific fields are
/// optional on [`HubItem`] and `validate()` enforces coherence per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Free-form markdown document.
    Note,
    /// Actionable task with board status.
    Task,
    /// Calendar entry with a start and optional end time.
    Event,
    /// Display card for an uploaded file; blob storage lives elsewhere.
    FileRef,
}

/// Task lifecycle state. Doubles as the task board lane key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
    /// No longer actionable.
    Cancelled,
}

impl TaskStatus {
    /// Next state after one status-cycle tap on a task card.
    ///
    /// Cancelled tasks reactivate instead of staying terminal.
    pub fn cycled(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Todo,
            Self::Cancelled => Self::Todo,
        }
    }

    /// Board lane key that renders cards with this status.
    pub fn lane(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Reverse lane-to-status mapping for cross-lane card drops.
    pub fn from_lane(lane: &str) -> Option<Self> {
        match lane {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Confirmation state for calendar entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Penciled in, not yet committed.
    Tentative,
    /// Will happen.
    Confirmed,
    /// Called off but kept visible on the agenda.
    Cancelled,
}

impl EventStatus {
    /// Next state after one status-cycle tap on an event card.
    pub fn cycled(self) -> Self {
        match self {
            Self::Tentative => Self::Confirmed,
            Self::Confirmed => Self::Cancelled,
            Self::Cancelled => Self::Tentative,
        }
    }
}

/// Kind/field coherence violations rejected by write paths.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValidationError {
    /// `position` is NaN or infinite and would corrupt lane sorting.
    NonFinitePosition(f64),
    /// Task items must carry a task status.
    MissingTaskStatus,
    /// Only task items may carry a task status.
    UnexpectedTaskStatus(ItemKind),
    /// Event items must carry an event status.
    MissingEventStatus,
    /// Only event items may carry an event status.
    UnexpectedEventStatus(ItemKind),
    /// Event items must carry a start time.
    MissingEventStart,
    /// Notes and file cards never carry schedule fields.
    UnexpectedEventFields(ItemKind),
    /// `event_end` precedes `event_start`.
    EventRangeInverted { start: i64, end: i64 },
    /// File cards must name their attachment.
    MissingAttachmentName,
    /// Only file cards may carry an attachment name.
    UnexpectedAttachmentName(ItemKind),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinitePosition(value) => {
                write!(f, "item position must be finite, got {value}")
            }
            Self::MissingTaskStatus => write!(f, "task items require a task status"),
            Self::UnexpectedTaskStatus(kind) => {
                write!(f, "{kind:?} items must not carry a task status")
            }
            Self::MissingEventStatus => write!(f, "event items require an event status"),
            Self::UnexpectedEventStatus(kind) => {
                write!(f, "{kind:?} items must not carry an event status")
            }
            Self::MissingEventStart => write!(f, "event items require a start time"),
            Self::UnexpectedEventFields(kind) => {
                write!(f, "{kind:?} items must not carry schedule fields")
            }
            Self::EventRangeInverted { start, end } => {
                write!(f, "event end {end} precedes event start {start}")
            }
            Self::MissingAttachmentName => write!(f, "file cards require an attachment name"),
            Self::UnexpectedAttachmentName(kind) => {
                write!(f, "{kind:?} items must not carry an attachment name")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical domain record for every hub card.
///
/// Kind-specific fields stay optional so one storage shape can back all
/// board, agenda and document projections without data copying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubItem {
    /// Stable global ID used for linking and auditing.
    pub uuid: ItemId,
    /// Serialized as `kind`; selects the projection rules below.
    pub kind: ItemKind,
    /// Markdown body (or plain title for simple inputs).
    pub content: String,
    /// Lane this card currently sits in. Cards are only ordered relative to
    /// siblings sharing the same lane.
    pub lane: String,
    /// Fractional sort key within `lane`. Routinely non-integer after moves.
    pub position: f64,
    /// Meaningful only when `kind == ItemKind::Task`.
    pub task_status: Option<TaskStatus>,
    /// Meaningful only when `kind == ItemKind::Event`.
    pub event_status: Option<EventStatus>,
    /// Unix epoch milliseconds. Events require it; tasks may schedule one.
    pub event_start: Option<i64>,
    /// Unix epoch milliseconds. Must be >= `event_start` when set.
    pub event_end: Option<i64>,
    /// Original file name for `ItemKind::FileRef` cards.
    pub attachment_name: Option<String>,
    /// Derived plain-text card summary (notes).
    pub preview_text: Option<String>,
    /// Derived first-image path for the card thumbnail (notes).
    pub preview_image: Option<String>,
    /// Immutable creation timestamp (epoch ms); lane-order tiebreaker.
    pub created_at: i64,
    /// Soft delete tombstone preserving history.
    pub is_deleted: bool,
}

impl HubItem {
    /// Creates a new item with a generated stable ID in the inbox lane.
    ///
    /// # Invariants
    /// - Optional projection fields are initialized to `None`.
    /// - `position` starts at `0.0`; callers place the card before persisting.
    /// - `is_deleted` starts as `false`.
    pub fn new(kind: ItemKind, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, content)
    }

    /// Creates a new item with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(uuid: ItemId, kind: ItemKind, content: impl Into<String>) -> Self {
        Self {
            uuid,
            kind,
            content: content.into(),
            lane: INBOX_LANE.to_string(),
            position: 0.0,
            task_status: None,
            event_status: None,
            event_start: None,
            event_end: None,
            attachment_name: None,
            preview_text: None,
            preview_image: None,
            created_at: now_epoch_ms(),
            is_deleted: false,
        }
    }

    /// Checks kind/field coherence. Called by every repository write path.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if !self.position.is_finite() {
            return Err(ItemValidationError::NonFinitePosition(self.position));
        }

        match self.kind {
            ItemKind::Task => {
                if self.task_status.is_none() {
                    return Err(ItemValidationError::MissingTaskStatus);
                }
                if self.event_status.is_some() {
                    return Err(ItemValidationError::UnexpectedEventStatus(self.kind));
                }
                if self.attachment_name.is_some() {
                    return Err(ItemValidationError::UnexpectedAttachmentName(self.kind));
                }
            }
            ItemKind::Event => {
                if self.event_status.is_none() {
                    return Err(ItemValidationError::MissingEventStatus);
                }
                if self.event_start.is_none() {
                    return Err(ItemValidationError::MissingEventStart);
                }
                if self.task_status.is_some() {
                    return Err(ItemValidationError::UnexpectedTaskStatus(self.kind));
                }
                if self.attachment_name.is_some() {
                    return Err(ItemValidationError::UnexpectedAttachmentName(self.kind));
                }
            }
            ItemKind::Note => {
                self.reject_status_fields()?;
                if self.attachment_name.is_some() {
                    return Err(ItemValidationError::UnexpectedAttachmentName(self.kind));
                }
                if self.event_start.is_some() || self.event_end.is_some() {
                    return Err(ItemValidationError::UnexpectedEventFields(self.kind));
                }
            }
            ItemKind::FileRef => {
                self.reject_status_fields()?;
                match self.attachment_name.as_deref() {
                    None => return Err(ItemValidationError::MissingAttachmentName),
                    Some(name) if name.trim().is_empty() => {
                        return Err(ItemValidationError::MissingAttachmentName);
                    }
                    Some(_) => {}
                }
                if self.event_start.is_some() || self.event_end.is_some() {
                    return Err(ItemValidationError::UnexpectedEventFields(self.kind));
                }
            }
        }

        if let (Some(start), Some(end)) = (self.event_start, self.event_end) {
            if end < start {
                return Err(ItemValidationError::EventRangeInverted { start, end });
            }
        }

        Ok(())
    }

    /// Marks this item as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this item should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Returns whether this item appears on the agenda.
    pub fn is_scheduled(&self) -> bool {
        self.event_start.is_some()
    }

    fn reject_status_fields(&self) -> Result<(), ItemValidationError> {
        if self.task_status.is_some() {
            return Err(ItemValidationError::UnexpectedTaskStatus(self.kind));
        }
        if self.event_status.is_some() {
            return Err(ItemValidationError::UnexpectedEventStatus(self.kind));
        }
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
