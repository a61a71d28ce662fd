//! Item use-case service.
//!
//! # Responsibility
//! - Provide create/update/get/list entry points per card kind.
//! - Derive note card preview projections.
//! - Run the task-to-event conversion saga with explicit compensation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.
//! - Conversion is create-then-delete; a failed delete triggers a
//!   compensating delete of the just-created event, never a silent orphan.

use crate::model::item::{
    EventStatus, HubItem, ItemId, ItemKind, TaskStatus, INBOX_LANE,
};
use crate::repo::item_repo::{ItemListQuery, ItemRepository, RepoError, RepoResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const PREVIEW_MAX_CHARS: usize = 120;

/// Errors from item use-cases.
#[derive(Debug)]
pub enum ItemServiceError {
    /// Target card does not exist or is soft-deleted.
    ItemNotFound(ItemId),
    /// Operation requires a task card.
    NotATask(ItemId),
    /// Operation requires an event card.
    NotAnEvent(ItemId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
    /// Conversion failed after creating the event; the compensating delete
    /// succeeded, so storage is back where it started.
    ConversionRolledBack { task: ItemId, source: RepoError },
    /// Conversion failed and so did the compensating delete; the created
    /// event is orphaned and needs manual cleanup.
    ConversionCompensationFailed {
        task: ItemId,
        orphan_event: ItemId,
        reason: String,
    },
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::NotATask(id) => write!(f, "item is not a task: {id}"),
            Self::NotAnEvent(id) => write!(f, "item is not an event: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent item state: {details}"),
            Self::ConversionRolledBack { task, source } => {
                write!(f, "conversion of task {task} rolled back: {source}")
            }
            Self::ConversionCompensationFailed {
                task,
                orphan_event,
                reason,
            } => write!(
                f,
                "conversion of task {task} left orphan event {orphan_event}: {reason}"
            ),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::ConversionRolledBack { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RepoError> for ItemServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Request model for scheduling an event card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEventRequest {
    /// Event title stored in card `content`.
    pub title: String,
    /// Event start in epoch milliseconds.
    pub start_epoch_ms: i64,
    /// Optional event end in epoch milliseconds.
    pub end_epoch_ms: Option<i64>,
}

/// Outcome of a completed task-to-event conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    pub created_event: ItemId,
    pub retired_task: ItemId,
}

/// Derived card preview projection for note content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPreview {
    /// Sanitized summary text.
    pub preview_text: Option<String>,
    /// First markdown image path.
    pub preview_image: Option<String>,
}

/// Use-case service wrapper for item operations.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a note card with derived preview projections.
    pub fn create_note(&self, content: impl Into<String>) -> Result<HubItem, ItemServiceError> {
        let content = content.into();
        let preview = derive_card_preview(content.as_str());
        let mut item = HubItem::new(ItemKind::Note, content);
        item.preview_text = preview.preview_text;
        item.preview_image = preview.preview_image;
        item.position = self.repo.next_position(&item.lane)?;

        let id = self.repo.create_item(&item)?;
        self.read_back(id, "created note not found in read-back")
    }

    /// Creates a task card with default status `todo` on the todo lane.
    pub fn create_task(&self, content: impl Into<String>) -> Result<HubItem, ItemServiceError> {
        let mut item = HubItem::new(ItemKind::Task, content);
        item.task_status = Some(TaskStatus::Todo);
        item.lane = TaskStatus::Todo.lane().to_string();
        item.position = self.repo.next_position(&item.lane)?;

        let id = self.repo.create_item(&item)?;
        self.read_back(id, "created task not found in read-back")
    }

    /// Schedules an event card using point or range semantics.
    ///
    /// # Contract
    /// - Point event: `end_epoch_ms = None`.
    /// - Range event: `end_epoch_ms = Some(end)`.
    /// - New events start tentative.
    pub fn schedule_event(
        &self,
        request: &ScheduleEventRequest,
    ) -> Result<HubItem, ItemServiceError> {
        let mut item = HubItem::new(ItemKind::Event, request.title.clone());
        item.event_status = Some(EventStatus::Tentative);
        item.event_start = Some(request.start_epoch_ms);
        item.event_end = request.end_epoch_ms;
        item.position = self.repo.next_position(&item.lane)?;

        let id = self.repo.create_item(&item)?;
        self.read_back(id, "created event not found in read-back")
    }

    /// Registers a display card for an uploaded file.
    ///
    /// Only display metadata lives here; blob storage is handled elsewhere.
    pub fn register_file(
        &self,
        file_name: impl Into<String>,
        caption: impl Into<String>,
    ) -> Result<HubItem, ItemServiceError> {
        let mut item = HubItem::new(ItemKind::FileRef, caption);
        item.attachment_name = Some(file_name.into());
        item.position = self.repo.next_position(&item.lane)?;

        let id = self.repo.create_item(&item)?;
        self.read_back(id, "created file card not found in read-back")
    }

    /// Replaces card content fully; note cards recompute their previews.
    pub fn update_content(
        &self,
        id: ItemId,
        content: impl Into<String>,
    ) -> Result<HubItem, ItemServiceError> {
        let mut item = self
            .repo
            .get_item(id, false)?
            .ok_or(ItemServiceError::ItemNotFound(id))?;

        item.content = content.into();
        if item.kind == ItemKind::Note {
            let preview = derive_card_preview(item.content.as_str());
            item.preview_text = preview.preview_text;
            item.preview_image = preview.preview_image;
        }
        self.repo.update_item(&item)?;
        self.read_back(id, "updated item not found in read-back")
    }

    /// Advances a task card's status by one cycle step.
    ///
    /// The card snaps onto its new status lane, appended at the end, so the
    /// kanban column and the status never disagree.
    pub fn cycle_task_status(&self, id: ItemId) -> Result<HubItem, ItemServiceError> {
        let mut item = self
            .repo
            .get_item(id, false)?
            .ok_or(ItemServiceError::ItemNotFound(id))?;
        let Some(status) = item.task_status else {
            return Err(ItemServiceError::NotATask(id));
        };
        if item.kind != ItemKind::Task {
            return Err(ItemServiceError::NotATask(id));
        }

        let next = status.cycled();
        item.task_status = Some(next);
        item.lane = next.lane().to_string();
        item.position = self.repo.next_position(&item.lane)?;
        self.repo.update_item(&item)?;
        self.read_back(id, "cycled task not found in read-back")
    }

    /// Advances an event card's confirmation status by one cycle step.
    pub fn cycle_event_status(&self, id: ItemId) -> Result<HubItem, ItemServiceError> {
        let mut item = self
            .repo
            .get_item(id, false)?
            .ok_or(ItemServiceError::ItemNotFound(id))?;
        if item.kind != ItemKind::Event {
            return Err(ItemServiceError::NotAnEvent(id));
        }
        let Some(status) = item.event_status else {
            return Err(ItemServiceError::NotAnEvent(id));
        };

        item.event_status = Some(status.cycled());
        self.repo.update_item(&item)?;
        self.read_back(id, "cycled event not found in read-back")
    }

    /// Converts a task card into a scheduled event card.
    ///
    /// Runs as an explicit two-step saga: create the event, then retire the
    /// task. There is no cross-item transaction underneath, so a failed
    /// retire triggers a compensating delete of the event and the whole
    /// operation reports exactly what state storage was left in.
    pub fn convert_task_to_event(
        &self,
        id: ItemId,
        start_epoch_ms: i64,
        end_epoch_ms: Option<i64>,
    ) -> Result<ConversionReport, ItemServiceError> {
        let task = self
            .repo
            .get_item(id, false)?
            .ok_or(ItemServiceError::ItemNotFound(id))?;
        if task.kind != ItemKind::Task {
            return Err(ItemServiceError::NotATask(id));
        }

        let mut event = HubItem::new(ItemKind::Event, task.content.clone());
        event.event_status = Some(EventStatus::Tentative);
        event.event_start = Some(start_epoch_ms);
        event.event_end = end_epoch_ms;
        event.position = self.repo.next_position(INBOX_LANE)?;
        let event_id = self.repo.create_item(&event)?;

        if let Err(delete_err) = self.repo.soft_delete_item(task.uuid) {
            return match self.repo.soft_delete_item(event_id) {
                Ok(()) => {
                    warn!(
                        "event=task_convert module=item status=rolled_back \
                         error={delete_err}"
                    );
                    Err(ItemServiceError::ConversionRolledBack {
                        task: task.uuid,
                        source: delete_err,
                    })
                }
                Err(compensation_err) => {
                    warn!(
                        "event=task_convert module=item status=orphaned \
                         error={delete_err} compensation_error={compensation_err}"
                    );
                    Err(ItemServiceError::ConversionCompensationFailed {
                        task: task.uuid,
                        orphan_event: event_id,
                        reason: format!(
                            "retire failed: {delete_err}; compensation failed: {compensation_err}"
                        ),
                    })
                }
            };
        }

        info!("event=task_convert module=item status=ok");
        Ok(ConversionReport {
            created_event: event_id,
            retired_task: task.uuid,
        })
    }

    /// Gets one item by ID with optional deleted-row visibility.
    pub fn get_item(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<HubItem>> {
        self.repo.get_item(id, include_deleted)
    }

    /// Lists items using filter and pagination options.
    pub fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<HubItem>> {
        self.repo.list_items(query)
    }

    /// Soft-deletes an item by ID.
    pub fn soft_delete_item(&self, id: ItemId) -> RepoResult<()> {
        self.repo.soft_delete_item(id)
    }

    fn read_back(
        &self,
        id: ItemId,
        details: &'static str,
    ) -> Result<HubItem, ItemServiceError> {
        self.repo
            .get_item(id, false)?
            .ok_or(ItemServiceError::InconsistentState(details))
    }
}

/// Derives note card preview fields from markdown content.
///
/// Rules:
/// - `preview_image`: first markdown image path matched by regex.
/// - `preview_text`: markdown symbols removed, whitespace normalized, first
///   120 chars retained.
pub fn derive_card_preview(content: &str) -> CardPreview {
    let preview_image = MARKDOWN_IMAGE_RE
        .captures(content)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty());

    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    let preview_text = if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    };

    CardPreview {
        preview_text,
        preview_image,
    }
}
