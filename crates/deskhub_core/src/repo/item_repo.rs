//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and placement APIs over canonical `items` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `HubItem::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - `set_item_position` changes lane and position in one combined write.
//! - Batch position writes carry per-item semantics only; an interrupted
//!   batch reports how many updates landed before the failure.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::item::{
    EventStatus, HubItem, ItemId, ItemKind, ItemValidationError, TaskStatus,
};
use crate::ordering::rebalance::PositionUpdate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    content,
    lane,
    position,
    task_status,
    event_status,
    event_start,
    event_end,
    attachment_name,
    preview_text,
    preview_image,
    created_at,
    is_deleted
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(ItemId),
    InvalidData(String),
    /// A batch position write stopped mid-way; earlier updates are already
    /// persisted and are not rolled back.
    BatchInterrupted {
        applied: usize,
        total: usize,
        source: DbError,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::BatchInterrupted {
                applied,
                total,
                source,
            } => write!(
                f,
                "batch position write interrupted after {applied}/{total} updates: {source}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::BatchInterrupted { source, .. } => Some(source),
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing items.
#[derive(Debug, Clone, Default)]
pub struct ItemListQuery {
    pub kind: Option<ItemKind>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for item CRUD and lane placement.
///
/// The placement subset (`list_items_in_lane`, `set_item_position`,
/// `set_item_positions`) is the store contract the ordering services are
/// written against; everything else is hub CRUD.
pub trait ItemRepository {
    fn create_item(&self, item: &HubItem) -> RepoResult<ItemId>;
    fn update_item(&self, item: &HubItem) -> RepoResult<()>;
    fn get_item(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<HubItem>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<HubItem>>;
    /// Active cards in one lane, sorted by `(position, created_at, uuid)`.
    fn list_items_in_lane(&self, lane: &str) -> RepoResult<Vec<HubItem>>;
    /// Distinct lanes that currently hold active cards, sorted by name.
    fn list_lanes(&self) -> RepoResult<Vec<String>>;
    /// Creation default for a lane: one past the current maximum position.
    fn next_position(&self, lane: &str) -> RepoResult<f64>;
    /// Moves one card: lane and position change in a single combined write.
    fn set_item_position(&self, id: ItemId, lane: &str, position: f64) -> RepoResult<()>;
    /// Batch position rewrite used by rebalancing. Returns how many rows were
    /// updated; rows deleted concurrently are skipped, SQL failures interrupt
    /// the batch with `RepoError::BatchInterrupted`.
    fn set_item_positions(&self, updates: &[PositionUpdate]) -> RepoResult<usize>;
    /// Re-tags one task card's status without touching its placement.
    fn set_task_status(&self, id: ItemId, status: TaskStatus) -> RepoResult<()>;
    fn soft_delete_item(&self, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed item repository.
#[derive(Debug)]
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_item_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &HubItem) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (
                uuid,
                kind,
                content,
                lane,
                position,
                task_status,
                event_status,
                event_start,
                event_end,
                attachment_name,
                preview_text,
                preview_image,
                created_at,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                item.uuid.to_string(),
                item_kind_to_db(item.kind),
                item.content.as_str(),
                item.lane.as_str(),
                item.position,
                item.task_status.map(task_status_to_db),
                item.event_status.map(event_status_to_db),
                item.event_start,
                item.event_end,
                item.attachment_name.as_deref(),
                item.preview_text.as_deref(),
                item.preview_image.as_deref(),
                item.created_at,
                bool_to_int(item.is_deleted),
            ],
        )?;

        Ok(item.uuid)
    }

    fn update_item(&self, item: &HubItem) -> RepoResult<()> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE items
             SET
                kind = ?1,
                content = ?2,
                lane = ?3,
                position = ?4,
                task_status = ?5,
                event_status = ?6,
                event_start = ?7,
                event_end = ?8,
                attachment_name = ?9,
                preview_text = ?10,
                preview_image = ?11,
                is_deleted = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?13;",
            params![
                item_kind_to_db(item.kind),
                item.content.as_str(),
                item.lane.as_str(),
                item.position,
                item.task_status.map(task_status_to_db),
                item.event_status.map(event_status_to_db),
                item.event_start,
                item.event_end,
                item.attachment_name.as_deref(),
                item.preview_text.as_deref(),
                item.preview_image.as_deref(),
                bool_to_int(item.is_deleted),
                item.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(item.uuid));
        }

        Ok(())
    }

    fn get_item(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<HubItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<HubItem>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(item_kind_to_db(kind).to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn list_items_in_lane(&self, lane: &str) -> RepoResult<Vec<HubItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE lane = ?1
               AND is_deleted = 0
             ORDER BY position ASC, created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([lane])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn list_lanes(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT lane
             FROM items
             WHERE is_deleted = 0
             ORDER BY lane ASC;",
        )?;

        let mut rows = stmt.query([])?;
        let mut lanes = Vec::new();
        while let Some(row) = rows.next()? {
            lanes.push(row.get(0)?);
        }

        Ok(lanes)
    }

    fn next_position(&self, lane: &str) -> RepoResult<f64> {
        let next: f64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1
             FROM items
             WHERE lane = ?1
               AND is_deleted = 0;",
            [lane],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn set_item_position(&self, id: ItemId, lane: &str, position: f64) -> RepoResult<()> {
        if !position.is_finite() {
            return Err(ItemValidationError::NonFinitePosition(position).into());
        }

        let changed = self.conn.execute(
            "UPDATE items
             SET
                lane = ?2,
                position = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), lane, position],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn set_item_positions(&self, updates: &[PositionUpdate]) -> RepoResult<usize> {
        let mut applied = 0;
        for update in updates {
            if !update.position.is_finite() {
                return Err(ItemValidationError::NonFinitePosition(update.position).into());
            }

            let changed = self.conn.execute(
                "UPDATE items
                 SET
                    position = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1
                   AND is_deleted = 0;",
                params![update.id.to_string(), update.position],
            );

            match changed {
                // Zero rows means the card vanished under us; skip it and
                // keep the batch best-effort.
                Ok(0) => {}
                Ok(_) => applied += 1,
                Err(err) => {
                    return Err(RepoError::BatchInterrupted {
                        applied,
                        total: updates.len(),
                        source: DbError::Sqlite(err),
                    });
                }
            }
        }

        Ok(applied)
    }

    fn set_task_status(&self, id: ItemId, status: TaskStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET
                task_status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND kind = 'task'
               AND is_deleted = 0;",
            params![id.to_string(), task_status_to_db(status)],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn soft_delete_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<HubItem> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in items.uuid"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_item_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid item kind `{kind_text}` in items.kind"))
    })?;

    let task_status = match row.get::<_, Option<String>>("task_status")? {
        Some(value) => Some(parse_task_status(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid task status `{value}` in items.task_status"
            ))
        })?),
        None => None,
    };

    let event_status = match row.get::<_, Option<String>>("event_status")? {
        Some(value) => Some(parse_event_status(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid event status `{value}` in items.event_status"
            ))
        })?),
        None => None,
    };

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in items.is_deleted"
            )));
        }
    };

    let item = HubItem {
        uuid,
        kind,
        content: row.get("content")?,
        lane: row.get("lane")?,
        position: row.get("position")?,
        task_status,
        event_status,
        event_start: row.get("event_start")?,
        event_end: row.get("event_end")?,
        attachment_name: row.get("attachment_name")?,
        preview_text: row.get("preview_text")?,
        preview_image: row.get("preview_image")?,
        created_at: row.get("created_at")?,
        is_deleted,
    };
    item.validate()?;
    Ok(item)
}

fn item_kind_to_db(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Note => "note",
        ItemKind::Task => "task",
        ItemKind::Event => "event",
        ItemKind::FileRef => "file_ref",
    }
}

fn parse_item_kind(value: &str) -> Option<ItemKind> {
    match value {
        "note" => Some(ItemKind::Note),
        "task" => Some(ItemKind::Task),
        "event" => Some(ItemKind::Event),
        "file_ref" => Some(ItemKind::FileRef),
        _ => None,
    }
}

fn task_status_to_db(status: TaskStatus) -> &'static str {
    status.lane()
}

fn parse_task_status(value: &str) -> Option<TaskStatus> {
    TaskStatus::from_lane(value)
}

fn event_status_to_db(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Tentative => "tentative",
        EventStatus::Confirmed => "confirmed",
        EventStatus::Cancelled => "cancelled",
    }
}

fn parse_event_status(value: &str) -> Option<EventStatus> {
    match value {
        "tentative" => Some(EventStatus::Tentative),
        "confirmed" => Some(EventStatus::Confirmed),
        "cancelled" => Some(EventStatus::Cancelled),
        _ => None,
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_item_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::InvalidData(format!(
            "item repository requires schema version {expected_version}, got {actual_version}"
        )));
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'items'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::InvalidData(
            "item repository requires table `items`".to_string(),
        ));
    }

    Ok(())
}
