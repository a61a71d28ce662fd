use deskhub_core::db::open_db_in_memory;
use deskhub_core::{
    HubItem, ItemId, ItemKind, ItemListQuery, ItemRepository, ItemService, ItemServiceError,
    PositionUpdate, RepoError, RepoResult, SqliteItemRepository, TaskStatus,
};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashSet;

/// Repository wrapper that simulates store outages on soft-delete, so the
/// conversion saga's compensation paths can be driven deterministically.
struct FlakyDeleteRepo<'conn> {
    inner: SqliteItemRepository<'conn>,
    fail_ids: RefCell<HashSet<ItemId>>,
    fail_all_deletes: bool,
}

impl<'conn> FlakyDeleteRepo<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteItemRepository::try_new(conn).unwrap(),
            fail_ids: RefCell::new(HashSet::new()),
            fail_all_deletes: false,
        }
    }

    fn failing_for(conn: &'conn Connection, id: ItemId) -> Self {
        let repo = Self::new(conn);
        repo.fail_ids.borrow_mut().insert(id);
        repo
    }
}

impl ItemRepository for FlakyDeleteRepo<'_> {
    fn create_item(&self, item: &HubItem) -> RepoResult<ItemId> {
        self.inner.create_item(item)
    }

    fn update_item(&self, item: &HubItem) -> RepoResult<()> {
        self.inner.update_item(item)
    }

    fn get_item(&self, id: ItemId, include_deleted: bool) -> RepoResult<Option<HubItem>> {
        self.inner.get_item(id, include_deleted)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<HubItem>> {
        self.inner.list_items(query)
    }

    fn list_items_in_lane(&self, lane: &str) -> RepoResult<Vec<HubItem>> {
        self.inner.list_items_in_lane(lane)
    }

    fn list_lanes(&self) -> RepoResult<Vec<String>> {
        self.inner.list_lanes()
    }

    fn next_position(&self, lane: &str) -> RepoResult<f64> {
        self.inner.next_position(lane)
    }

    fn set_item_position(&self, id: ItemId, lane: &str, position: f64) -> RepoResult<()> {
        self.inner.set_item_position(id, lane, position)
    }

    fn set_item_positions(&self, updates: &[PositionUpdate]) -> RepoResult<usize> {
        self.inner.set_item_positions(updates)
    }

    fn set_task_status(&self, id: ItemId, status: TaskStatus) -> RepoResult<()> {
        self.inner.set_task_status(id, status)
    }

    fn soft_delete_item(&self, id: ItemId) -> RepoResult<()> {
        if self.fail_all_deletes || self.fail_ids.borrow().contains(&id) {
            return Err(RepoError::InvalidData("simulated store outage".to_string()));
        }
        self.inner.soft_delete_item(id)
    }
}

fn seed_task(conn: &Connection, content: &str) -> HubItem {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    let mut item = HubItem::new(ItemKind::Task, content);
    item.task_status = Some(TaskStatus::Todo);
    item.lane = "todo".to_string();
    repo.create_item(&item).unwrap();
    item
}

#[test]
fn conversion_creates_the_event_and_retires_the_task() {
    let conn = open_db_in_memory().unwrap();
    let task = seed_task(&conn, "prepare quarterly review");

    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service
        .convert_task_to_event(task.uuid, 5_000, Some(6_000))
        .unwrap();
    assert_eq!(report.retired_task, task.uuid);

    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    assert!(repo.get_item(task.uuid, false).unwrap().is_none());

    let event = repo.get_item(report.created_event, false).unwrap().unwrap();
    assert_eq!(event.kind, ItemKind::Event);
    assert_eq!(event.content, "prepare quarterly review");
    assert_eq!(event.event_start, Some(5_000));
    assert_eq!(event.event_end, Some(6_000));
}

#[test]
fn failed_retire_is_compensated_by_deleting_the_created_event() {
    let conn = open_db_in_memory().unwrap();
    let task = seed_task(&conn, "flaky conversion");

    let service = ItemService::new(FlakyDeleteRepo::failing_for(&conn, task.uuid));
    let err = service
        .convert_task_to_event(task.uuid, 5_000, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::ConversionRolledBack { task: failed, .. } if failed == task.uuid
    ));

    // Storage is back where it started: task alive, no event left behind.
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    assert!(repo.get_item(task.uuid, false).unwrap().is_some());
    let events = repo
        .list_items(&ItemListQuery {
            kind: Some(ItemKind::Event),
            ..ItemListQuery::default()
        })
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn failed_compensation_reports_the_orphaned_event() {
    let conn = open_db_in_memory().unwrap();
    let task = seed_task(&conn, "doubly flaky conversion");

    let mut repo = FlakyDeleteRepo::new(&conn);
    repo.fail_all_deletes = true;
    let service = ItemService::new(repo);

    let err = service
        .convert_task_to_event(task.uuid, 5_000, None)
        .unwrap_err();
    let ItemServiceError::ConversionCompensationFailed {
        task: failed,
        orphan_event,
        ..
    } = err
    else {
        panic!("expected ConversionCompensationFailed, got {err:?}");
    };
    assert_eq!(failed, task.uuid);

    // The orphan is still visible so callers can clean it up.
    let reader = SqliteItemRepository::try_new(&conn).unwrap();
    assert!(reader.get_item(orphan_event, false).unwrap().is_some());
    assert!(reader.get_item(task.uuid, false).unwrap().is_some());
}

#[test]
fn conversion_rejects_non_task_cards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let note = HubItem::new(ItemKind::Note, "not a task");
    repo.create_item(&note).unwrap();

    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let err = service
        .convert_task_to_event(note.uuid, 5_000, None)
        .unwrap_err();
    assert!(matches!(err, ItemServiceError::NotATask(id) if id == note.uuid));
}
