use deskhub_core::db::open_db_in_memory;
use deskhub_core::{
    BoardService, BoardServiceError, HubItem, ItemKind, ItemRepository, SqliteItemRepository,
    TaskStatus,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed_task(conn: &Connection, lane: &str, position: f64, created_at: i64) -> HubItem {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    let mut item = HubItem::new(ItemKind::Task, format!("task@{position}"));
    item.task_status = TaskStatus::from_lane(lane).or(Some(TaskStatus::Todo));
    item.lane = lane.to_string();
    item.position = position;
    item.created_at = created_at;
    repo.create_item(&item).unwrap();
    item
}

fn lane_ids(conn: &Connection, lane: &str) -> Vec<Uuid> {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    repo.list_items_in_lane(lane)
        .unwrap()
        .iter()
        .map(|item| item.uuid)
        .collect()
}

#[test]
fn same_lane_move_to_front_prepends_without_touching_siblings() {
    let conn = setup();
    let a = seed_task(&conn, "todo", 0.0, 100);
    let b = seed_task(&conn, "todo", 1.0, 200);
    let c = seed_task(&conn, "todo", 2.0, 300);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(c.uuid, "todo", 0).unwrap();

    // C compares against [A, B] only; landing before A(0) yields 0 - 1.
    assert_eq!(report.position, -1.0);
    assert!(!report.rebalanced_first);
    assert_eq!(lane_ids(&conn, "todo"), vec![c.uuid, a.uuid, b.uuid]);

    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let a_after = repo.get_item(a.uuid, false).unwrap().unwrap();
    let b_after = repo.get_item(b.uuid, false).unwrap().unwrap();
    assert_eq!(a_after.position, 0.0);
    assert_eq!(b_after.position, 1.0);
}

#[test]
fn midpoint_insert_lands_between_neighbors() {
    let conn = setup();
    let a = seed_task(&conn, "todo", 0.0, 100);
    let b = seed_task(&conn, "todo", 1.0, 200);
    let c = seed_task(&conn, "todo", 2.0, 300);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(c.uuid, "todo", 1).unwrap();

    assert!(report.position > 0.0 && report.position < 1.0);
    assert_eq!(lane_ids(&conn, "todo"), vec![a.uuid, c.uuid, b.uuid]);
}

#[test]
fn move_into_empty_lane_starts_at_zero() {
    let conn = setup();
    let d = seed_task(&conn, "todo", 3.0, 100);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(d.uuid, "done", 0).unwrap();

    assert_eq!(report.position, 0.0);
    assert_eq!(report.lane, "done");
    assert_eq!(lane_ids(&conn, "done"), vec![d.uuid]);
    assert!(lane_ids(&conn, "todo").is_empty());
}

#[test]
fn cross_lane_drop_onto_status_lane_retags_the_task() {
    let conn = setup();
    let item = seed_task(&conn, "todo", 0.0, 100);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(item.uuid, "in_progress", 0).unwrap();
    assert_eq!(report.retagged_status, Some(TaskStatus::InProgress));

    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let loaded = repo.get_item(item.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.lane, "in_progress");
    assert_eq!(loaded.task_status, Some(TaskStatus::InProgress));
}

#[test]
fn drop_onto_non_status_lane_keeps_the_task_status() {
    let conn = setup();
    let item = seed_task(&conn, "todo", 0.0, 100);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(item.uuid, "inbox", 0).unwrap();
    assert_eq!(report.retagged_status, None);

    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let loaded = repo.get_item(item.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.lane, "inbox");
    assert_eq!(loaded.task_status, Some(TaskStatus::Todo));
}

#[test]
fn append_move_goes_one_past_the_tail() {
    let conn = setup();
    let a = seed_task(&conn, "todo", 0.0, 100);
    let b = seed_task(&conn, "todo", 1.0, 200);
    let mover = seed_task(&conn, "done", 0.0, 300);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(mover.uuid, "todo", 2).unwrap();

    assert_eq!(report.position, 2.0);
    assert_eq!(lane_ids(&conn, "todo"), vec![a.uuid, b.uuid, mover.uuid]);
}

#[test]
fn moving_a_missing_card_reports_not_found() {
    let conn = setup();
    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let ghost = Uuid::new_v4();
    let err = service.move_item(ghost, "todo", 0).unwrap_err();
    assert!(matches!(err, BoardServiceError::ItemNotFound(id) if id == ghost));
}

#[test]
fn exhausted_gap_triggers_a_lane_respace_before_the_insert() {
    let conn = setup();
    let before: f64 = 1.0;
    let after = f64::from_bits(before.to_bits() + 1);
    let a = seed_task(&conn, "todo", before, 100);
    let b = seed_task(&conn, "todo", after, 200);
    let mover = seed_task(&conn, "done", 0.0, 300);

    let service = BoardService::new(SqliteItemRepository::try_new(&conn).unwrap());
    let report = service.move_item(mover.uuid, "todo", 1).unwrap();

    assert!(report.rebalanced_first);
    assert_eq!(lane_ids(&conn, "todo"), vec![a.uuid, mover.uuid, b.uuid]);

    // After the respace the neighbors sit at 0 and 1; the insert is a clean
    // midpoint again.
    assert_eq!(report.position, 0.5);
}
