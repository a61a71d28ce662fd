//! Core domain logic for the DeskHub documents hub.
//! This crate is the single source of truth for business invariants.

pub mod agenda;
pub mod db;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod overlay;
pub mod prefs;
pub mod repo;
pub mod service;

pub use agenda::{bucket_by_day, AgendaError, DayBucket};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{
    EventStatus, HubItem, ItemId, ItemKind, ItemValidationError, TaskStatus, INBOX_LANE,
};
pub use ordering::position::{compute_position, gap_exhausted, sort_for_display};
pub use ordering::rebalance::{plan_rebalance, PositionUpdate};
pub use overlay::{PendingPlacement, PositionOverlay};
pub use prefs::{AgendaMode, Density, PreferenceRemote, RemoteError, ViewPreferences};
pub use repo::item_repo::{
    ItemListQuery, ItemRepository, RepoError, RepoResult, SqliteItemRepository,
};
pub use repo::prefs_repo::{PreferenceRepository, SqlitePreferenceRepository};
pub use service::board_service::{
    BoardService, BoardServiceError, MoveReport, RebalanceTarget,
};
pub use service::item_service::{
    derive_card_preview, CardPreview, ConversionReport, ItemService, ItemServiceError,
    ScheduleEventRequest,
};
pub use service::prefs_service::{
    PreferenceSyncError, PrefsService, ReconcileOutcome, ReconcileReport, SaveReport,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
