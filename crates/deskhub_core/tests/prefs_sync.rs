use deskhub_core::db::open_db_in_memory;
use deskhub_core::{
    AgendaMode, Density, PreferenceRemote, PreferenceRepository, PrefsService, ReconcileOutcome,
    RemoteError, RepoError, SqlitePreferenceRepository, ViewPreferences,
};
use std::cell::RefCell;

/// Test double for the server-side preference store.
#[derive(Default)]
struct MockRemote {
    stored: RefCell<Option<ViewPreferences>>,
    fail_push: bool,
    fail_fetch: bool,
}

impl MockRemote {
    fn seeded(prefs: ViewPreferences) -> Self {
        Self {
            stored: RefCell::new(Some(prefs)),
            ..Self::default()
        }
    }
}

impl PreferenceRemote for MockRemote {
    fn fetch(&self) -> Result<Option<ViewPreferences>, RemoteError> {
        if self.fail_fetch {
            return Err(RemoteError::new("offline", "fetch unavailable"));
        }
        Ok(*self.stored.borrow())
    }

    fn push(&self, prefs: &ViewPreferences) -> Result<(), RemoteError> {
        if self.fail_push {
            return Err(RemoteError::new("offline", "push unavailable"));
        }
        *self.stored.borrow_mut() = Some(*prefs);
        Ok(())
    }
}

#[test]
fn current_falls_back_to_defaults_before_first_save() {
    let conn = open_db_in_memory().unwrap();
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), MockRemote::default());

    assert_eq!(service.current().unwrap(), ViewPreferences::default());
}

#[test]
fn save_bumps_revision_persists_locally_and_pushes() {
    let conn = open_db_in_memory().unwrap();
    let remote = MockRemote::default();
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), remote);

    let report = service
        .save(ViewPreferences {
            density: Density::Compact,
            ..ViewPreferences::default()
        })
        .unwrap();
    assert_eq!(report.prefs.revision, 1);
    assert!(report.pushed);

    let cached = SqlitePreferenceRepository::new(&conn).load().unwrap().unwrap();
    assert_eq!(cached, report.prefs);
    assert_eq!(cached.density, Density::Compact);

    let second = service
        .save(ViewPreferences {
            sidebar_open: false,
            ..cached
        })
        .unwrap();
    assert_eq!(second.prefs.revision, 2);
}

#[test]
fn save_still_lands_locally_when_the_push_fails() {
    let conn = open_db_in_memory().unwrap();
    let remote = MockRemote {
        fail_push: true,
        ..MockRemote::default()
    };
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), remote);

    let report = service
        .save(ViewPreferences {
            agenda_mode: AgendaMode::Day,
            ..ViewPreferences::default()
        })
        .unwrap();
    assert!(!report.pushed);

    let cached = SqlitePreferenceRepository::new(&conn).load().unwrap().unwrap();
    assert_eq!(cached.agenda_mode, AgendaMode::Day);
}

#[test]
fn reconcile_seeds_defaults_when_both_sides_are_empty() {
    let conn = open_db_in_memory().unwrap();
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), MockRemote::default());

    let report = service.reconcile().unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::SeededDefaults);
    assert_eq!(report.prefs, ViewPreferences::default());
    assert!(SqlitePreferenceRepository::new(&conn)
        .load()
        .unwrap()
        .is_some());
}

#[test]
fn reconcile_adopts_a_newer_remote_copy() {
    let conn = open_db_in_memory().unwrap();
    let local_repo = SqlitePreferenceRepository::new(&conn);
    local_repo
        .save(&ViewPreferences {
            revision: 1,
            ..ViewPreferences::default()
        })
        .unwrap();

    let remote_prefs = ViewPreferences {
        density: Density::Compact,
        sidebar_open: false,
        revision: 5,
        ..ViewPreferences::default()
    };
    let service = PrefsService::new(
        SqlitePreferenceRepository::new(&conn),
        MockRemote::seeded(remote_prefs),
    );

    let report = service.reconcile().unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::AdoptedRemote);
    assert_eq!(report.prefs, remote_prefs);
    let cached = SqlitePreferenceRepository::new(&conn).load().unwrap().unwrap();
    assert_eq!(cached, remote_prefs);
}

#[test]
fn reconcile_pushes_a_newer_local_copy() {
    let conn = open_db_in_memory().unwrap();
    let local_prefs = ViewPreferences {
        agenda_mode: AgendaMode::Month,
        revision: 7,
        ..ViewPreferences::default()
    };
    SqlitePreferenceRepository::new(&conn)
        .save(&local_prefs)
        .unwrap();

    let remote = MockRemote::seeded(ViewPreferences {
        revision: 2,
        ..ViewPreferences::default()
    });
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), remote);

    let report = service.reconcile().unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::PushedLocal);
    assert_eq!(report.prefs, local_prefs);
}

#[test]
fn reconcile_lets_the_remote_win_revision_ties() {
    let conn = open_db_in_memory().unwrap();
    SqlitePreferenceRepository::new(&conn)
        .save(&ViewPreferences {
            density: Density::Comfortable,
            revision: 3,
            ..ViewPreferences::default()
        })
        .unwrap();

    let remote_prefs = ViewPreferences {
        density: Density::Compact,
        revision: 3,
        ..ViewPreferences::default()
    };
    let service = PrefsService::new(
        SqlitePreferenceRepository::new(&conn),
        MockRemote::seeded(remote_prefs),
    );

    let report = service.reconcile().unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::AdoptedRemote);
    assert_eq!(report.prefs.density, Density::Compact);
}

#[test]
fn reconcile_reports_in_sync_without_writes() {
    let conn = open_db_in_memory().unwrap();
    let prefs = ViewPreferences {
        revision: 4,
        ..ViewPreferences::default()
    };
    SqlitePreferenceRepository::new(&conn).save(&prefs).unwrap();

    let service = PrefsService::new(
        SqlitePreferenceRepository::new(&conn),
        MockRemote::seeded(prefs),
    );
    let report = service.reconcile().unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::InSync);
}

#[test]
fn reconcile_surfaces_remote_fetch_failures() {
    let conn = open_db_in_memory().unwrap();
    let remote = MockRemote {
        fail_fetch: true,
        ..MockRemote::default()
    };
    let service = PrefsService::new(SqlitePreferenceRepository::new(&conn), remote);

    let err = service.reconcile().unwrap_err();
    assert!(err.to_string().contains("offline"));
}

#[test]
fn corrupted_cache_rows_are_invalid_data_not_fresh_state() {
    let conn = open_db_in_memory().unwrap();
    SqlitePreferenceRepository::new(&conn)
        .save(&ViewPreferences::default())
        .unwrap();
    conn.execute(
        "UPDATE preferences SET value = 'sideways' WHERE key = 'density';",
        [],
    )
    .unwrap();

    let err = SqlitePreferenceRepository::new(&conn).load().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn view_preferences_round_trip_through_serde() {
    let prefs = ViewPreferences {
        density: Density::Compact,
        agenda_mode: AgendaMode::Day,
        sidebar_open: false,
        revision: 9,
    };
    let json = serde_json::to_string(&prefs).unwrap();
    assert!(json.contains("\"compact\""));
    let back: ViewPreferences = serde_json::from_str(&json).unwrap();
    assert_eq!(back, prefs);
}
