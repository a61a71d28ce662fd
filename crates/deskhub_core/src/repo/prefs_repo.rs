//! Preference cache repository over the local SQLite `preferences` table.
//!
//! # Responsibility
//! - Persist the local copy of [`ViewPreferences`] one field per row.
//! - Keep field encodings inside the persistence boundary.
//!
//! # Invariants
//! - `save` replaces the whole record in a single transaction.
//! - `load` returns `None` only when no record was ever saved; a partially
//!   present or unparsable record is invalid data, not a fresh state.

use crate::prefs::{AgendaMode, Density, ViewPreferences};
use crate::repo::item_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

const KEY_DENSITY: &str = "density";
const KEY_AGENDA_MODE: &str = "agenda_mode";
const KEY_SIDEBAR_OPEN: &str = "sidebar_open";
const KEY_REVISION: &str = "revision";

/// Repository interface for the local preference cache.
pub trait PreferenceRepository {
    fn load(&self) -> RepoResult<Option<ViewPreferences>>;
    fn save(&self, prefs: &ViewPreferences) -> RepoResult<()>;
}

/// SQLite-backed preference cache.
pub struct SqlitePreferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePreferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PreferenceRepository for SqlitePreferenceRepository<'_> {
    fn load(&self) -> RepoResult<Option<ViewPreferences>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM preferences ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            fields.insert(row.get(0)?, row.get(1)?);
        }

        if fields.is_empty() {
            return Ok(None);
        }

        let density = parse_density(&require_field(&fields, KEY_DENSITY)?)?;
        let agenda_mode = parse_agenda_mode(&require_field(&fields, KEY_AGENDA_MODE)?)?;
        let sidebar_open = parse_bool_field(&require_field(&fields, KEY_SIDEBAR_OPEN)?)?;
        let revision = require_field(&fields, KEY_REVISION)?
            .parse::<u32>()
            .map_err(|_| invalid_field(KEY_REVISION, &fields[KEY_REVISION]))?;

        Ok(Some(ViewPreferences {
            density,
            agenda_mode,
            sidebar_open,
            revision,
        }))
    }

    fn save(&self, prefs: &ViewPreferences) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (key, value) in [
            (KEY_DENSITY, density_to_db(prefs.density).to_string()),
            (KEY_AGENDA_MODE, agenda_mode_to_db(prefs.agenda_mode).to_string()),
            (KEY_SIDEBAR_OPEN, bool_to_db(prefs.sidebar_open).to_string()),
            (KEY_REVISION, prefs.revision.to_string()),
        ] {
            tx.execute(
                "INSERT INTO preferences (key, value)
                 VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn require_field(fields: &BTreeMap<String, String>, key: &'static str) -> RepoResult<String> {
    fields
        .get(key)
        .cloned()
        .ok_or_else(|| RepoError::InvalidData(format!("preferences record is missing `{key}`")))
}

fn invalid_field(key: &str, value: &str) -> RepoError {
    RepoError::InvalidData(format!("invalid preference value `{value}` for `{key}`"))
}

fn density_to_db(density: Density) -> &'static str {
    match density {
        Density::Comfortable => "comfortable",
        Density::Compact => "compact",
    }
}

fn parse_density(value: &str) -> RepoResult<Density> {
    match value {
        "comfortable" => Ok(Density::Comfortable),
        "compact" => Ok(Density::Compact),
        other => Err(invalid_field(KEY_DENSITY, other)),
    }
}

fn agenda_mode_to_db(mode: AgendaMode) -> &'static str {
    match mode {
        AgendaMode::Day => "day",
        AgendaMode::Week => "week",
        AgendaMode::Month => "month",
    }
}

fn parse_agenda_mode(value: &str) -> RepoResult<AgendaMode> {
    match value {
        "day" => Ok(AgendaMode::Day),
        "week" => Ok(AgendaMode::Week),
        "month" => Ok(AgendaMode::Month),
        other => Err(invalid_field(KEY_AGENDA_MODE, other)),
    }
}

fn bool_to_db(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_bool_field(value: &str) -> RepoResult<bool> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(invalid_field(KEY_SIDEBAR_OPEN, other)),
    }
}
