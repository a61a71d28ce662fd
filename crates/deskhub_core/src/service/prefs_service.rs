//! Preference sync service: local cache first, remote reconcile after.
//!
//! # Responsibility
//! - Serve preferences from the local cache without blocking on the server.
//! - Reconcile local and remote copies with an explicit, testable policy.
//!
//! # Invariants
//! - Saving always lands locally; the remote push is best-effort and its
//!   failure is reported, not fatal.
//! - Reconciliation is last-write-wins by revision; remote wins ties.

use crate::prefs::{PreferenceRemote, RemoteError, ViewPreferences};
use crate::repo::item_repo::RepoError;
use crate::repo::prefs_repo::PreferenceRepository;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from preference load/save/reconcile operations.
#[derive(Debug)]
pub enum PreferenceSyncError {
    /// Local cache failure.
    Local(RepoError),
    /// Remote transport failure.
    Remote(RemoteError),
}

impl Display for PreferenceSyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PreferenceSyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Local(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<RepoError> for PreferenceSyncError {
    fn from(value: RepoError) -> Self {
        Self::Local(value)
    }
}

impl From<RemoteError> for PreferenceSyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

/// Which side won a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Neither side had a record; defaults were seeded locally.
    SeededDefaults,
    /// Remote copy was newer (or tied); local cache now mirrors it.
    AdoptedRemote,
    /// Local copy was newer; remote now mirrors it.
    PushedLocal,
    /// Both sides already held the same record.
    InSync,
}

/// Result of one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcome: ReconcileOutcome,
    pub prefs: ViewPreferences,
}

/// Result of one save: local landing plus remote push status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub prefs: ViewPreferences,
    /// Whether the fire-and-forget remote push succeeded.
    pub pushed: bool,
}

/// Preference service facade over local cache and remote store.
pub struct PrefsService<L: PreferenceRepository, S: PreferenceRemote> {
    local: L,
    remote: S,
}

impl<L: PreferenceRepository, S: PreferenceRemote> PrefsService<L, S> {
    pub fn new(local: L, remote: S) -> Self {
        Self { local, remote }
    }

    /// Returns the effective preferences: local cache, or defaults when the
    /// user never changed anything.
    pub fn current(&self) -> Result<ViewPreferences, PreferenceSyncError> {
        Ok(self.local.load()?.unwrap_or_default())
    }

    /// Accepts a preference change: bumps the revision past the cached one,
    /// persists locally, then pushes to the remote fire-and-forget.
    pub fn save(&self, prefs: ViewPreferences) -> Result<SaveReport, PreferenceSyncError> {
        let cached_revision = self.local.load()?.map_or(0, |cached| cached.revision);
        let accepted = ViewPreferences {
            revision: cached_revision + 1,
            ..prefs
        };
        self.local.save(&accepted)?;

        let pushed = match self.remote.push(&accepted) {
            Ok(()) => true,
            Err(err) => {
                warn!("event=prefs_push module=prefs status=error error={err}");
                false
            }
        };

        Ok(SaveReport {
            prefs: accepted,
            pushed,
        })
    }

    /// Reconciles the local cache with the remote copy.
    ///
    /// Last-write-wins by revision; the remote copy wins ties because the
    /// server is the cross-device authority. The losing side is overwritten
    /// so both copies agree afterwards.
    pub fn reconcile(&self) -> Result<ReconcileReport, PreferenceSyncError> {
        let local = self.local.load()?;
        let remote = self.remote.fetch()?;

        let report = match (local, remote) {
            (None, None) => {
                let prefs = ViewPreferences::default();
                self.local.save(&prefs)?;
                ReconcileReport {
                    outcome: ReconcileOutcome::SeededDefaults,
                    prefs,
                }
            }
            (Some(local), None) => {
                self.remote.push(&local)?;
                ReconcileReport {
                    outcome: ReconcileOutcome::PushedLocal,
                    prefs: local,
                }
            }
            (None, Some(remote)) => {
                self.local.save(&remote)?;
                ReconcileReport {
                    outcome: ReconcileOutcome::AdoptedRemote,
                    prefs: remote,
                }
            }
            (Some(local), Some(remote)) => {
                if local == remote {
                    ReconcileReport {
                        outcome: ReconcileOutcome::InSync,
                        prefs: local,
                    }
                } else if remote.revision >= local.revision {
                    self.local.save(&remote)?;
                    ReconcileReport {
                        outcome: ReconcileOutcome::AdoptedRemote,
                        prefs: remote,
                    }
                } else {
                    self.remote.push(&local)?;
                    ReconcileReport {
                        outcome: ReconcileOutcome::PushedLocal,
                        prefs: local,
                    }
                }
            }
        };

        info!(
            "event=prefs_reconcile module=prefs status=ok outcome={:?} revision={}",
            report.outcome, report.prefs.revision
        );
        Ok(report)
    }
}
