//! View preferences and their server-side contract.
//!
//! # Responsibility
//! - Define the explicit, versioned preferences record shared by all views.
//! - Define the remote contract the reconcile routine runs against.
//!
//! # Invariants
//! - `revision` increases monotonically on every accepted local change.
//! - Reconciliation is last-write-wins by revision; the remote copy wins
//!   ties (server authority).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Card density for list and board views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    Comfortable,
    Compact,
}

/// Agenda time-window mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgendaMode {
    Day,
    Week,
    Month,
}

/// Versioned view preferences.
///
/// One record replaces the scattered per-view toggles: every consumer reads
/// the same struct and every change bumps `revision` for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPreferences {
    pub density: Density,
    pub agenda_mode: AgendaMode,
    pub sidebar_open: bool,
    /// Monotonic change counter used for local/remote reconciliation.
    pub revision: u32,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            density: Density::Comfortable,
            agenda_mode: AgendaMode::Week,
            sidebar_open: true,
            revision: 0,
        }
    }
}

/// Opaque transport failure reported by a preference remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Stable machine-readable failure code.
    pub code: String,
    /// Human-readable detail; not interpreted by core.
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "preference remote failed [{}]: {}", self.code, self.message)
    }
}

impl Error for RemoteError {}

/// Server-side preference store contract.
///
/// Implementations adapt whatever backend holds the user's profile; core
/// only needs fetch and push with opaque failures.
pub trait PreferenceRemote {
    /// Loads the remote copy. `None` means the user has never synced.
    fn fetch(&self) -> Result<Option<ViewPreferences>, RemoteError>;
    /// Replaces the remote copy with `prefs`.
    fn push(&self, prefs: &ViewPreferences) -> Result<(), RemoteError>;
}
