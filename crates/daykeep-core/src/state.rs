//! Shared sync status types surfaced to UI collaborators.

use std::fmt;

/// Unified sync state broadcast to status subscribers.
///
/// Advisory only: consumers render it, nothing in the sync contract depends
/// on anyone listening.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Error,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "sync failed",
        };
        write!(f, "{text}")
    }
}
