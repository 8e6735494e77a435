//! Last-writer-wins merge of a local snapshot against an optional remote one.
//!
//! Collections merge independently; there is no cross-collection pass (the
//! store's repair pass handles project/group references after the fact).
//! Deletion is not synchronized: an entity deleted locally but still present
//! in the remote record reappears after the next merge.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::models::{Group, JournalEntry, Project, ReviewNote, Snapshot, Task};
use crate::{Error, Result};

/// An entity the merge engine can reconcile by id and timestamp.
pub trait MergeEntity: Clone {
    /// Collection name used in malformed-entity errors.
    const COLLECTION: &'static str;

    fn entity_id(&self) -> &str;

    /// Timestamp competing versions are ordered by.
    fn version(&self) -> DateTime<Utc>;
}

impl MergeEntity for Task {
    const COLLECTION: &'static str = "task";

    fn entity_id(&self) -> &str {
        &self.id
    }

    // Completion is a secondary freshness signal: checking a task off on one
    // device must beat an older title edit from another.
    fn version(&self) -> DateTime<Utc> {
        self.completed_at
            .map_or(self.updated_at, |completed| self.updated_at.max(completed))
    }
}

impl MergeEntity for Group {
    const COLLECTION: &'static str = "group";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl MergeEntity for Project {
    const COLLECTION: &'static str = "project";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl MergeEntity for ReviewNote {
    const COLLECTION: &'static str = "review";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl MergeEntity for JournalEntry {
    const COLLECTION: &'static str = "journal entry";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Counts reported alongside a merged snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entities present only in the local snapshot
    pub local_only: usize,
    /// Entities present only in the remote snapshot
    pub remote_only: usize,
    /// Entities present on both sides, whichever version won
    pub merged: usize,
}

/// A reconciled snapshot plus its summary counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub snapshot: Snapshot,
    pub summary: MergeSummary,
}

/// Merge `local` against `remote`, last-writer-wins per entity.
///
/// Pure and synchronous. Every identifier present in either input appears in
/// the output exactly once. On identical timestamps the local copy wins —
/// local is the copy the user is actively editing. `remote = None` (no
/// record yet, or a degraded fetch) passes the local snapshot through.
///
/// Fails fast with [`Error::MalformedEntity`] when any entity carries an
/// empty identifier rather than silently dropping it.
pub fn merge(local: &Snapshot, remote: Option<&Snapshot>) -> Result<MergeOutcome> {
    let mut summary = MergeSummary::default();
    let snapshot = Snapshot {
        user_id: local.user_id.clone(),
        tasks: merge_collection(&local.tasks, remote.map(|r| r.tasks.as_slice()), &mut summary)?,
        groups: merge_collection(&local.groups, remote.map(|r| r.groups.as_slice()), &mut summary)?,
        projects: merge_collection(
            &local.projects,
            remote.map(|r| r.projects.as_slice()),
            &mut summary,
        )?,
        reviews: merge_collection(
            &local.reviews,
            remote.map(|r| r.reviews.as_slice()),
            &mut summary,
        )?,
        journal_entries: merge_collection(
            &local.journal_entries,
            remote.map(|r| r.journal_entries.as_slice()),
            &mut summary,
        )?,
        updated_at: Utc::now(),
    };
    Ok(MergeOutcome { snapshot, summary })
}

fn merge_collection<T: MergeEntity>(
    local: &[T],
    remote: Option<&[T]>,
    summary: &mut MergeSummary,
) -> Result<Vec<T>> {
    let remote = remote.unwrap_or_default();

    let mut local_ids = BTreeSet::new();
    for entity in local {
        local_ids.insert(require_id(entity)?);
    }

    // BTreeMap keeps the output deterministic for identical inputs.
    let mut by_id: BTreeMap<String, T> = BTreeMap::new();
    for entity in remote {
        let id = require_id(entity)?;
        if !local_ids.contains(id) {
            summary.remote_only += 1;
        }
        by_id.insert(id.to_string(), entity.clone());
    }

    for entity in local {
        let id = entity.entity_id();
        match by_id.get(id) {
            Some(existing) => {
                summary.merged += 1;
                if entity.version() >= existing.version() {
                    by_id.insert(id.to_string(), entity.clone());
                }
            }
            None => {
                summary.local_only += 1;
                by_id.insert(id.to_string(), entity.clone());
            }
        }
    }

    Ok(by_id.into_values().collect())
}

fn require_id<T: MergeEntity>(entity: &T) -> Result<&str> {
    let id = entity.entity_id();
    if id.trim().is_empty() {
        return Err(Error::MalformedEntity {
            collection: T::COLLECTION,
            detail: "empty identifier".to_string(),
        });
    }
    Ok(id)
}
