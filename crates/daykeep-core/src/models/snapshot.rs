//! Snapshot: the full synchronized record exchanged with the remote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Group, JournalEntry, Project, ReviewNote, Task};

/// All five collections at a point in time, keyed to one user.
///
/// This is the wire shape stored as the remote record's payload. There is no
/// schema version field; evolution of the format is unhandled by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub user_id: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub reviews: Vec<ReviewNote>,
    #[serde(default)]
    pub journal_entries: Vec<JournalEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot for `user_id`, stamped now.
    #[must_use]
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tasks: Vec::new(),
            groups: Vec::new(),
            projects: Vec::new(),
            reviews: Vec::new(),
            journal_entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Total entity count across all collections.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.tasks.len()
            + self.groups.len()
            + self.projects.len()
            + self.reviews.len()
            + self.journal_entries.len()
    }
}
