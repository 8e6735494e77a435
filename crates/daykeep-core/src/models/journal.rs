//! Journal entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREVIEW_LEN: usize = 100;

/// A free-text journal entry.
///
/// The day-grouping key is derived from `created_at`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub content: String,
    /// Optional mood glyph
    #[serde(default)]
    pub mood: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            mood: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Day grouping key, `yyyy-mm-dd`.
    #[must_use]
    pub fn date_key(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }

    /// Single-line preview of the entry, truncated to 100 characters.
    #[must_use]
    pub fn preview(&self) -> String {
        let flat = self.content.replace(['\r', '\n'], " ");
        let mut preview: String = flat.chars().take(PREVIEW_LEN).collect();
        if flat.chars().count() > PREVIEW_LEN {
            preview.push('…');
        }
        preview
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
