//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Local, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Directory name for a backup taken at `instant` (local wall clock).
///
/// Sorts lexicographically in chronological order, which backup retention
/// relies on.
pub fn backup_dir_name(instant: DateTime<Local>) -> String {
    instant.format("%Y%m%d_%H%M%S").to_string()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    Utc::now().timestamp()
}
