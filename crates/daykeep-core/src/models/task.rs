//! Task model

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task priority, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

/// A todo item, optionally a sub-task of another task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    /// Due date, without time of day
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Optional due time in `HH:MM` form
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Owning group, if any
    #[serde(default)]
    pub group_id: Option<String>,
    /// Parent task id; set for sub-tasks
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Due date before the task was postponed; presence marks postponement
    #[serde(default)]
    pub original_due_date: Option<NaiveDate>,
    /// Cached sub-task counters, recomputed by the store, never merged
    #[serde(default)]
    pub subtask_total: u32,
    #[serde(default)]
    pub subtask_completed: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            completed: false,
            completed_at: None,
            priority: Priority::Low,
            due_date: None,
            due_time: None,
            note: None,
            group_id: None,
            parent_id: None,
            original_due_date: None,
            subtask_total: 0,
            subtask_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a sub-task of `parent`, inheriting its priority and group.
    #[must_use]
    pub fn new_subtask(parent: &Self, title: impl Into<String>) -> Self {
        let mut task = Self::new(title);
        task.parent_id = Some(parent.id.clone());
        task.priority = parent.priority;
        task.group_id = parent.group_id.clone();
        task
    }

    #[must_use]
    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Toggle completion, stamping or clearing the completion timestamp.
    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.completed_at = completed.then(Utc::now);
        self.touch();
    }

    /// Postpone the task to `date`, remembering the first original due date.
    ///
    /// No-op for tasks without a due date or already completed.
    pub fn postpone_to(&mut self, date: NaiveDate) {
        let Some(due) = self.due_date else { return };
        if self.completed {
            return;
        }
        if self.original_due_date.is_none() {
            self.original_due_date = Some(due);
        }
        self.due_date = Some(date);
        self.due_time = None;
        self.touch();
    }

    /// Whether the due deadline has passed, honoring the due time when set.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Local>) -> bool {
        if self.completed {
            return false;
        }
        let Some(due_date) = self.due_date else {
            return false;
        };
        if let Some(time) = self
            .due_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        {
            return now.naive_local() > due_date.and_time(time);
        }
        due_date < now.date_naive()
    }

    /// Bump the update timestamp after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_task_is_pending() {
        let task = Task::new("write report");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn subtask_inherits_priority_and_group() {
        let mut parent = Task::new("parent");
        parent.priority = Priority::High;
        parent.group_id = Some("g1".to_string());

        let sub = Task::new_subtask(&parent, "child");
        assert!(sub.is_subtask());
        assert_eq!(sub.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(sub.priority, Priority::High);
        assert_eq!(sub.group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn set_completed_stamps_and_clears() {
        let mut task = Task::new("t");
        task.set_completed(true);
        assert!(task.completed_at.is_some());
        task.set_completed(false);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn postpone_keeps_first_original_due_date() {
        let mut task = Task::new("t");
        let original = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        task.due_date = Some(original);

        task.postpone_to(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        task.postpone_to(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

        assert_eq!(task.original_due_date, Some(original));
        assert_eq!(task.due_date, Some(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
    }

    #[test]
    fn overdue_honors_due_time() {
        let mut task = Task::new("t");
        task.due_date = Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        task.due_time = Some("09:00".to_string());

        let before = Local.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let after = Local.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        assert!(!task.is_overdue(before));
        assert!(task.is_overdue(after));
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let task = Task::new("t");
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("originalDueDate").is_some());
        assert!(json.get("subtaskTotal").is_some());
    }
}
