//! Local document store: one JSON file per collection.
//!
//! All writes are full-file replacements through a temp-file-then-rename so a
//! failed save never corrupts the previously persisted file. Reads that fail
//! (missing, unreadable, or malformed file) degrade to an empty collection —
//! the application keeps running in local-only mode rather than crashing.

pub mod backup;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{
    Group, JournalEntry, Priority, Project, ReviewNote, ReviewPeriod, Snapshot, Task,
};
use crate::{Error, Result};

/// File names of the five persisted collections, mirrored by backups.
pub const COLLECTION_FILES: [&str; 5] = [
    "tasks.json",
    "groups.json",
    "projects.json",
    "reviews.json",
    "journal.json",
];

/// Published on every persisted local mutation the remote should learn about.
///
/// Snapshot application after a merge saves without publishing, so reconciled
/// data never re-arms the sync debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Changed,
}

#[derive(Debug, Default)]
struct Collections {
    tasks: Vec<Task>,
    groups: Vec<Group>,
    projects: Vec<Project>,
    reviews: Vec<ReviewNote>,
    journal: Vec<JournalEntry>,
}

/// The single shared mutable resource of the sync core.
pub struct DocumentStore {
    data_dir: PathBuf,
    inner: RwLock<Collections>,
    events: broadcast::Sender<StoreEvent>,
}

impl DocumentStore {
    /// Open (or initialize) the store under `data_dir` and load every
    /// collection from disk.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let (events, _) = broadcast::channel(64);
        let store = Self {
            data_dir,
            inner: RwLock::new(Collections::default()),
            events,
        };
        store.reload()?;

        // Post-load consistency passes; persisted quietly when they change
        // anything.
        store.repair_project_groups()?;
        store.refresh_subtask_counts()?;

        Ok(store)
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Subscribe to local-mutation notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Re-read every collection from disk, replacing in-memory state.
    ///
    /// Used after opening and after a backup restore.
    pub fn reload(&self) -> Result<()> {
        let loaded = Collections {
            tasks: self.load_collection("tasks.json"),
            groups: self.load_collection("groups.json"),
            projects: self.load_collection("projects.json"),
            reviews: self.load_collection("reviews.json"),
            journal: self.load_collection("journal.json"),
        };
        *self.write_lock() = loaded;
        Ok(())
    }

    /// Assemble the full snapshot for `user_id`.
    #[must_use]
    pub fn snapshot(&self, user_id: &str) -> Snapshot {
        let inner = self.read_lock();
        Snapshot {
            user_id: user_id.to_string(),
            tasks: inner.tasks.clone(),
            groups: inner.groups.clone(),
            projects: inner.projects.clone(),
            reviews: inner.reviews.clone(),
            journal_entries: inner.journal.clone(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Replace every collection with the reconciled snapshot and persist,
    /// without publishing change events.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        {
            let mut inner = self.write_lock();
            inner.tasks = snapshot.tasks.clone();
            inner.groups = snapshot.groups.clone();
            inner.projects = snapshot.projects.clone();
            inner.reviews = snapshot.reviews.clone();
            inner.journal = snapshot.journal_entries.clone();
            self.persist_all(&inner)?;
        }
        self.repair_project_groups()?;
        self.refresh_subtask_counts()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Task operations
    // ------------------------------------------------------------------

    pub fn add_task(
        &self,
        title: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
        group_id: Option<String>,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("task title must not be empty".to_string()));
        }
        let mut task = Task::new(title);
        task.priority = priority;
        task.due_date = due_date;
        task.group_id = group_id;

        let mut inner = self.write_lock();
        inner.tasks.insert(0, task.clone());
        self.persist_tasks(&inner, true)?;
        Ok(task)
    }

    /// Add a sub-task under `parent_id` and refresh the parent's counters.
    pub fn add_subtask(&self, parent_id: &str, title: &str) -> Result<Task> {
        let mut inner = self.write_lock();
        let parent = inner
            .tasks
            .iter()
            .find(|t| t.id == parent_id)
            .ok_or_else(|| Error::NotFound(format!("task {parent_id}")))?
            .clone();

        let subtask = Task::new_subtask(&parent, title);
        let position = inner
            .tasks
            .iter()
            .position(|t| t.id == parent_id)
            .map_or(0, |index| index + 1);
        inner.tasks.insert(position, subtask.clone());
        recount_subtasks(&mut inner.tasks);
        self.persist_tasks(&inner, true)?;
        Ok(subtask)
    }

    pub fn set_task_completed(&self, id: &str, completed: bool) -> Result<()> {
        let mut inner = self.write_lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        task.set_completed(completed);
        recount_subtasks(&mut inner.tasks);
        self.persist_tasks(&inner, true)
    }

    /// Delete a task and all of its sub-tasks.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        let mut inner = self.write_lock();
        if !inner.tasks.iter().any(|t| t.id == id) {
            return Err(Error::NotFound(format!("task {id}")));
        }
        inner
            .tasks
            .retain(|t| t.id != id && t.parent_id.as_deref() != Some(id));
        recount_subtasks(&mut inner.tasks);
        self.persist_tasks(&inner, true)
    }

    /// Replace an existing task with `task`, stamping the update.
    pub fn update_task(&self, task: Task) -> Result<()> {
        let mut inner = self.write_lock();
        let slot = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task.id)))?;
        *slot = task;
        slot.touch();
        recount_subtasks(&mut inner.tasks);
        self.persist_tasks(&inner, true)
    }

    /// Push a task's due date to `date`, keeping the first original due date
    /// as the postponement marker.
    pub fn postpone_task(&self, id: &str, date: NaiveDate) -> Result<()> {
        let mut inner = self.write_lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        task.postpone_to(date);
        self.persist_tasks(&inner, true)
    }

    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.read_lock().tasks.clone()
    }

    // ------------------------------------------------------------------
    // Group operations
    // ------------------------------------------------------------------

    pub fn add_group(&self, name: &str, icon: &str, color: &str) -> Result<Group> {
        let mut inner = self.write_lock();
        let mut group = Group::new(name, icon, color);
        group.sort_order = i32::try_from(inner.groups.len()).unwrap_or(i32::MAX);
        inner.groups.push(group.clone());
        self.persist_groups(&inner, true)?;
        Ok(group)
    }

    /// Replace an existing group with `group`, stamping the update.
    pub fn update_group(&self, group: Group) -> Result<()> {
        let mut inner = self.write_lock();
        let slot = inner
            .groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or_else(|| Error::NotFound(format!("group {}", group.id)))?;
        *slot = group;
        slot.touch();
        self.persist_groups(&inner, true)
    }

    /// Delete a group, detaching any tasks that referenced it.
    pub fn delete_group(&self, id: &str) -> Result<()> {
        let mut inner = self.write_lock();
        if !inner.groups.iter().any(|g| g.id == id) {
            return Err(Error::NotFound(format!("group {id}")));
        }
        for task in inner
            .tasks
            .iter_mut()
            .filter(|t| t.group_id.as_deref() == Some(id))
        {
            task.group_id = None;
            task.touch();
        }
        inner.groups.retain(|g| g.id != id);
        self.persist_tasks(&inner, true)?;
        self.persist_groups(&inner, true)
    }

    #[must_use]
    pub fn groups(&self) -> Vec<Group> {
        self.read_lock().groups.clone()
    }

    // ------------------------------------------------------------------
    // Project operations
    // ------------------------------------------------------------------

    /// Create a project together with its linked group.
    pub fn add_project(
        &self,
        name: &str,
        icon: &str,
        color: &str,
        description: Option<String>,
    ) -> Result<Project> {
        let mut inner = self.write_lock();
        let group = Group::new(name, icon, color);
        let mut project = Project::new(name, icon, color);
        project.description = description;
        project.linked_group_id = Some(group.id.clone());

        inner.groups.push(group);
        inner.projects.insert(0, project.clone());
        self.persist_groups(&inner, true)?;
        self.persist_projects(&inner, true)?;
        Ok(project)
    }

    pub fn archive_project(&self, id: &str) -> Result<()> {
        let mut inner = self.write_lock();
        let project = inner
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("project {id}")))?;
        project.archived = true;
        project.touch();
        self.persist_projects(&inner, true)
    }

    #[must_use]
    pub fn projects(&self) -> Vec<Project> {
        self.read_lock().projects.clone()
    }

    // ------------------------------------------------------------------
    // Review operations
    // ------------------------------------------------------------------

    /// Create or update the review note covering `date` for `period`.
    pub fn upsert_review(
        &self,
        period: ReviewPeriod,
        date: NaiveDate,
        title: &str,
        content: &str,
        reflection: Option<String>,
        next_plan: Option<String>,
    ) -> Result<ReviewNote> {
        let mut inner = self.write_lock();
        let updated = if let Some(existing) = inner
            .reviews
            .iter_mut()
            .find(|r| r.period == period && r.covers(date))
        {
            existing.title = title.to_string();
            existing.content = content.to_string();
            existing.reflection = reflection;
            existing.next_plan = next_plan;
            existing.touch();
            existing.clone()
        } else {
            let mut review = ReviewNote::new(period, date, title);
            review.content = content.to_string();
            review.reflection = reflection;
            review.next_plan = next_plan;
            inner.reviews.insert(0, review.clone());
            review
        };
        self.persist_reviews(&inner, true)?;
        Ok(updated)
    }

    #[must_use]
    pub fn reviews(&self) -> Vec<ReviewNote> {
        self.read_lock().reviews.clone()
    }

    // ------------------------------------------------------------------
    // Journal operations
    // ------------------------------------------------------------------

    pub fn add_journal_entry(&self, content: &str, mood: Option<String>) -> Result<JournalEntry> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput(
                "journal content must not be empty".to_string(),
            ));
        }
        let mut entry = JournalEntry::new(content);
        entry.mood = mood;

        let mut inner = self.write_lock();
        inner.journal.insert(0, entry.clone());
        self.persist_journal(&inner, true)?;
        Ok(entry)
    }

    #[must_use]
    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.read_lock().journal.clone()
    }

    // ------------------------------------------------------------------
    // Consistency passes (collaborator responsibility, not the merge engine)
    // ------------------------------------------------------------------

    /// Ensure every project references an existing group, creating one when
    /// the reference is missing or dangling. Saves quietly when it repairs.
    pub fn repair_project_groups(&self) -> Result<bool> {
        let mut inner = self.write_lock();
        let mut repaired = false;

        let known: Vec<String> = inner.groups.iter().map(|g| g.id.clone()).collect();
        let mut new_groups = Vec::new();
        for project in &mut inner.projects {
            let dangling = project
                .linked_group_id
                .as_ref()
                .map_or(true, |id| !known.contains(id));
            if dangling {
                let group = Group::new(&project.name, &project.icon, &project.color);
                project.linked_group_id = Some(group.id.clone());
                project.touch();
                new_groups.push(group);
                repaired = true;
            }
        }
        inner.groups.extend(new_groups);

        if repaired {
            self.persist_groups(&inner, false)?;
            self.persist_projects(&inner, false)?;
        }
        Ok(repaired)
    }

    /// Recompute every parent task's cached sub-task counters. Saves quietly
    /// when any counter changed.
    pub fn refresh_subtask_counts(&self) -> Result<bool> {
        let mut inner = self.write_lock();
        let changed = recount_subtasks(&mut inner.tasks);
        if changed {
            self.persist_tasks(&inner, false)?;
        }
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn load_collection<T: DeserializeOwned>(&self, file_name: &str) -> Vec<T> {
        let path = self.data_dir.join(file_name);
        if !path.exists() {
            return Vec::new();
        }
        match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(
                        "Failed to parse {}, starting with an empty collection: {error}",
                        path.display()
                    );
                    Vec::new()
                }
            },
            Err(error) => {
                tracing::warn!(
                    "Failed to read {}, starting with an empty collection: {error}",
                    path.display()
                );
                Vec::new()
            }
        }
    }

    fn persist<T: Serialize>(&self, file_name: &str, items: &[T], notify_remote: bool) -> Result<()> {
        let path = self.data_dir.join(file_name);
        let tmp = self.data_dir.join(format!("{file_name}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(items)?)?;
        fs::rename(&tmp, &path)?;

        if notify_remote {
            // Nobody listening is fine; the scheduler subscribes when it runs.
            let _ = self.events.send(StoreEvent::Changed);
        }
        Ok(())
    }

    fn persist_tasks(&self, inner: &Collections, notify: bool) -> Result<()> {
        self.persist("tasks.json", &inner.tasks, notify)
    }

    fn persist_groups(&self, inner: &Collections, notify: bool) -> Result<()> {
        self.persist("groups.json", &inner.groups, notify)
    }

    fn persist_projects(&self, inner: &Collections, notify: bool) -> Result<()> {
        self.persist("projects.json", &inner.projects, notify)
    }

    fn persist_reviews(&self, inner: &Collections, notify: bool) -> Result<()> {
        self.persist("reviews.json", &inner.reviews, notify)
    }

    fn persist_journal(&self, inner: &Collections, notify: bool) -> Result<()> {
        self.persist("journal.json", &inner.journal, notify)
    }

    fn persist_all(&self, inner: &Collections) -> Result<()> {
        self.persist_tasks(inner, false)?;
        self.persist_groups(inner, false)?;
        self.persist_projects(inner, false)?;
        self.persist_reviews(inner, false)?;
        self.persist_journal(inner, false)
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, Collections> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, Collections> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Recompute cached counters; returns whether anything changed.
fn recount_subtasks(tasks: &mut [Task]) -> bool {
    let mut changed = false;
    let counts: Vec<(String, u32, u32)> = tasks
        .iter()
        .filter(|t| !t.is_subtask())
        .map(|parent| {
            let children = tasks
                .iter()
                .filter(|t| t.parent_id.as_deref() == Some(parent.id.as_str()));
            let total = children.clone().count() as u32;
            let completed = children.filter(|t| t.completed).count() as u32;
            (parent.id.clone(), total, completed)
        })
        .collect();

    for (id, total, completed) in counts {
        if let Some(parent) = tasks.iter_mut().find(|t| t.id == id) {
            if parent.subtask_total != total || parent.subtask_completed != completed {
                parent.subtask_total = total;
                parent.subtask_completed = completed;
                changed = true;
            }
        }
    }
    changed
}
