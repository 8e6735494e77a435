use std::path::Path;

use chrono::{Local, NaiveDate};
use daykeep_core::models::{Priority, Task};

use crate::commands::common::{open_store, resolve_task_id, short_id, TaskListItem};
use crate::error::CliError;

pub fn run_add(
    title_parts: &[String],
    priority: Priority,
    due: Option<&str>,
    group: Option<&str>,
    data_dir: &Path,
) -> Result<(), CliError> {
    let title = join_words(title_parts).ok_or(CliError::EmptyTitle)?;
    let due_date = due.map(parse_date).transpose()?;

    let store = open_store(data_dir)?;
    let group_id = group
        .map(|name| find_or_create_group(&store, name))
        .transpose()?;
    let task = store.add_task(&title, priority, due_date, group_id)?;
    println!("Added task {} ({})", task.title, short_id(&task.id));
    Ok(())
}

pub fn run_list(include_completed: bool, as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let tasks: Vec<Task> = store
        .tasks()
        .into_iter()
        .filter(|t| include_completed || !t.completed)
        .collect();

    if as_json {
        let items: Vec<TaskListItem> = tasks.iter().map(task_to_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    let now = Local::now();
    for task in &tasks {
        println!("{}", format_task_line(task, now));
    }
    Ok(())
}

pub fn run_done(id: &str, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let task_id = resolve_task_id(&store, id)?;
    store.set_task_completed(&task_id, true)?;
    println!("Completed task {}", short_id(&task_id));
    Ok(())
}

pub fn run_rm(id: &str, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let task_id = resolve_task_id(&store, id)?;
    store.delete_task(&task_id)?;
    println!("Deleted task {}", short_id(&task_id));
    Ok(())
}

pub fn run_postpone(id: &str, date: &str, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir)?;
    let task_id = resolve_task_id(&store, id)?;
    store.postpone_task(&task_id, parse_date(date)?)?;
    println!("Postponed task {} to {date}", short_id(&task_id));
    Ok(())
}

pub fn run_journal(
    content_parts: &[String],
    mood: Option<String>,
    data_dir: &Path,
) -> Result<(), CliError> {
    let content = join_words(content_parts).ok_or(CliError::EmptyContent)?;
    let store = open_store(data_dir)?;
    let entry = store.add_journal_entry(&content, mood)?;
    println!("Journaled: {}", entry.preview());
    Ok(())
}

fn join_words(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(value.to_string()))
}

/// Resolve a group by name (case-insensitive), creating it when missing.
fn find_or_create_group(
    store: &daykeep_core::store::DocumentStore,
    name: &str,
) -> Result<String, CliError> {
    if let Some(group) = store
        .groups()
        .into_iter()
        .find(|g| g.name.eq_ignore_ascii_case(name))
    {
        return Ok(group.id);
    }
    let group = store.add_group(name, "📁", "#808080")?;
    println!("Created group {name}");
    Ok(group.id)
}

fn format_task_line(task: &Task, now: chrono::DateTime<Local>) -> String {
    let marker = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{marker} {}  {}", short_id(&task.id), task.title);
    if task.is_subtask() {
        line = format!("    {line}");
    }
    if task.priority == Priority::High {
        line.push_str("  !high");
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {due}"));
        if task.is_overdue(now) {
            line.push_str(" (overdue)");
        }
    }
    if task.subtask_total > 0 {
        line.push_str(&format!(
            "  [{}/{}]",
            task.subtask_completed, task.subtask_total
        ));
    }
    line
}

fn task_to_item(task: &Task) -> TaskListItem {
    let priority = match task.priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    };
    TaskListItem {
        id: task.id.clone(),
        title: task.title.clone(),
        completed: task.completed,
        priority: priority.to_string(),
        due_date: task.due_date.map(|d| d.to_string()),
        subtask_total: task.subtask_total,
        subtask_completed: task.subtask_completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn add_then_done_round_trip() {
        let dir = TempDir::new().unwrap();
        run_add(
            &["buy".to_string(), "milk".to_string()],
            Priority::Medium,
            None,
            None,
            dir.path(),
        )
        .unwrap();

        let store = open_store(dir.path()).unwrap();
        let task = &store.tasks()[0];
        assert_eq!(task.title, "buy milk");

        run_done(&task.id, dir.path()).unwrap();
        let store = open_store(dir.path()).unwrap();
        assert!(store.tasks()[0].completed);
    }

    #[test]
    fn add_rejects_empty_title() {
        let dir = TempDir::new().unwrap();
        let result = run_add(&[" ".to_string()], Priority::Low, None, None, dir.path());
        assert!(matches!(result, Err(CliError::EmptyTitle)));
    }

    #[test]
    fn add_with_group_creates_it_once() {
        let dir = TempDir::new().unwrap();
        run_add(
            &["a".to_string()],
            Priority::Low,
            None,
            Some("errands"),
            dir.path(),
        )
        .unwrap();
        run_add(
            &["b".to_string()],
            Priority::Low,
            None,
            Some("Errands"),
            dir.path(),
        )
        .unwrap();

        let store = open_store(dir.path()).unwrap();
        assert_eq!(store.groups().len(), 1);
        let group_id = store.groups()[0].id.clone();
        assert!(store
            .tasks()
            .iter()
            .all(|t| t.group_id.as_deref() == Some(group_id.as_str())));
    }

    #[test]
    fn postpone_rejects_malformed_date() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path()).unwrap();
        let task = store.add_task("t", Priority::Low, None, None).unwrap();

        let result = run_postpone(&task.id, "03/10/2024", dir.path());
        assert!(matches!(result, Err(CliError::InvalidDate(_))));
    }
}
