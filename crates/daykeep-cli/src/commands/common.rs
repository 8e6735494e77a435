use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use daykeep_core::auth::{AuthState, FileSessionStore, SupabaseAuthClient};
use daykeep_core::config::Settings;
use daykeep_core::store::backup::BackupManager;
use daykeep_core::store::DocumentStore;
use daykeep_core::sync::{RemoteRecordClient, SchedulerOptions, SyncScheduler};
use serde::Serialize;

use crate::error::CliError;

/// What `list --json` emits per task.
#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub priority: String,
    pub due_date: Option<String>,
    pub subtask_total: u32,
    pub subtask_completed: u32,
}

pub fn resolve_data_dir(cli_data_dir: Option<PathBuf>) -> PathBuf {
    cli_data_dir
        .or_else(|| env::var_os("DAYKEEP_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daykeep")
}

pub fn open_store(data_dir: &Path) -> Result<Arc<DocumentStore>, CliError> {
    Ok(Arc::new(DocumentStore::open(data_dir)?))
}

pub fn auth_client(
    settings: &Settings,
    data_dir: &Path,
) -> Result<SupabaseAuthClient<FileSessionStore>, CliError> {
    let (url, anon_key) = settings
        .remote_endpoint()
        .ok_or(CliError::SyncNotConfigured)?;
    SupabaseAuthClient::new(&url, anon_key, FileSessionStore::new(data_dir))
        .map_err(|error| CliError::Auth(error.to_string()))
}

/// Restore the persisted session and assemble the full sync engine.
pub async fn build_engine(
    data_dir: &Path,
) -> Result<(Arc<DocumentStore>, SyncScheduler<RemoteRecordClient, AuthState>), CliError> {
    let settings = Settings::from_env();
    let (url, anon_key) = settings
        .remote_endpoint()
        .ok_or(CliError::SyncNotConfigured)?;

    let session = auth_client(&settings, data_dir)?
        .restore_session()
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or(CliError::NotSignedIn)?;
    let auth_state = AuthState::new();
    auth_state.set_session(session);

    let store = open_store(data_dir)?;
    let remote = RemoteRecordClient::with_timeout(&url, anon_key, settings.request_timeout())
        .map_err(|error| CliError::RemoteConfig(error.to_string()))?
        .retry_attempts(settings.retry_attempts);
    let backups = BackupManager::with_retention(data_dir, settings.backup_keep);
    let options = SchedulerOptions {
        debounce: settings.debounce(),
        heartbeat: settings.heartbeat(),
        shutdown_timeout: settings.shutdown_timeout(),
    };

    let scheduler = SyncScheduler::new(Arc::clone(&store), remote, auth_state, backups, options);
    Ok((store, scheduler))
}

/// Resolve a task by exact id or unique id prefix.
pub fn resolve_task_id(store: &DocumentStore, prefix: &str) -> Result<String, CliError> {
    let tasks = store.tasks();
    let mut matching = tasks.iter().filter(|t| t.id.starts_with(prefix));
    match (matching.next(), matching.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(CliError::AmbiguousTaskId(format!(
            "Task ID prefix '{prefix}' matches more than one task"
        ))),
        (None, _) => Err(CliError::TaskNotFound(prefix.to_string())),
    }
}

#[must_use]
pub fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use daykeep_core::models::Priority;
    use tempfile::TempDir;

    #[test]
    fn resolve_task_id_accepts_unique_prefix() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let task = store.add_task("t", Priority::Low, None, None).unwrap();

        let resolved = resolve_task_id(&store, &task.id[..6]).unwrap();
        assert_eq!(resolved, task.id);
    }

    #[test]
    fn resolve_task_id_rejects_unknown_prefix() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert!(matches!(
            resolve_task_id(&store, "nope"),
            Err(CliError::TaskNotFound(_))
        ));
    }

    #[test]
    fn cli_data_dir_flag_takes_precedence() {
        let resolved = resolve_data_dir(Some(PathBuf::from("/tmp/elsewhere")));
        assert_eq!(resolved, PathBuf::from("/tmp/elsewhere"));
    }
}
