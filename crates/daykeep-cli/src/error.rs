use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] daykeep_core::Error),
    #[error(transparent)]
    Sync(#[from] daykeep_core::sync::SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task title provided")]
    EmptyTitle,
    #[error("No journal content provided")]
    EmptyContent,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("{0}")]
    AmbiguousTaskId(String),
    #[error("Backup not found: {0}")]
    BackupNotFound(String),
    #[error("Backup restore failed; see the log for details")]
    RestoreFailed,
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Remote configuration error: {0}")]
    RemoteConfig(String),
    #[error("Not signed in. Run `daykeep login <email> <password>` first.")]
    NotSignedIn,
    #[error(
        "Sync is not configured. Set DAYKEEP_SUPABASE_URL and DAYKEEP_SUPABASE_ANON_KEY in the environment or a .env file."
    )]
    SyncNotConfigured,
}
