use std::path::Path;

use daykeep_core::auth::{FileSessionStore, SessionPersistence};
use daykeep_core::config::Settings;
use daykeep_core::store::backup::BackupManager;

use crate::commands::common::{auth_client, build_engine, open_store};
use crate::error::CliError;

pub async fn run_login(email: &str, password: &str, data_dir: &Path) -> Result<(), CliError> {
    let settings = Settings::from_env();
    let session = auth_client(&settings, data_dir)?
        .sign_in(email, password)
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?;

    let label = session.user.email.as_deref().unwrap_or("(no email)");
    println!("Signed in as {label}");

    // First sync after sign-in; a failure here leaves the session intact.
    match build_engine(data_dir).await {
        Ok((_store, scheduler)) => match scheduler.sync_now().await {
            Ok(Some(summary)) => print_summary(&summary),
            Ok(None) => {}
            Err(error) => eprintln!("Initial sync failed: {error}"),
        },
        Err(error) => eprintln!("Initial sync skipped: {error}"),
    }
    Ok(())
}

pub async fn run_logout(data_dir: &Path) -> Result<(), CliError> {
    let sessions = FileSessionStore::new(data_dir);
    let Some(session) = sessions
        .load_session()
        .map_err(|error| CliError::Auth(error.to_string()))?
    else {
        println!("Not signed in.");
        return Ok(());
    };

    // Server-side logout is best effort; always drop the local session.
    let settings = Settings::from_env();
    match auth_client(&settings, data_dir) {
        Ok(client) => client
            .sign_out(&session)
            .await
            .map_err(|error| CliError::Auth(error.to_string()))?,
        Err(_) => sessions
            .clear_session()
            .map_err(|error| CliError::Auth(error.to_string()))?,
    }
    println!("Signed out.");
    Ok(())
}

pub async fn run_status(data_dir: &Path) -> Result<(), CliError> {
    let settings = Settings::from_env();
    println!("Data directory: {}", data_dir.display());

    if settings.is_remote_configured() {
        let session = auth_client(&settings, data_dir)?
            .restore_session()
            .await
            .map_err(|error| CliError::Auth(error.to_string()))?;
        match session {
            Some(session) => {
                let label = session.user.email.as_deref().unwrap_or(&session.user.id);
                println!("Signed in as {label}");
            }
            None => println!("Not signed in."),
        }
    } else {
        println!("Sync not configured (set DAYKEEP_SUPABASE_URL and DAYKEEP_SUPABASE_ANON_KEY).");
    }

    let store = open_store(data_dir)?;
    println!(
        "Local data: {} tasks, {} groups, {} projects, {} reviews, {} journal entries",
        store.tasks().len(),
        store.groups().len(),
        store.projects().len(),
        store.reviews().len(),
        store.journal_entries().len(),
    );

    let backups = BackupManager::new(data_dir);
    match backups.list_backups().first() {
        Some(latest) => println!(
            "Latest backup: {}",
            latest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
        None => println!("No backups yet."),
    }
    Ok(())
}

pub fn print_summary(summary: &daykeep_core::sync::MergeSummary) {
    println!(
        "Sync completed: {} local-only, {} remote-only, {} reconciled",
        summary.local_only, summary.remote_only, summary.merged
    );
}
