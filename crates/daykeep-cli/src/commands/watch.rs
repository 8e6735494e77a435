use std::path::Path;

use crate::commands::auth_cmd::print_summary;
use crate::commands::common::build_engine;
use crate::error::CliError;

/// Run the sync scheduler until interrupted: startup sync, debounced
/// uploads on local changes, periodic heartbeat, flush on Ctrl-C.
pub async fn run_watch(data_dir: &Path) -> Result<(), CliError> {
    let (_store, scheduler) = build_engine(data_dir).await?;

    let mut status = scheduler.subscribe_status();
    tokio::spawn(async move {
        while let Ok(state) = status.recv().await {
            tracing::info!("Sync status: {state}");
        }
    });

    match scheduler.sync_now().await {
        Ok(Some(summary)) => print_summary(&summary),
        Ok(None) => {}
        Err(error) => tracing::warn!("Startup sync failed: {error}"),
    }

    scheduler.start();
    println!("Watching for changes. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    println!("Flushing pending changes...");
    scheduler.shutdown().await;
    Ok(())
}
