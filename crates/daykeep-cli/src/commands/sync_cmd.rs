use std::path::Path;

use crate::commands::auth_cmd::print_summary;
use crate::commands::common::build_engine;
use crate::error::CliError;

pub async fn run_sync(data_dir: &Path) -> Result<(), CliError> {
    let (_store, scheduler) = build_engine(data_dir).await?;
    match scheduler.sync_now().await? {
        Some(summary) => print_summary(&summary),
        None => println!("A sync is already in progress."),
    }
    Ok(())
}

pub async fn run_push(data_dir: &Path) -> Result<(), CliError> {
    let (_store, scheduler) = build_engine(data_dir).await?;
    scheduler.push_now().await?;
    println!("Uploaded local data.");
    Ok(())
}

pub async fn run_pull(data_dir: &Path) -> Result<(), CliError> {
    let (_store, scheduler) = build_engine(data_dir).await?;
    if scheduler.pull_now().await? {
        println!("Replaced local data with the remote record (backup taken first).");
    } else {
        println!("No remote record to pull.");
    }
    Ok(())
}
