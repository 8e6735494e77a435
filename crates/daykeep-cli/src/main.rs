//! Daykeep CLI - offline-first day planner with background sync
//!
//! Quick task capture from the terminal, plus the sync, backup, and auth
//! commands a UI would normally drive.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use daykeep_core::models::Priority;

use crate::commands::auth_cmd::{run_login, run_logout, run_status};
use crate::commands::backup_cmd::{run_backup_list, run_backup_restore};
use crate::commands::common::resolve_data_dir;
use crate::commands::sync_cmd::{run_pull, run_push, run_sync};
use crate::commands::tasks::{run_add, run_done, run_journal, run_list, run_postpone, run_rm};
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "daykeep")]
#[command(about = "Offline-first day planner with background sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Optional path to the data directory
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Quick capture: daykeep "buy milk"
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Task priority
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Group name; created when it does not exist yet
        #[arg(long, value_name = "NAME")]
        group: Option<String>,
    },
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as completed
    Done {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Delete a task and its sub-tasks
    #[command(alias = "delete")]
    Rm {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Move a task's due date, keeping the original as a marker
    Postpone {
        /// Task ID or unique ID prefix
        id: String,
        /// New due date (YYYY-MM-DD)
        date: String,
    },
    /// Write a journal entry
    Journal {
        /// Entry content
        content: Vec<String>,
        /// Mood label
        #[arg(long)]
        mood: Option<String>,
    },
    /// Sign in with email and password
    Login { email: String, password: String },
    /// Sign out and forget the stored session
    Logout,
    /// Show session and local data status
    Status,
    /// Merge with the remote record and upload the result
    Sync,
    /// Upload local data without merging
    Push,
    /// Overwrite local data with the remote record (backs up first)
    Pull,
    /// Manage pre-sync backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Run the sync scheduler until interrupted
    Watch,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups, newest first
    List,
    /// Restore a backup by directory name
    Restore { name: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("daykeep=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);

    match cli.command {
        Some(Commands::Add {
            title,
            priority,
            due,
            group,
        }) => run_add(
            &title,
            priority.into(),
            due.as_deref(),
            group.as_deref(),
            &data_dir,
        )?,
        Some(Commands::List { all, json }) => run_list(all, json, &data_dir)?,
        Some(Commands::Done { id }) => run_done(&id, &data_dir)?,
        Some(Commands::Rm { id }) => run_rm(&id, &data_dir)?,
        Some(Commands::Postpone { id, date }) => run_postpone(&id, &date, &data_dir)?,
        Some(Commands::Journal { content, mood }) => run_journal(&content, mood, &data_dir)?,
        Some(Commands::Login { email, password }) => run_login(&email, &password, &data_dir).await?,
        Some(Commands::Logout) => run_logout(&data_dir).await?,
        Some(Commands::Status) => run_status(&data_dir).await?,
        Some(Commands::Sync) => run_sync(&data_dir).await?,
        Some(Commands::Push) => run_push(&data_dir).await?,
        Some(Commands::Pull) => run_pull(&data_dir).await?,
        Some(Commands::Backups { command }) => match command {
            BackupCommands::List => run_backup_list(&data_dir)?,
            BackupCommands::Restore { name } => run_backup_restore(&name, &data_dir)?,
        },
        Some(Commands::Watch) => run_watch(&data_dir).await?,
        None => {
            // Quick capture mode: daykeep "buy milk"
            if cli.task.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.task, Priority::Medium, None, None, &data_dir)?;
            }
        }
    }

    Ok(())
}
