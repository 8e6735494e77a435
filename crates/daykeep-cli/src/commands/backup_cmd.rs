use std::path::Path;

use daykeep_core::store::backup::BackupManager;

use crate::commands::common::open_store;
use crate::error::CliError;

pub fn run_backup_list(data_dir: &Path) -> Result<(), CliError> {
    let backups = BackupManager::new(data_dir);
    let list = backups.list_backups();
    if list.is_empty() {
        println!("No backups yet.");
        return Ok(());
    }
    for path in list {
        if let Some(name) = path.file_name() {
            println!("{}", name.to_string_lossy());
        }
    }
    Ok(())
}

pub fn run_backup_restore(name: &str, data_dir: &Path) -> Result<(), CliError> {
    let backups = BackupManager::new(data_dir);
    let target = backups
        .list_backups()
        .into_iter()
        .find(|path| path.file_name().is_some_and(|n| n == name))
        .ok_or_else(|| CliError::BackupNotFound(name.to_string()))?;

    let store = open_store(data_dir)?;
    if backups.restore(&store, &target) {
        println!("Restored backup {name}.");
        Ok(())
    } else {
        Err(CliError::RestoreFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daykeep_core::models::Priority;
    use tempfile::TempDir;

    #[test]
    fn restore_unknown_backup_fails() {
        let dir = TempDir::new().unwrap();
        let result = run_backup_restore("20200101_000000", dir.path());
        assert!(matches!(result, Err(CliError::BackupNotFound(_))));
    }

    #[test]
    fn restore_brings_back_deleted_task() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path()).unwrap();
        let task = store.add_task("keep", Priority::Low, None, None).unwrap();

        let backups = BackupManager::new(dir.path());
        let created = backups.create_backup().unwrap();
        let name = created.file_name().unwrap().to_string_lossy().into_owned();

        store.delete_task(&task.id).unwrap();
        drop(store);

        run_backup_restore(&name, dir.path()).unwrap();
        let store = open_store(dir.path()).unwrap();
        assert_eq!(store.tasks().len(), 1);
    }
}
