//! Timestamped backups of the persisted collection files.
//!
//! A backup is taken synchronously before any operation that overwrites
//! local data with remote data; restore copies the files back and reloads
//! the in-memory collections.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::store::{DocumentStore, COLLECTION_FILES};
use crate::util::backup_dir_name;
use crate::Result;

/// Default number of backups kept after pruning.
pub const DEFAULT_KEEP: usize = 10;

pub struct BackupManager {
    data_dir: PathBuf,
    backup_root: PathBuf,
    keep: usize,
}

impl BackupManager {
    /// Backups live in `backups/` under the store's data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_retention(data_dir, DEFAULT_KEEP)
    }

    pub fn with_retention(data_dir: impl Into<PathBuf>, keep: usize) -> Self {
        let data_dir = data_dir.into();
        let backup_root = data_dir.join("backups");
        Self {
            data_dir,
            backup_root,
            keep,
        }
    }

    /// Copy every existing collection file into a new timestamped directory.
    ///
    /// Completes before returning; callers may overwrite local data once it
    /// has. Old backups beyond the retention count are pruned afterwards.
    pub fn create_backup(&self) -> Result<PathBuf> {
        let dir = self.backup_root.join(backup_dir_name(Local::now()));
        fs::create_dir_all(&dir)?;

        for file_name in COLLECTION_FILES {
            let source = self.data_dir.join(file_name);
            if source.exists() {
                fs::copy(&source, dir.join(file_name))?;
            }
        }

        if let Err(error) = self.prune_old_backups(self.keep) {
            tracing::warn!("Failed to prune old backups: {error}");
        }

        tracing::info!("Created backup at {}", dir.display());
        Ok(dir)
    }

    /// Copy a backup's files over the live ones and reload the store.
    ///
    /// Returns `false` when the backup directory does not exist or any copy
    /// fails; the failure itself is logged, not propagated.
    pub fn restore(&self, store: &DocumentStore, backup_dir: &Path) -> bool {
        if !backup_dir.is_dir() {
            tracing::warn!("Backup directory {} does not exist", backup_dir.display());
            return false;
        }

        for file_name in COLLECTION_FILES {
            let source = backup_dir.join(file_name);
            if !source.exists() {
                continue;
            }
            if let Err(error) = fs::copy(&source, self.data_dir.join(file_name)) {
                tracing::error!("Failed to restore {file_name}: {error}");
                return false;
            }
        }

        if let Err(error) = store.reload() {
            tracing::error!("Failed to reload collections after restore: {error}");
            return false;
        }
        true
    }

    /// All backup directories, newest first.
    #[must_use]
    pub fn list_backups(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.backup_root) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        // Timestamp-derived names sort lexicographically in time order.
        dirs.sort();
        dirs.reverse();
        dirs
    }

    /// Delete all but the `keep` most recent backup directories.
    pub fn prune_old_backups(&self, keep: usize) -> Result<()> {
        for stale in self.list_backups().into_iter().skip(keep) {
            fs::remove_dir_all(&stale)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStore, BackupManager) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let backups = BackupManager::new(dir.path());
        (dir, store, backups)
    }

    #[test]
    fn backup_restore_round_trip_is_byte_identical() {
        let (dir, store, backups) = setup();
        store
            .add_task("keep me", Priority::High, None, None)
            .unwrap();
        let before = fs::read(dir.path().join("tasks.json")).unwrap();

        let handle = backups.create_backup().unwrap();

        // Clobber local state, then restore.
        store.delete_task(&store.tasks()[0].id).unwrap();
        assert!(store.tasks().is_empty());
        assert!(backups.restore(&store, &handle));

        let after = fs::read(dir.path().join("tasks.json")).unwrap();
        assert_eq!(before, after);
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn restore_of_missing_backup_returns_false() {
        let (dir, store, backups) = setup();
        assert!(!backups.restore(&store, &dir.path().join("backups/nope")));
    }

    #[test]
    fn prune_keeps_most_recent() {
        let (dir, _store, backups) = setup();
        // Fabricate timestamp-named directories; create_backup would collide
        // within one second.
        for name in ["20240101_000000", "20240102_000000", "20240103_000000"] {
            fs::create_dir_all(dir.path().join("backups").join(name)).unwrap();
        }

        backups.prune_old_backups(2).unwrap();

        let left = backups.list_backups();
        assert_eq!(left.len(), 2);
        assert!(left[0].ends_with("20240103_000000"));
        assert!(left[1].ends_with("20240102_000000"));
    }

    #[test]
    fn backup_skips_missing_collection_files() {
        let (dir, _store, backups) = setup();
        fs::remove_file(dir.path().join("reviews.json")).ok();
        let handle = backups.create_backup().unwrap();
        assert!(!handle.join("reviews.json").exists());
    }
}
