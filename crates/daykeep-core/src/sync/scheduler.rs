//! Sync orchestration: debounced uploads, periodic heartbeats, full
//! merge cycles, and the shutdown flush.
//!
//! At most one transfer runs at a time. A `Phase` flag guarded by a drop
//! guard enforces that; anything arriving while a transfer is in flight is
//! deferred to the next debounce instead of running concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::auth::{AuthProvider, BearerCredential};
use crate::state::SyncState;
use crate::store::backup::BackupManager;
use crate::store::{DocumentStore, StoreEvent};
use crate::sync::merge::{merge, MergeSummary};
use crate::sync::remote::{RemoteError, RemoteStore};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Core(#[from] crate::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Quiet period after the last local change before uploading.
    pub debounce: Duration,
    /// Interval between periodic heartbeat uploads.
    pub heartbeat: Duration,
    /// How long the shutdown flush may take before being abandoned.
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(3),
            heartbeat: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Debouncing,
    Syncing,
}

/// Resets the phase to `Idle` when a transfer ends, even on early return.
struct PhaseGuard<'a> {
    phase: &'a Mutex<Phase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *lock(self.phase) = Phase::Idle;
    }
}

struct Inner<R, A> {
    store: Arc<DocumentStore>,
    remote: R,
    auth: A,
    backups: BackupManager,
    options: SchedulerOptions,
    phase: Mutex<Phase>,
    debounce: Mutex<Option<JoinHandle<()>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    /// Set after an auth failure; only a manual [`SyncScheduler::sync_now`]
    /// (the re-login path) clears it.
    suspended: AtomicBool,
    status: broadcast::Sender<SyncState>,
}

pub struct SyncScheduler<R, A> {
    inner: Arc<Inner<R, A>>,
}

impl<R, A> Clone for SyncScheduler<R, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteStore, A: AuthProvider> SyncScheduler<R, A> {
    pub fn new(
        store: Arc<DocumentStore>,
        remote: R,
        auth: A,
        backups: BackupManager,
        options: SchedulerOptions,
    ) -> Self {
        let (status, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                auth,
                backups,
                options,
                phase: Mutex::new(Phase::Idle),
                debounce: Mutex::new(None),
                background: Mutex::new(Vec::new()),
                suspended: AtomicBool::new(false),
                status,
            }),
        }
    }

    /// Observe sync status transitions.
    #[must_use]
    pub fn subscribe_status(&self) -> broadcast::Receiver<SyncState> {
        self.inner.status.subscribe()
    }

    /// Wire up the store-change listener and the heartbeat timer.
    pub fn start(&self) {
        let mut events = self.inner.store.subscribe();
        let listener = {
            let this = self.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        // A lagged receiver still means something changed.
                        Ok(StoreEvent::Changed)
                        | Err(broadcast::error::RecvError::Lagged(_)) => this.notify_changed(),
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        let heartbeat = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(this.inner.options.heartbeat);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately; skip it.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    this.heartbeat_tick().await;
                }
            })
        };

        lock(&self.inner.background).extend([listener, heartbeat]);
    }

    /// A local mutation happened; (re)start the debounce countdown.
    ///
    /// Every call resets the timer, so a burst of edits collapses into one
    /// upload after the quiet period.
    pub fn notify_changed(&self) {
        let inner = &self.inner;
        if !inner.auth.is_authenticated() || inner.suspended.load(Ordering::Relaxed) {
            return;
        }

        {
            let mut phase = lock(&inner.phase);
            if *phase == Phase::Idle {
                *phase = Phase::Debouncing;
            }
        }

        let mut slot = lock(&inner.debounce);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let this = self.clone();
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(this.inner.options.debounce).await;
            this.finish_debounce().await;
        }));
    }

    /// Run a full download-merge-upload cycle immediately.
    ///
    /// This is the login/startup and "sync now" path. Returns `Ok(None)` when
    /// a transfer is already in flight. A successful entry clears the
    /// auth-failure suspension.
    pub async fn sync_now(&self) -> Result<Option<MergeSummary>, SyncError> {
        if !self.inner.auth.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        let Some(_guard) = self.begin_transfer() else {
            tracing::debug!("Sync already in flight, skipping manual sync");
            return Ok(None);
        };
        self.inner.suspended.store(false, Ordering::Relaxed);

        self.set_status(SyncState::Syncing);
        match self.full_cycle().await {
            Ok(summary) => {
                tracing::info!(
                    local_only = summary.local_only,
                    remote_only = summary.remote_only,
                    merged = summary.merged,
                    "Sync complete"
                );
                self.set_status(SyncState::Synced);
                Ok(Some(summary))
            }
            Err(error) => {
                self.note_failure(&error);
                self.set_status(SyncState::Error);
                Err(error)
            }
        }
    }

    /// Upload the local snapshot without merging (the `push` path).
    pub async fn push_now(&self) -> Result<(), SyncError> {
        if !self.inner.auth.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        let Some(_guard) = self.begin_transfer() else {
            tracing::debug!("Push skipped, a transfer is in flight");
            return Ok(());
        };

        self.set_status(SyncState::Syncing);
        match self.upload_local(None).await {
            Ok(()) => {
                self.set_status(SyncState::Synced);
                Ok(())
            }
            Err(error) => {
                self.note_failure(&error);
                self.set_status(SyncState::Error);
                Err(error)
            }
        }
    }

    /// Replace local data with the remote record (the `pull` path).
    ///
    /// Takes a backup before overwriting anything. Returns whether a remote
    /// record was applied; `false` means there was nothing to pull (or a
    /// transfer was already in flight) and local data is untouched.
    pub async fn pull_now(&self) -> Result<bool, SyncError> {
        if !self.inner.auth.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        let Some(_guard) = self.begin_transfer() else {
            tracing::debug!("Pull skipped, a transfer is in flight");
            return Ok(false);
        };

        self.set_status(SyncState::Syncing);
        match self.download_overwrite().await {
            Ok(applied) => {
                self.set_status(SyncState::Synced);
                Ok(applied)
            }
            Err(error) => {
                self.note_failure(&error);
                self.set_status(SyncState::Error);
                Err(error)
            }
        }
    }

    async fn download_overwrite(&self) -> Result<bool, SyncError> {
        let inner = &self.inner;
        let (credential, user_id) = self.identity()?;

        let backup = inner.backups.create_backup()?;
        tracing::debug!("Pre-pull backup at {}", backup.display());

        match inner.remote.fetch(&credential, &user_id).await? {
            Some(snapshot) => {
                inner.store.apply_snapshot(&snapshot)?;
                Ok(true)
            }
            None => {
                tracing::info!("No remote record to pull");
                Ok(false)
            }
        }
    }

    /// Flush pending local changes before the process exits.
    ///
    /// Stops the timers, then uploads once, bounded by the shutdown timeout.
    pub async fn shutdown(&self) {
        if let Some(pending) = lock(&self.inner.debounce).take() {
            pending.abort();
        }
        for task in lock(&self.inner.background).drain(..) {
            task.abort();
        }

        if !self.inner.auth.is_authenticated() || self.inner.suspended.load(Ordering::Relaxed) {
            return;
        }
        let Some(_guard) = self.begin_transfer() else {
            // An in-flight transfer is already uploading the latest state.
            return;
        };

        self.set_status(SyncState::Syncing);
        let flush = self.upload_local(None);
        match tokio::time::timeout(self.inner.options.shutdown_timeout, flush).await {
            Ok(Ok(())) => self.set_status(SyncState::Synced),
            Ok(Err(error)) => {
                tracing::warn!("Final upload failed: {error}");
                self.set_status(SyncState::Error);
            }
            Err(_) => {
                tracing::warn!(
                    "Final upload abandoned after {:?}",
                    self.inner.options.shutdown_timeout
                );
                self.set_status(SyncState::Error);
            }
        }
    }

    async fn finish_debounce(&self) {
        let Some(_guard) = self.begin_transfer() else {
            // Deferred: re-arm so the change rides the next quiet period.
            tracing::debug!("Upload deferred, a transfer is in flight");
            self.notify_changed();
            return;
        };

        self.set_status(SyncState::Syncing);
        match self.upload_local(None).await {
            Ok(()) => self.set_status(SyncState::Synced),
            Err(error) => {
                self.note_failure(&error);
                self.set_status(SyncState::Error);
            }
        }
    }

    async fn heartbeat_tick(&self) {
        if !self.inner.auth.is_authenticated() || self.inner.suspended.load(Ordering::Relaxed) {
            return;
        }
        let Some(_guard) = self.begin_transfer() else {
            return;
        };

        self.set_status(SyncState::Syncing);
        match self.upload_local(None).await {
            Ok(()) => self.set_status(SyncState::Synced),
            Err(error) => {
                self.note_failure(&error);
                self.set_status(SyncState::Error);
            }
        }
    }

    /// Backup, fetch, merge, apply, upload. Caller holds the phase guard.
    async fn full_cycle(&self) -> Result<MergeSummary, SyncError> {
        let inner = &self.inner;
        let (credential, user_id) = self.identity()?;

        let backup = inner.backups.create_backup()?;
        tracing::debug!("Pre-sync backup at {}", backup.display());

        let remote = inner.remote.fetch(&credential, &user_id).await?;
        inner.store.reload()?;
        let local = inner.store.snapshot(&user_id);
        let outcome = merge(&local, remote.as_ref())?;
        inner.store.apply_snapshot(&outcome.snapshot)?;

        // The repair passes may have adjusted references; upload what was
        // actually persisted.
        self.upload_local(Some((&credential, &user_id))).await?;
        Ok(outcome.summary)
    }

    async fn upload_local(
        &self,
        identity: Option<(&BearerCredential, &str)>,
    ) -> Result<(), SyncError> {
        let owned;
        let (credential, user_id) = match identity {
            Some((credential, user_id)) => (credential, user_id),
            None => {
                owned = self.identity()?;
                (&owned.0, owned.1.as_str())
            }
        };
        // Pick up edits persisted by other processes since the last load.
        self.inner.store.reload()?;
        let snapshot = self.inner.store.snapshot(user_id);
        self.inner.remote.upsert(credential, user_id, &snapshot).await?;
        Ok(())
    }

    fn identity(&self) -> Result<(BearerCredential, String), SyncError> {
        let credential = self
            .inner
            .auth
            .credential()
            .ok_or(SyncError::NotAuthenticated)?;
        let user_id = self.inner.auth.user_id().ok_or(SyncError::NotAuthenticated)?;
        Ok((credential, user_id))
    }

    fn begin_transfer(&self) -> Option<PhaseGuard<'_>> {
        let mut phase = lock(&self.inner.phase);
        if *phase == Phase::Syncing {
            return None;
        }
        *phase = Phase::Syncing;
        Some(PhaseGuard {
            phase: &self.inner.phase,
        })
    }

    fn note_failure(&self, error: &SyncError) {
        if matches!(error, SyncError::Remote(RemoteError::Auth(_))) {
            tracing::warn!("Sync suspended until the next sign-in: {error}");
            self.inner.suspended.store(true, Ordering::Relaxed);
        } else {
            tracing::warn!("Sync failed, local data is untouched: {error}");
        }
    }

    fn set_status(&self, state: SyncState) {
        let _ = self.inner.status.send(state);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerCredential;
    use crate::models::{Priority, Snapshot, Task};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[derive(Clone)]
    struct StaticAuth {
        user: Option<&'static str>,
    }

    impl AuthProvider for StaticAuth {
        fn is_authenticated(&self) -> bool {
            self.user.is_some()
        }

        fn user_id(&self) -> Option<String> {
            self.user.map(str::to_string)
        }

        fn credential(&self) -> Option<BearerCredential> {
            self.user.map(|_| BearerCredential::new("token"))
        }
    }

    #[derive(Default)]
    struct MockState {
        fetch_result: StdMutex<Option<Snapshot>>,
        upsert_failures: StdMutex<VecDeque<RemoteError>>,
        upsert_delay: StdMutex<Duration>,
        fetches: AtomicUsize,
        upserts: AtomicUsize,
        last_upsert: StdMutex<Option<Snapshot>>,
    }

    #[derive(Clone, Default)]
    struct MockRemote {
        state: Arc<MockState>,
    }

    impl MockRemote {
        fn upserts(&self) -> usize {
            self.state.upserts.load(Ordering::Relaxed)
        }

        fn fetches(&self) -> usize {
            self.state.fetches.load(Ordering::Relaxed)
        }
    }

    impl RemoteStore for MockRemote {
        async fn fetch(
            &self,
            _credential: &BearerCredential,
            _user_id: &str,
        ) -> Result<Option<Snapshot>, RemoteError> {
            self.state.fetches.fetch_add(1, Ordering::Relaxed);
            Ok(self.state.fetch_result.lock().unwrap().clone())
        }

        async fn upsert(
            &self,
            _credential: &BearerCredential,
            _user_id: &str,
            snapshot: &Snapshot,
        ) -> Result<(), RemoteError> {
            let delay = *self.state.upsert_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.state.upserts.fetch_add(1, Ordering::Relaxed);
            *self.state.last_upsert.lock().unwrap() = Some(snapshot.clone());
            match self.state.upsert_failures.lock().unwrap().pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn scheduler(
        remote: &MockRemote,
        user: Option<&'static str>,
    ) -> (TempDir, Arc<DocumentStore>, SyncScheduler<MockRemote, StaticAuth>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path()).unwrap());
        let backups = BackupManager::new(dir.path());
        let scheduler = SyncScheduler::new(
            Arc::clone(&store),
            remote.clone(),
            StaticAuth { user },
            backups,
            SchedulerOptions::default(),
        );
        (dir, store, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_collapses_into_one_upload() {
        let remote = MockRemote::default();
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        for _ in 0..5 {
            scheduler.notify_changed();
        }
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_change_restarts_the_quiet_period() {
        let remote = MockRemote::default();
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(2)).await;
        // 4s since the first change, but never 3s of quiet
        assert_eq!(remote.upserts(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_sync_skips_while_a_transfer_is_in_flight() {
        let remote = MockRemote::default();
        *remote.state.upsert_delay.lock().unwrap() = Duration::from_secs(5);
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_millis(3100)).await;

        // The debounced upload is mid-flight now.
        let result = scheduler.sync_now().await.unwrap();
        assert!(result.is_none());
        assert_eq!(remote.fetches(), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn change_during_transfer_is_uploaded_afterwards() {
        let remote = MockRemote::default();
        *remote.state.upsert_delay.lock().unwrap() = Duration::from_secs(5);
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(4)).await;
        // First upload is in flight until t=8; this change must not be lost.
        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(remote.upserts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_changes_are_ignored() {
        let remote = MockRemote::default();
        let (_dir, _store, scheduler) = scheduler(&remote, None);

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(remote.upserts(), 0);

        assert!(matches!(
            scheduler.sync_now().await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_sync_merges_and_uploads() {
        let remote = MockRemote::default();
        let mut from_remote = Snapshot::empty("u1");
        from_remote.tasks.push(Task::new("remote task"));
        *remote.state.fetch_result.lock().unwrap() = Some(from_remote);

        let (_dir, store, scheduler) = scheduler(&remote, Some("u1"));
        store
            .add_task("local task", Priority::Medium, None, None)
            .unwrap();

        let mut status = scheduler.subscribe_status();
        let summary = scheduler.sync_now().await.unwrap().unwrap();

        assert_eq!(summary.local_only, 1);
        assert_eq!(summary.remote_only, 1);
        assert_eq!(summary.merged, 0);
        assert_eq!(store.tasks().len(), 2);

        let uploaded = remote.state.last_upsert.lock().unwrap().clone().unwrap();
        assert_eq!(uploaded.tasks.len(), 2);

        assert_eq!(status.try_recv().unwrap(), SyncState::Syncing);
        assert_eq!(status.try_recv().unwrap(), SyncState::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_sync_takes_a_backup_first() {
        let remote = MockRemote::default();
        let (dir, store, scheduler) = scheduler(&remote, Some("u1"));
        store.add_task("t", Priority::Low, None, None).unwrap();

        scheduler.sync_now().await.unwrap();

        let backups = BackupManager::new(dir.path());
        assert_eq!(backups.list_backups().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upload_reports_error_and_recovers() {
        let remote = MockRemote::default();
        remote.state.upsert_failures.lock().unwrap().push_back(RemoteError::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));
        let mut status = scheduler.subscribe_status();

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(status.try_recv().unwrap(), SyncState::Syncing);
        assert_eq!(status.try_recv().unwrap(), SyncState::Error);

        // The failure released the transfer slot.
        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(remote.upserts(), 2);
        assert_eq!(status.try_recv().unwrap(), SyncState::Syncing);
        assert_eq!(status.try_recv().unwrap(), SyncState::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_suspends_until_manual_sync() {
        let remote = MockRemote::default();
        remote
            .state
            .upsert_failures
            .lock()
            .unwrap()
            .push_back(RemoteError::Auth("expired".to_string()));
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(remote.upserts(), 1);

        // Suspended: further changes do not reach the remote.
        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(remote.upserts(), 1);

        // The manual sync after re-login lifts the suspension.
        scheduler.sync_now().await.unwrap().unwrap();
        scheduler.notify_changed();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(remote.upserts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_and_cancels_pending_timers() {
        let remote = MockRemote::default();
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));

        scheduler.notify_changed();
        scheduler.shutdown().await;
        assert_eq!(remote.upserts(), 1);

        // The aborted debounce never fires a second upload.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_a_slow_flush() {
        let remote = MockRemote::default();
        *remote.state.upsert_delay.lock().unwrap() = Duration::from_secs(30);
        let (_dir, _store, scheduler) = scheduler(&remote, Some("u1"));
        let mut status = scheduler.subscribe_status();

        scheduler.shutdown().await;

        assert_eq!(status.try_recv().unwrap(), SyncState::Syncing);
        assert_eq!(status.try_recv().unwrap(), SyncState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_uploads_periodically() {
        let remote = MockRemote::default();
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path()).unwrap());
        let scheduler = SyncScheduler::new(
            Arc::clone(&store),
            remote.clone(),
            StaticAuth { user: Some("u1") },
            BackupManager::new(dir.path()),
            SchedulerOptions {
                heartbeat: Duration::from_secs(60),
                ..SchedulerOptions::default()
            },
        );
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(remote.upserts(), 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(remote.upserts(), 2);
        assert_eq!(remote.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn push_uploads_without_fetching() {
        let remote = MockRemote::default();
        let (_dir, store, scheduler) = scheduler(&remote, Some("u1"));
        store.add_task("t", Priority::Low, None, None).unwrap();

        scheduler.push_now().await.unwrap();

        assert_eq!(remote.fetches(), 0);
        assert_eq!(remote.upserts(), 1);
        let uploaded = remote.state.last_upsert.lock().unwrap().clone().unwrap();
        assert_eq!(uploaded.tasks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_overwrites_local_after_a_backup() {
        let remote = MockRemote::default();
        let mut from_remote = Snapshot::empty("u1");
        from_remote.tasks.push(Task::new("remote task"));
        *remote.state.fetch_result.lock().unwrap() = Some(from_remote);

        let (dir, store, scheduler) = scheduler(&remote, Some("u1"));
        store
            .add_task("local only", Priority::Low, None, None)
            .unwrap();

        assert!(scheduler.pull_now().await.unwrap());

        // Local-only work is gone from the store but preserved in the backup.
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "remote task");
        let backups = BackupManager::new(dir.path());
        assert_eq!(backups.list_backups().len(), 1);
        assert_eq!(remote.upserts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_without_remote_record_leaves_local_intact() {
        let remote = MockRemote::default();
        let (_dir, store, scheduler) = scheduler(&remote, Some("u1"));
        store.add_task("keep", Priority::Low, None, None).unwrap();

        assert!(!scheduler.pull_now().await.unwrap());
        assert_eq!(store.tasks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn started_scheduler_reacts_to_store_mutations() {
        let remote = MockRemote::default();
        let (_dir, store, scheduler) = scheduler(&remote, Some("u1"));
        scheduler.start();
        tokio::task::yield_now().await;

        store.add_task("t", Priority::Low, None, None).unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(remote.upserts(), 1);
    }
}
