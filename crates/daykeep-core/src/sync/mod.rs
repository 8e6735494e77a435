//! Offline-first synchronization: merge engine, remote record client, and
//! the scheduler tying them to the local store.

pub mod merge;
pub mod remote;
pub mod scheduler;

pub use merge::{merge, MergeEntity, MergeOutcome, MergeSummary};
pub use remote::{RemoteError, RemoteRecordClient, RemoteStore, RETRY_ATTEMPTS};
pub use scheduler::{SchedulerOptions, SyncError, SyncScheduler};
