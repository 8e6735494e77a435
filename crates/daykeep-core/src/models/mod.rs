//! Data models shared by the store, merge engine, and remote client.

mod group;
mod journal;
mod project;
mod review;
mod snapshot;
mod task;

pub use group::Group;
pub use journal::JournalEntry;
pub use project::Project;
pub use review::{week_start, ReviewNote, ReviewPeriod};
pub use snapshot::Snapshot;
pub use task::{Priority, Task};
