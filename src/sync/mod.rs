//! Synchronization with the remote peer
//!
//! The scheduler uploads pending highlights in batches on a timer and
//! refreshes the remote store on demand. Both paths end in a recompute of
//! the merged set.

mod scheduler;
mod tasks;

pub use scheduler::{SchedulerHandle, SyncError, SyncScheduler, SyncState, TickOutcome};
pub use tasks::BackgroundTasks;
