mod memory;

pub use memory::MemoryStore;

use std::fmt;
use std::time::Duration;
use taskmill_core::{Task, TaskId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Summary returned by [`ResultStore::cleanup`], logged by the sweeper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Terminated entries removed in this sweep
    pub removed: usize,
    /// Entries still held after the sweep
    pub remaining: usize,
}

impl fmt::Display for CleanupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed {}, remaining {}", self.removed, self.remaining)
    }
}

/// Keyed storage for task records with expiry-based cleanup.
///
/// Implementations are shared between the request server, the worker pool
/// and the expiry sweeper, and are responsible for their own internal
/// synchronization. Stored values are never mutated in place: the worker
/// pool overwrites a record through [`ResultStore::update_task`] and the
/// sweeper deletes whole entries.
pub trait ResultStore: Send + Sync {
    /// Create a record; must succeed even for not-yet-run tasks
    fn add_task(&self, task: Task) -> Result<()>;

    /// Fetch a record by id
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Overwrite a record by id
    fn update_task(&self, task: Task) -> Result<()>;

    /// Remove terminated tasks whose terminal age exceeds `max_age`,
    /// measured from `terminated_at`
    fn cleanup(&self, max_age: Duration) -> Result<CleanupStats>;
}
