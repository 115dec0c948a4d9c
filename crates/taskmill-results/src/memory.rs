use crate::{CleanupStats, Result, ResultStore};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use taskmill_core::{Task, TaskId};
use tracing::debug;

/// Default non-persistent backend: a locked map of task records.
///
/// Safe under concurrent access from the request server, the worker pool
/// and the expiry sweeper. Contents are lost on process exit.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl ResultStore for MemoryStore {
    fn add_task(&self, task: Task) -> Result<()> {
        debug!("storing task {}", task.id);
        self.tasks.write().insert(task.id, task);
        Ok(())
    }

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(self.tasks.read().get(id).cloned())
    }

    fn update_task(&self, task: Task) -> Result<()> {
        self.tasks.write().insert(task.id, task);
        Ok(())
    }

    fn cleanup(&self, max_age: Duration) -> Result<CleanupStats> {
        // Out-of-range ages never match anything anyway
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(365_000));
        let cutoff = Utc::now() - max_age;

        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, task| match task.terminated_at {
            Some(terminated_at) => terminated_at > cutoff,
            None => true,
        });
        let remaining = tasks.len();

        Ok(CleanupStats {
            removed: before - remaining,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_task(name: &str) -> Task {
        Task::new(name, vec![], Default::default())
    }

    #[test]
    fn test_add_and_get() {
        let store = MemoryStore::new();
        let task = pending_task("double");
        let id = task.id;

        store.add_task(task).unwrap();
        let fetched = store.get_task(&id).unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "double");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_task(&uuid::Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_update_overwrites() {
        let store = MemoryStore::new();
        let mut task = pending_task("double");
        let id = task.id;
        store.add_task(task.clone()).unwrap();

        task.complete(json!(42));
        store.update_task(task).unwrap();

        let fetched = store.get_task(&id).unwrap().unwrap();
        assert!(fetched.terminated);
        assert_eq!(fetched.result, Some(json!(42)));
    }

    #[test]
    fn test_cleanup_removes_only_old_terminated() {
        let store = MemoryStore::new();

        let pending = pending_task("slow");
        let pending_id = pending.id;
        store.add_task(pending).unwrap();

        let mut fresh = pending_task("fresh");
        let fresh_id = fresh.id;
        fresh.complete(json!(1));
        store.add_task(fresh).unwrap();

        let mut old = pending_task("old");
        let old_id = old.id;
        old.complete(json!(2));
        old.terminated_at = Some(Utc::now() - chrono::Duration::hours(2));
        store.add_task(old).unwrap();

        let stats = store.cleanup(Duration::from_secs(3600)).unwrap();
        assert_eq!(stats, CleanupStats { removed: 1, remaining: 2 });

        assert!(store.get_task(&old_id).unwrap().is_none());
        assert!(store.get_task(&fresh_id).unwrap().is_some());
        assert!(store.get_task(&pending_id).unwrap().is_some());
    }

    #[test]
    fn test_cleanup_stats_display() {
        let stats = CleanupStats { removed: 3, remaining: 7 };
        assert_eq!(stats.to_string(), "removed 3, remaining 7");
    }
}
