use crate::registry::CallableRegistry;
use std::sync::Arc;
use taskmill_core::TaskId;
use taskmill_results::ResultStore;
use tokio::task::JoinError;
use tracing::{error, info, warn};

/// Run one dequeued task to its terminal state.
///
/// Fetches the record, invokes the registered callable on the blocking
/// thread pool and writes the outcome back to the result store. Faults and
/// panics are captured into the task record and never propagate: a failing
/// task must not take a worker thread down with it. A name unregistered
/// between enqueue and dequeue is recorded as an execution fault.
pub(crate) async fn run_one(
    registry: &Arc<CallableRegistry>,
    store: &Arc<dyn ResultStore>,
    id: TaskId,
) {
    let mut task = match store.get_task(&id) {
        Ok(Some(task)) => task,
        Ok(None) => {
            warn!("task {} vanished from the result store before execution", id);
            return;
        }
        Err(e) => {
            error!("failed to fetch task {}: {}", id, e);
            return;
        }
    };

    info!(
        "running {} (args: {:?}) (kwargs: {:?})",
        task.name, task.args, task.kwargs
    );

    match registry.get(&task.name) {
        Some(callable) => {
            let args = task.args.clone();
            let kwargs = task.kwargs.clone();
            let outcome =
                tokio::task::spawn_blocking(move || callable.call(&args, &kwargs)).await;

            match outcome {
                Ok(Ok(value)) => task.complete(value),
                Ok(Err(exception)) => task.fail(exception),
                Err(join_err) if join_err.is_panic() => task.fail(panic_message(join_err)),
                Err(_) => task.fail("task was cancelled"),
            }
        }
        None => task.fail(format!("unknown task '{}'", task.name)),
    }

    info!("finished task {} (success: {:?})", task.id, task.success);
    if let Some(exception) = &task.exception {
        warn!("task {} failed: {}", task.id, exception);
    }

    if let Err(e) = store.update_task(task) {
        error!("failed to store result for task {}: {}", id, e);
    }
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", s)
    } else {
        "task panicked during execution".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskmill_core::{Task, TaskArgs, TaskKwargs};
    use taskmill_results::MemoryStore;

    fn setup(task: Task) -> (Arc<CallableRegistry>, Arc<dyn ResultStore>, TaskId) {
        let registry = Arc::new(CallableRegistry::new());
        let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());
        let id = task.id;
        store.add_task(task).unwrap();
        (registry, store, id)
    }

    #[tokio::test]
    async fn test_success_records_result() {
        let task = Task::new("double", vec![json!(21)], TaskKwargs::new());
        let (registry, store, id) = setup(task);
        registry.register("double", |args: &TaskArgs, _: &TaskKwargs| {
            args.first()
                .and_then(serde_json::Value::as_i64)
                .map(|x| json!(x * 2))
                .ok_or_else(|| "expected an integer argument".to_string())
        });

        run_one(&registry, &store, id).await;

        let task = store.get_task(&id).unwrap().unwrap();
        assert!(task.terminated);
        assert_eq!(task.success, Some(true));
        assert_eq!(task.result, Some(json!(42)));
        assert!(task.exception.is_none());
    }

    #[tokio::test]
    async fn test_fault_is_captured() {
        let task = Task::new("boom", vec![], TaskKwargs::new());
        let (registry, store, id) = setup(task);
        registry.register("boom", |_: &TaskArgs, _: &TaskKwargs| {
            Err::<serde_json::Value, _>("it broke".to_string())
        });

        run_one(&registry, &store, id).await;

        let task = store.get_task(&id).unwrap().unwrap();
        assert!(task.terminated);
        assert_eq!(task.success, Some(false));
        assert_eq!(task.exception.as_deref(), Some("it broke"));
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let task = Task::new("kaboom", vec![], TaskKwargs::new());
        let (registry, store, id) = setup(task);
        registry.register("kaboom", |_: &TaskArgs, _: &TaskKwargs| -> Result<serde_json::Value, String> {
            panic!("unexpected state")
        });

        run_one(&registry, &store, id).await;

        let task = store.get_task(&id).unwrap().unwrap();
        assert_eq!(task.success, Some(false));
        let exception = task.exception.unwrap();
        assert!(exception.contains("panicked"));
        assert!(exception.contains("unexpected state"));
    }

    #[tokio::test]
    async fn test_unregistered_name_is_a_fault() {
        let task = Task::new("ghost", vec![], TaskKwargs::new());
        let (registry, store, id) = setup(task);

        run_one(&registry, &store, id).await;

        let task = store.get_task(&id).unwrap().unwrap();
        assert!(task.terminated);
        assert_eq!(task.success, Some(false));
        assert_eq!(task.exception.as_deref(), Some("unknown task 'ghost'"));
    }

    #[tokio::test]
    async fn test_vanished_task_is_skipped() {
        let registry = Arc::new(CallableRegistry::new());
        let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());

        // Id was enqueued but the record is gone; nothing to record
        run_one(&registry, &store, uuid::Uuid::new_v4()).await;
    }
}
