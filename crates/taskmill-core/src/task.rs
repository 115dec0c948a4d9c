use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a task, allocated by the server at submission time
pub type TaskId = Uuid;

/// Positional arguments passed to the registered callable
pub type TaskArgs = Vec<Value>;

/// Keyword arguments passed to the registered callable
pub type TaskKwargs = Map<String, Value>;

/// One unit of submitted work and its eventual outcome.
///
/// A task is created by the request server, executed by the worker pool and
/// stored in the result store. Once `terminated` is true the record never
/// changes again except for deletion by the expiry sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Name of the registered callable to run
    pub name: String,

    /// Positional arguments (empty if the client omitted them)
    #[serde(default)]
    pub args: TaskArgs,

    /// Keyword arguments (empty if the client omitted them)
    #[serde(default)]
    pub kwargs: TaskKwargs,

    /// Value produced by the callable, unset until terminal
    pub result: Option<Value>,

    /// Unset while pending, then true on normal return, false on a fault
    pub success: Option<bool>,

    /// Description of the fault, set only when `success == Some(false)`
    pub exception: Option<String>,

    /// True once execution has finished, either way
    pub terminated: bool,

    /// Set exactly once, at the transition to terminated
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task with a fresh id
    pub fn new(name: impl Into<String>, args: TaskArgs, kwargs: TaskKwargs) -> Self {
        Task {
            id: Uuid::new_v4(),
            name: name.into(),
            args,
            kwargs,
            result: None,
            success: None,
            exception: None,
            terminated: false,
            terminated_at: None,
        }
    }

    /// Record a normal return and mark the task terminal
    pub fn complete(&mut self, result: Value) {
        self.result = Some(result);
        self.success = Some(true);
        self.terminate();
    }

    /// Record an execution fault and mark the task terminal.
    ///
    /// `result` stays unset; the fault description is kept as a string.
    pub fn fail(&mut self, exception: impl Into<String>) {
        self.success = Some(false);
        self.exception = Some(exception.into());
        self.terminate();
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.terminated_at = Some(Utc::now());
    }

    /// Whether execution has finished (success or fault)
    pub fn is_terminal(&self) -> bool {
        self.terminated
    }
}
