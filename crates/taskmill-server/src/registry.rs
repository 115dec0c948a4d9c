use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskmill_core::{TaskArgs, TaskKwargs};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no callable registered under '{0}'")]
    UnknownCallable(String),
}

/// A unit of work the server knows how to run.
///
/// Callables execute on the blocking thread pool, so they may do blocking
/// work freely. A returned `Err` is recorded as the task's exception
/// string; panics are caught by the executor and recorded the same way.
pub trait Callable: Send + Sync + 'static {
    fn call(&self, args: &TaskArgs, kwargs: &TaskKwargs) -> Result<Value, String>;
}

impl<F> Callable for F
where
    F: Fn(&TaskArgs, &TaskKwargs) -> Result<Value, String> + Send + Sync + 'static,
{
    fn call(&self, args: &TaskArgs, kwargs: &TaskKwargs) -> Result<Value, String> {
        self(args, kwargs)
    }
}

/// Table of registered callables, keyed by task name.
///
/// Read by the request server for the existence check and by the worker
/// pool for dispatch. Registration is expected to happen before serving
/// starts; the internal lock keeps concurrent reads safe either way.
#[derive(Default)]
pub struct CallableRegistry {
    callables: RwLock<HashMap<String, Arc<dyn Callable>>>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable, overwriting any existing entry for `name`
    pub fn register<C: Callable>(&self, name: impl Into<String>, callable: C) {
        self.callables
            .write()
            .insert(name.into(), Arc::new(callable));
    }

    /// Remove a registration; fails if `name` is unknown
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.callables
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::UnknownCallable(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Callable>> {
        self.callables.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callables.read().contains_key(name)
    }

    /// All registered task names
    pub fn names(&self) -> Vec<String> {
        self.callables.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.callables.read().is_empty()
    }
}
