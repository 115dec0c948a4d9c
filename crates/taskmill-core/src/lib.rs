mod error;
mod task;

pub use error::RemoteError;
pub use task::{Task, TaskArgs, TaskId, TaskKwargs};
