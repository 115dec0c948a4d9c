pub mod config;
pub mod executor;
pub mod queue;
pub mod registry;
pub mod worker;

pub use config::WorkerConfig;
pub use queue::DispatchQueue;
pub use registry::{Callable, CallableRegistry, RegistryError};
pub use worker::Worker;
