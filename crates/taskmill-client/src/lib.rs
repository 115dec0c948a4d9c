mod async_client;
mod sync_client;

pub use async_client::AsyncClient;
pub use sync_client::Client;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
