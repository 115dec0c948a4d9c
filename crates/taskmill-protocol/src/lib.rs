mod codec;
mod message;

pub use codec::MessageCodec;
pub use message::{
    GetResultRequest, Message, MessageType, Reply, RunTaskRequest, WaitRequest,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum frame size; task arguments and results are small JSON values
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
