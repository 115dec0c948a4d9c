use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error values carried inside replies as data.
///
/// These are never raised across the wire: the server constructs them and
/// embeds them in the failure reply, and the client reads them back out.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum RemoteError {
    /// The referenced task name or id is unknown to the registry/store.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The request carried no recognized action.
    #[error("message malformed")]
    MessageMalformed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RemoteError::TaskNotFound("double".to_string());
        assert_eq!(err.to_string(), "task not found: double");
        assert_eq!(RemoteError::MessageMalformed.to_string(), "message malformed");
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = RemoteError::TaskNotFound("abc".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: RemoteError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
