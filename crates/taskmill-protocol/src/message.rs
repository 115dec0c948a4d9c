use serde::{Deserialize, Serialize};
use taskmill_core::{RemoteError, Task, TaskArgs, TaskId, TaskKwargs};

/// Message types for the TCP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    RunTask = 1,
    GetResult = 2,
    Wait = 3,
    Reply = 4,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::RunTask),
            2 => Some(MessageType::GetResult),
            3 => Some(MessageType::Wait),
            4 => Some(MessageType::Reply),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Protocol messages, strictly one request then one reply per exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Register and enqueue a new task
    RunTask(RunTaskRequest),

    /// Read the current state of a task
    GetResult(GetResultRequest),

    /// Block until a task is terminal
    Wait(WaitRequest),

    /// Server reply to any request
    Reply(Reply),

    /// A frame with no recognized action; produced by the decoder, never sent
    Malformed,
}

impl Message {
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Message::RunTask(_) => Some(MessageType::RunTask),
            Message::GetResult(_) => Some(MessageType::GetResult),
            Message::Wait(_) => Some(MessageType::Wait),
            Message::Reply(_) => Some(MessageType::Reply),
            Message::Malformed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTaskRequest {
    pub name: String,
    /// Positional arguments, empty when omitted by the client
    #[serde(default)]
    pub args: TaskArgs,
    /// Keyword arguments, empty when omitted by the client
    #[serde(default)]
    pub kwargs: TaskKwargs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResultRequest {
    pub id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitRequest {
    pub id: TaskId,
}

/// Reply payload for every action.
///
/// Protocol-level failures carry a [`RemoteError`] value; task-execution
/// faults are not protocol failures and arrive as a successful reply whose
/// task has `success == Some(false)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub success: bool,
    pub task: Option<Task>,
    /// Echoed back on id-based not-found failures
    pub id: Option<TaskId>,
    pub exception: Option<RemoteError>,
}

impl Reply {
    /// Successful reply carrying a task snapshot
    pub fn task(task: Task) -> Self {
        Reply {
            success: true,
            task: Some(task),
            id: None,
            exception: None,
        }
    }

    /// Failure reply for a `run_task` naming an unregistered callable
    pub fn unknown_name(name: &str) -> Self {
        Reply {
            success: false,
            task: None,
            id: None,
            exception: Some(RemoteError::TaskNotFound(name.to_string())),
        }
    }

    /// Failure reply for a `get_result`/`wait` on an unknown id
    pub fn unknown_id(id: TaskId) -> Self {
        Reply {
            success: false,
            task: None,
            id: Some(id),
            exception: Some(RemoteError::TaskNotFound(id.to_string())),
        }
    }

    /// Failure reply for a request with no recognized action
    pub fn malformed() -> Self {
        Reply {
            success: false,
            task: None,
            id: None,
            exception: Some(RemoteError::MessageMalformed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_conversion() {
        assert_eq!(MessageType::from_u8(1), Some(MessageType::RunTask));
        assert_eq!(MessageType::from_u8(4), Some(MessageType::Reply));
        assert_eq!(MessageType::from_u8(99), None);

        assert_eq!(MessageType::RunTask.as_u8(), 1);
        assert_eq!(MessageType::Wait.as_u8(), 3);
    }

    #[test]
    fn test_run_task_defaults() {
        let req: RunTaskRequest = serde_json::from_str(r#"{"name":"double"}"#).unwrap();
        assert_eq!(req.name, "double");
        assert!(req.args.is_empty());
        assert!(req.kwargs.is_empty());
    }

    #[test]
    fn test_reply_constructors() {
        let task = Task::new("double", vec![json!(21)], Default::default());
        let reply = Reply::task(task.clone());
        assert!(reply.success);
        assert_eq!(reply.task.unwrap().id, task.id);

        let reply = Reply::unknown_name("missing");
        assert!(!reply.success);
        assert_eq!(
            reply.exception,
            Some(RemoteError::TaskNotFound("missing".to_string()))
        );
        assert!(reply.id.is_none());

        let id = uuid::Uuid::new_v4();
        let reply = Reply::unknown_id(id);
        assert_eq!(reply.id, Some(id));
        assert_eq!(
            reply.exception,
            Some(RemoteError::TaskNotFound(id.to_string()))
        );

        let reply = Reply::malformed();
        assert_eq!(reply.exception, Some(RemoteError::MessageMalformed));
    }
}
