use crate::{ClientError, Result};
use taskmill_core::{RemoteError, Task, TaskArgs, TaskId, TaskKwargs};
use taskmill_protocol::{
    GetResultRequest, Message, MessageCodec, Reply, RunTaskRequest, WaitRequest,
};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Async request/reply client for the task queue server.
///
/// Each call opens a fresh connection and performs exactly one
/// request/reply exchange. [`AsyncClient::wait`] blocks until the task is
/// terminal; the server polls on its side, so there is no client timeout.
pub struct AsyncClient {
    server_addr: String,
}

impl AsyncClient {
    /// Connect to the server (the connection is probed, then reopened per
    /// request)
    pub async fn connect(server_addr: impl Into<String>) -> Result<Self> {
        let server_addr = server_addr.into();

        let _ = TcpStream::connect(&server_addr)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Ok(AsyncClient { server_addr })
    }

    /// Submit a task for asynchronous execution.
    ///
    /// The returned task is the pre-execution snapshot; poll with
    /// [`AsyncClient::get_result`] or block with [`AsyncClient::wait`] for
    /// the outcome.
    pub async fn run_task(
        &self,
        name: impl Into<String>,
        args: TaskArgs,
        kwargs: TaskKwargs,
    ) -> Result<Task> {
        let reply = self
            .request(Message::RunTask(RunTaskRequest {
                name: name.into(),
                args,
                kwargs,
            }))
            .await?;

        Self::task_or_error(reply)
    }

    /// Fetch the current state of a task; `None` if the id is unknown
    pub async fn get_result(&self, id: TaskId) -> Result<Option<Task>> {
        let reply = self
            .request(Message::GetResult(GetResultRequest { id }))
            .await?;

        if reply.success {
            Ok(reply.task)
        } else {
            Ok(None)
        }
    }

    /// Block until the task is terminal and return it
    pub async fn wait(&self, id: TaskId) -> Result<Task> {
        let reply = self.request(Message::Wait(WaitRequest { id })).await?;
        Self::task_or_error(reply)
    }

    async fn request(&self, message: Message) -> Result<Reply> {
        let stream = TcpStream::connect(&self.server_addr)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let mut framed = Framed::new(stream, MessageCodec);
        framed
            .send(message)
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        match framed.next().await {
            Some(Ok(Message::Reply(reply))) => Ok(reply),
            Some(Ok(_)) => Err(ClientError::Protocol(
                "unexpected message from server".to_string(),
            )),
            Some(Err(e)) => Err(ClientError::Protocol(e.to_string())),
            None => Err(ClientError::Connection("connection closed".to_string())),
        }
    }

    fn task_or_error(reply: Reply) -> Result<Task> {
        if reply.success {
            reply
                .task
                .ok_or_else(|| ClientError::Protocol("reply carried no task".to_string()))
        } else {
            match reply.exception {
                Some(RemoteError::TaskNotFound(what)) => Err(ClientError::TaskNotFound(what)),
                Some(other) => Err(ClientError::Server(other.to_string())),
                None => Err(ClientError::Server("unspecified failure".to_string())),
            }
        }
    }
}
