use crate::{async_client::AsyncClient, ClientError, Result};
use taskmill_core::{Task, TaskArgs, TaskId, TaskKwargs};

/// Blocking client for the task queue (wraps the async client)
pub struct Client {
    runtime: tokio::runtime::Runtime,
    server_addr: String,
}

impl Client {
    /// Connect to the server
    pub fn connect(server_addr: impl Into<String>) -> Result<Self> {
        let server_addr = server_addr.into();
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        // Probe the address up front so a bad endpoint fails here
        runtime.block_on(async { AsyncClient::connect(&server_addr).await })?;

        Ok(Client {
            runtime,
            server_addr,
        })
    }

    /// Submit a task and return its pre-execution snapshot
    pub fn run_task(
        &self,
        name: impl Into<String>,
        args: TaskArgs,
        kwargs: TaskKwargs,
    ) -> Result<Task> {
        self.runtime.block_on(async {
            let client = AsyncClient::connect(&self.server_addr).await?;
            client.run_task(name, args, kwargs).await
        })
    }

    /// Fetch the current state of a task; `None` if the id is unknown
    pub fn get_result(&self, id: TaskId) -> Result<Option<Task>> {
        self.runtime.block_on(async {
            let client = AsyncClient::connect(&self.server_addr).await?;
            client.get_result(id).await
        })
    }

    /// Block until the task is terminal and return it
    pub fn wait(&self, id: TaskId) -> Result<Task> {
        self.runtime.block_on(async {
            let client = AsyncClient::connect(&self.server_addr).await?;
            client.wait(id).await
        })
    }
}
