use crate::config::WorkerConfig;
use crate::executor;
use crate::queue::DispatchQueue;
use crate::registry::{Callable, CallableRegistry, RegistryError};

use taskmill_core::Task;
use taskmill_protocol::{
    GetResultRequest, Message, MessageCodec, Reply, RunTaskRequest, WaitRequest,
};
use taskmill_results::{MemoryStore, ResultStore};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::codec::Framed;

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Poll interval for the blocking `wait` action
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Step between expiry-sweeper ticks
const SWEEP_STEP: Duration = Duration::from_secs(2);

/// The task queue server process.
///
/// Owns the request socket, the callable registry, the dispatch queue and
/// the worker pool. Requests are answered strictly one at a time
/// server-wide, matching the request/reply discipline of the socket: an
/// outstanding `wait` blocks every other request until its task is
/// terminal. Callers needing concurrent waits must accept that only one is
/// served at a time.
pub struct Worker {
    config: WorkerConfig,
    registry: Arc<CallableRegistry>,
    store: Arc<dyn ResultStore>,
    queue: Arc<DispatchQueue>,
    listener: TcpListener,
    shutdown: Arc<Notify>,
}

impl Worker {
    /// Bind the request socket and start the worker pool, backed by the
    /// default in-memory result store
    pub async fn bind(config: WorkerConfig) -> anyhow::Result<Self> {
        Self::bind_with_store(config, Arc::new(MemoryStore::new())).await
    }

    /// Bind the request socket and start the worker pool against a custom
    /// result backend
    pub async fn bind_with_store(
        config: WorkerConfig,
        store: Arc<dyn ResultStore>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let registry = Arc::new(CallableRegistry::new());
        let queue = Arc::new(DispatchQueue::new());

        info!("running {} worker thread(s)...", config.threads);
        for _ in 0..config.threads {
            let registry = registry.clone();
            let store = store.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                while let Some(id) = queue.pop().await {
                    executor::run_one(&registry, &store, id).await;
                    queue.task_done();
                }
            });
        }

        Ok(Worker {
            config,
            registry,
            store,
            queue,
            listener,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Register a callable under `name`, overwriting any existing entry.
    ///
    /// Expected before [`Worker::run`]; later registrations are seen by new
    /// submissions but racing ones may still be told the name is unknown.
    pub fn register<C: Callable>(&self, name: impl Into<String>, callable: C) {
        self.registry.register(name, callable);
    }

    /// Unregister a callable; fails if `name` is unknown
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.registry.unregister(name)
    }

    /// Address the request socket is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until [`Worker::shutdown`] is called.
    ///
    /// Starts the expiry sweeper, then accepts connections and funnels
    /// every decoded request through a single dispatcher. On shutdown,
    /// stops accepting and waits for the dispatch queue to fully drain
    /// before returning; pool and sweeper tasks are detached.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let names = self.registry.names();
        if names.is_empty() {
            info!("no tasks registered");
        } else {
            info!("registered tasks: {}", names.join(", "));
        }
        info!("listening on {} ...", self.config.bind_addr);

        let sweeper = self.clone();
        tokio::spawn(async move {
            sweeper.sweep_loop().await;
        });

        // One request in flight server-wide; `wait` polls inside this task
        let (req_tx, mut req_rx) = mpsc::channel::<(Message, oneshot::Sender<Reply>)>(1);
        let dispatcher = self.clone();
        tokio::spawn(async move {
            while let Some((message, reply_tx)) = req_rx.recv().await {
                let reply = dispatcher.handle_request(message).await;
                let _ = reply_tx.send(reply);
            }
        });

        // Pinned once so a shutdown arriving between select iterations is
        // not lost
        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("new connection from {}", addr);
                            let req_tx = req_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, req_tx).await {
                                    error!("connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown.as_mut() => {
                    info!("waiting for queued tasks to finish...");
                    break;
                }
            }
        }

        self.queue.join().await;
        info!("exiting...");
        Ok(())
    }

    /// Stop serving: no new connections are accepted and `run` returns
    /// once the dispatch queue has drained
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Get the result store
    pub fn store(&self) -> Arc<dyn ResultStore> {
        self.store.clone()
    }

    /// Get the dispatch queue
    pub fn queue(&self) -> Arc<DispatchQueue> {
        self.queue.clone()
    }

    async fn handle_request(&self, message: Message) -> Reply {
        match message {
            Message::RunTask(req) => self.handle_run_task(req),
            Message::GetResult(req) => self.handle_get_result(req),
            Message::Wait(req) => self.handle_wait(req).await,
            Message::Reply(_) | Message::Malformed => Reply::malformed(),
        }
    }

    /// The only action that mutates server-wide state: registry check,
    /// store write, queue push. Replies with the pre-execution snapshot;
    /// execution happens asynchronously on the pool.
    fn handle_run_task(&self, req: RunTaskRequest) -> Reply {
        if !self.registry.contains(&req.name) {
            return Reply::unknown_name(&req.name);
        }

        let task = Task::new(req.name, req.args, req.kwargs);
        if let Err(e) = self.store.add_task(task.clone()) {
            // The wire protocol has no server-error reply shape
            error!("failed to store task {}: {}", task.id, e);
            return Reply::unknown_name(&task.name);
        }

        self.queue.push(task.id);
        debug!("enqueued task {} ({})", task.id, task.name);
        Reply::task(task)
    }

    fn handle_get_result(&self, req: GetResultRequest) -> Reply {
        match self.store.get_task(&req.id) {
            Ok(Some(task)) => Reply::task(task),
            Ok(None) => Reply::unknown_id(req.id),
            Err(e) => {
                error!("result store lookup failed for {}: {}", req.id, e);
                Reply::unknown_id(req.id)
            }
        }
    }

    /// Re-fetches the task at a fixed interval until it is terminal. Runs
    /// inside the single dispatcher, so an outstanding wait blocks all
    /// other requests.
    async fn handle_wait(&self, req: WaitRequest) -> Reply {
        let mut task = match self.store.get_task(&req.id) {
            Ok(Some(task)) => task,
            _ => return Reply::unknown_id(req.id),
        };

        loop {
            if task.terminated {
                return Reply::task(task);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            task = match self.store.get_task(&req.id) {
                Ok(Some(task)) => task,
                // Swept mid-wait
                _ => return Reply::unknown_id(req.id),
            };
        }
    }

    /// Coarse server-wide sweep: advance an accumulator in fixed steps and
    /// run the store cleanup each time it reaches the configured expiry. A
    /// result can therefore outlive its expiry by up to one full sweep
    /// period, depending on phase.
    async fn sweep_loop(&self) {
        let expiry = self.config.result_expiry();
        let mut elapsed = Duration::ZERO;
        let mut ticks = tokio::time::interval(SWEEP_STEP);
        // The first tick fires immediately; it is not a step
        ticks.tick().await;

        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    elapsed += SWEEP_STEP;
                    if elapsed >= expiry {
                        match self.store.cleanup(expiry) {
                            Ok(stats) => info!("cleanup results stats: {}", stats),
                            Err(e) => error!("result cleanup failed: {}", e),
                        }
                        elapsed = Duration::ZERO;
                    }
                }
                _ = shutdown.as_mut() => break,
            }
        }
    }
}

/// Read frames off one connection and funnel each request through the
/// dispatcher, sending the reply back on the same stream
async fn handle_connection(
    stream: TcpStream,
    req_tx: mpsc::Sender<(Message, oneshot::Sender<Reply>)>,
) -> anyhow::Result<()> {
    let mut framed = Framed::new(stream, MessageCodec);

    while let Some(result) = framed.next().await {
        match result {
            Ok(message) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if req_tx.send((message, reply_tx)).await.is_err() {
                    break;
                }
                let Ok(reply) = reply_rx.await else {
                    break;
                };
                framed.send(Message::Reply(reply)).await?;
            }
            Err(e) => {
                error!("protocol error: {}", e);
                break;
            }
        }
    }

    Ok(())
}
