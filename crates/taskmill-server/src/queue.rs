use std::sync::atomic::{AtomicUsize, Ordering};
use taskmill_core::TaskId;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Notify};

/// Unbounded FIFO of pending task ids feeding the worker pool.
///
/// Every pushed id must eventually be popped and marked done with
/// [`DispatchQueue::task_done`]; [`DispatchQueue::join`] blocks until that
/// has happened for all pushed items, which is the drain contract used at
/// shutdown. Ids come out in push order, but with more than one worker
/// thread completion order is not guaranteed to match.
pub struct DispatchQueue {
    tx: UnboundedSender<TaskId>,
    rx: Mutex<UnboundedReceiver<TaskId>>,
    pending: AtomicUsize,
    drained: Notify,
}

impl DispatchQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        DispatchQueue {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Enqueue a task id; never blocks
    pub fn push(&self, id: TaskId) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // Receiver lives as long as the queue, so this cannot fail
        let _ = self.tx.send(id);
    }

    /// Dequeue the next id, suspending while the queue is empty
    pub async fn pop(&self) -> Option<TaskId> {
        self.rx.lock().await.recv().await
    }

    /// Mark one popped item as fully processed
    pub fn task_done(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Wait until every pushed item has been popped and marked done
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register for the notification before reading the counter, so
            // a task_done landing in between is not lost
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Items pushed but not yet marked done
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}
