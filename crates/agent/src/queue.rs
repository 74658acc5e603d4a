//! Sequential task queue
//!
//! Text-driven interactions execute one at a time, in arrival order. The
//! worker picks the head task only when nothing is running, so a burst of
//! queries never interleaves pipeline runs. Audio captures do not go
//! through this queue; they use the bridge's single capture slot.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::BridgeError;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// FIFO queue with at-most-one task executing
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    #[allow(dead_code)]
    worker: JoinHandle<()>,
}

impl TaskQueue {
    /// Create a queue and its draining worker. The worker idles between
    /// enqueues and exits once the queue is dropped.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();

        let worker = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                // Spawn + join isolates per-task panics; a failing task
                // never stalls the ones queued behind it.
                if let Err(e) = tokio::spawn(task).await {
                    if e.is_panic() {
                        tracing::error!(queue = %label, "Queued task panicked");
                    }
                }
            }
            tracing::debug!(queue = %label, "Task queue drained and closed");
        });

        Self { tx, worker }
    }

    /// Enqueue a task behind everything already queued
    pub fn enqueue<F>(&self, task: F) -> Result<(), BridgeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx
            .send(Box::pin(task))
            .map_err(|_| BridgeError::Closed)
    }
}
