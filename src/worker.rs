//! Worker pool: parallel consumers with one message in flight per worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;
use crate::queue::{MessageQueue, QueueMessage};

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub workers: usize,
    /// Per-message deadline; expiry aborts in-flight adapter calls.
    pub message_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            message_timeout: Duration::from_secs(300),
        }
    }
}

pub struct WorkerPool {
    queue: Arc<dyn MessageQueue>,
    pipeline: Arc<Pipeline>,
    settings: WorkerSettings,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        pipeline: Arc<Pipeline>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            pipeline,
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token the host process cancels for graceful shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until the queue closes or shutdown is requested.
    pub async fn run(&self) {
        let mut tasks = JoinSet::new();
        for worker_id in 0..self.settings.workers.max(1) {
            let queue = Arc::clone(&self.queue);
            let pipeline = Arc::clone(&self.pipeline);
            let timeout = self.settings.message_timeout;
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                worker_loop(worker_id, queue, pipeline, timeout, shutdown).await;
            });
        }
        while tasks.join_next().await.is_some() {}
        info!("worker pool drained");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn MessageQueue>,
    pipeline: Arc<Pipeline>,
    timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(worker_id, "shutdown requested");
                return;
            }
            received = queue.receive() => received,
        };

        match message {
            Ok(Some(message)) => {
                process_message(worker_id, &*queue, &pipeline, timeout, message).await;
            }
            Ok(None) => {
                info!(worker_id, "queue closed");
                return;
            }
            Err(err) => {
                warn!(worker_id, error = %err, "receive failed, backing off");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn process_message(
    worker_id: usize,
    queue: &dyn MessageQueue,
    pipeline: &Pipeline,
    timeout: Duration,
    message: QueueMessage,
) {
    let result = pipeline
        .handle_with_timeout(&message.payload, timeout)
        .await;
    if let Err(err) = &result {
        // The pipeline already recorded terminal status; the message is
        // consumed either way so the report is not redelivered forever.
        error!(worker_id, error = %err, "report failed");
    }
    if let Err(err) = queue.ack(&message.delivery_id).await {
        warn!(worker_id, error = %err, "ack failed");
    }
}
