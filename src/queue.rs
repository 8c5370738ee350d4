//! Message queue contract.
//!
//! Transport acquisition and acknowledgement live outside this workspace;
//! the worker pool only depends on this trait.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("queue error: {reason}")]
pub struct QueueError {
    pub reason: String,
}

/// One message as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    /// Transport-level delivery id used for ack/nack.
    pub delivery_id: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Next message; `Ok(None)` means the queue is closed and the worker
    /// should drain out.
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError>;

    async fn ack(&self, delivery_id: &str) -> Result<(), QueueError>;

    /// Return a message to the transport for redelivery.
    async fn nack(&self, delivery_id: &str) -> Result<(), QueueError>;
}
