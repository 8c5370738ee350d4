//! Repository contracts the adapters execute against.
//!
//! Database drivers are external collaborators. The relational contract
//! receives finished SQL text with positional parameters; the document
//! contract exchanges documents and pipelines as relaxed extended JSON.
//! Everything above these traits is first-party and testable with in-memory
//! fakes.

use async_trait::async_trait;
use reporter_model::{Row, Value};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("connection lost: {reason}")]
    Connection { reason: String },

    /// Pool borrow failures are retryable; callers may re-enqueue the message.
    #[error("connection pool exhausted: {reason}")]
    PoolExhausted { reason: String },

    #[error("query failed: {reason}")]
    Query { reason: String },

    #[error("result decode failed: {reason}")]
    Decode { reason: String },
}

/// A ready-to-execute SELECT with positional (`$1`-style) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<Value>,
}

/// Relational backend contract (schema-qualified tables).
#[async_trait]
pub trait RelationalRepository: Send + Sync {
    async fn select(&self, statement: &SqlStatement) -> Result<Vec<Row>, RepositoryError>;
}

/// Document backend contract (collections).
///
/// Documents cross this boundary as relaxed MongoDB extended JSON; the
/// adapter owns normalization into the tagged value union.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn count_documents(&self, collection: &str) -> Result<u64, RepositoryError>;

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[JsonValue],
    ) -> Result<Vec<JsonValue>, RepositoryError>;

    async fn find(
        &self,
        collection: &str,
        filter: &JsonValue,
        projection: &[String],
        limit: Option<u64>,
    ) -> Result<Vec<JsonValue>, RepositoryError>;
}
