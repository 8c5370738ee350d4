//! Pipeline-boundary error type.
//!
//! Adapters return their native errors; the pipeline wraps them into this
//! sum type and translates to a human-readable diagnostic before the
//! terminal status write. `Skipped` is an [`crate::pipeline::Outcome`], not
//! an error, and an unknown data source is only a warning.

use reporter_crypto::CryptoError;
use reporter_datasource::DataSourceError;
use reporter_model::FilterError;
use reporter_store::StoreError;
use reporter_template::TemplateError;
use thiserror::Error;
use uuid::Uuid;

use crate::pdf::PdfError;
use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("template {template_id} not found")]
    TemplateNotFound { template_id: Uuid },

    /// Template parse, render and arithmetic failures.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Breaker-open, unsupported database types and adapter failures.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// Filter arity violations caught before dispatch.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// Missing profile keys and field decryption failures.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Artifact, template and status store failures.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("report cancelled after {seconds}s")]
    Cancelled { seconds: u64 },
}

impl PipelineError {
    /// Diagnostic written into the status record's metadata.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}
