//! HTML-to-PDF converter contract.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("pdf conversion failed: {reason}")]
pub struct PdfError {
    pub reason: String,
}

/// Converter invoked when a report requests `pdf` output; the renderer
/// always produces HTML first.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, html: &[u8]) -> Result<Vec<u8>, PdfError>;
}
