//! Pipeline orchestrator: drives one report from raw message to terminal
//! status.
//!
//! The state machine is linear — decode, gate, template, fan-out, render,
//! optional PDF, persist, mark — and every failure path makes exactly one
//! best-effort `Error` status write before propagating. Once a report's
//! status is terminal the gate short-circuits and no further side effects
//! happen.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reporter_datasource::Dispatcher;
use reporter_model::GenerateRequest;
use reporter_store::{Artifact, ArtifactStore, StatusStore, StatusUpdate, TemplateStore, parse_ttl};
use reporter_template::TemplateSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::message::{decode_request, extract_report_id};
use crate::pdf::PdfConverter;

/// Successful pipeline result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Artifact written, status marked `Finished`.
    Completed,
    /// The gate found a terminal status; nothing was touched.
    Skipped,
}

pub struct Pipeline {
    status_store: Arc<dyn StatusStore>,
    template_store: Arc<dyn TemplateStore>,
    artifact_store: Arc<dyn ArtifactStore>,
    dispatcher: Dispatcher,
    pdf_converter: Option<Arc<dyn PdfConverter>>,
}

impl Pipeline {
    pub fn new(
        status_store: Arc<dyn StatusStore>,
        template_store: Arc<dyn TemplateStore>,
        artifact_store: Arc<dyn ArtifactStore>,
        dispatcher: Dispatcher,
        pdf_converter: Option<Arc<dyn PdfConverter>>,
    ) -> Self {
        Self {
            status_store,
            template_store,
            artifact_store,
            dispatcher,
            pdf_converter,
        }
    }

    /// Process one raw queue message.
    ///
    /// Decode failures still attempt an `Error` status write when a report
    /// id can be extracted from the payload.
    pub async fn handle(&self, raw: &[u8]) -> Result<Outcome, PipelineError> {
        let request = match decode_request(raw) {
            Ok(request) => request,
            Err(err) => {
                if let Some(report_id) = extract_report_id(raw) {
                    self.record_error(report_id, &err.diagnostic()).await;
                }
                return Err(err);
            }
        };

        match self.process(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.record_error(request.report_id, &err.diagnostic()).await;
                Err(err)
            }
        }
    }

    /// [`handle`](Self::handle) under a deadline. On expiry, in-flight work
    /// is dropped, partial render state is discarded with it, and a
    /// best-effort `Error` status is written.
    pub async fn handle_with_timeout(
        &self,
        raw: &[u8],
        deadline: Duration,
    ) -> Result<Outcome, PipelineError> {
        match tokio::time::timeout(deadline, self.handle(raw)).await {
            Ok(result) => result,
            Err(_) => {
                let err = PipelineError::Cancelled {
                    seconds: deadline.as_secs(),
                };
                if let Some(report_id) = extract_report_id(raw) {
                    self.record_error(report_id, &err.diagnostic()).await;
                }
                Err(err)
            }
        }
    }

    async fn process(&self, request: &GenerateRequest) -> Result<Outcome, PipelineError> {
        let report_id = request.report_id;

        // Gate: a terminal status means another attempt already concluded.
        // A lookup failure is non-terminal — the first attempt may precede
        // the status record's existence.
        match self.status_store.find(report_id).await {
            Ok(Some(report)) if report.status.is_terminal() => {
                info!(%report_id, status = %report.status, "report already terminal, skipping");
                return Ok(Outcome::Skipped);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%report_id, error = %err, "status lookup failed, proceeding");
            }
        }

        request.validate_filters()?;

        let template_source = self
            .template_store
            .fetch(request.template_id)
            .await?
            .ok_or(PipelineError::TemplateNotFound {
                template_id: request.template_id,
            })?;
        let template = TemplateSet::new().parse(&template_source)?;
        debug!(%report_id, template_id = %request.template_id, "template parsed");

        let context = self.dispatcher.dispatch(request).await?;
        let rendered = template.render(&context.into_value())?;
        debug!(%report_id, bytes = rendered.len(), "render complete");

        let bytes = if request.output_format == "pdf" {
            let converter = self.pdf_converter.as_ref().ok_or_else(|| {
                PipelineError::Pdf(crate::pdf::PdfError {
                    reason: "no converter configured".to_string(),
                })
            })?;
            converter.convert(rendered.as_bytes()).await?
        } else {
            rendered.into_bytes()
        };

        let ttl = match &request.ttl {
            Some(raw) => Some(parse_ttl(raw)?),
            None => None,
        };
        self.artifact_store
            .put(Artifact::for_report(
                report_id,
                &request.output_format,
                bytes,
                ttl,
            ))
            .await?;

        self.status_store
            .update(report_id, StatusUpdate::finished(Utc::now()))
            .await?;
        info!(%report_id, "report finished");
        Ok(Outcome::Completed)
    }

    /// Best-effort terminal `Error` write. A failure here is reported but
    /// never triggers recursive error handling.
    async fn record_error(&self, report_id: Uuid, diagnostic: &str) {
        if let Err(err) = self
            .status_store
            .update(report_id, StatusUpdate::error(diagnostic))
            .await
        {
            warn!(%report_id, error = %err, "failed to record error status");
        }
    }
}
