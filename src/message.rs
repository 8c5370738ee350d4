//! Queue message decoding.

use reporter_model::GenerateRequest;
use uuid::Uuid;

use crate::error::PipelineError;

/// Decode the raw payload into a request.
pub fn decode_request(raw: &[u8]) -> Result<GenerateRequest, PipelineError> {
    serde_json::from_slice(raw).map_err(|err| PipelineError::MalformedInput {
        reason: err.to_string(),
    })
}

/// Best-effort report id extraction from an undecodable payload, so the
/// failure can still be recorded against the right status record.
pub fn extract_report_id(raw: &[u8]) -> Option<Uuid> {
    let value: serde_json::Value = serde_json::from_slice(raw).ok()?;
    let id = value
        .get("report_id")
        .or_else(|| value.get("reportId"))?
        .as_str()?;
    id.parse().ok()
}
