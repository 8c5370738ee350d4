//! Report status record as persisted in the metadata store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status values recognized by the gate, serialized case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ReportStatus {
    Processing,
    Finished,
    Error,
}

impl ReportStatus {
    /// Terminal statuses gate a request out of the pipeline entirely.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Finished | ReportStatus::Error)
    }
}

/// The persistent metadata record of a generation request.
///
/// Created upstream; this worker only ever mutates `status`, `completedAt`
/// and `metadata`, and writes a terminal status at most once per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub status: ReportStatus,
    #[serde(
        rename = "completedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}
