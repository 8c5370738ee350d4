//! Status store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reporter_model::{Report, ReportStatus};
use uuid::Uuid;

use crate::StoreError;

/// A partial status write: only populated fields are persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: ReportStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Option<String>,
}

impl StatusUpdate {
    pub fn finished(completed_at: DateTime<Utc>) -> Self {
        Self {
            status: ReportStatus::Finished,
            completed_at: Some(completed_at),
            metadata: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Error,
            completed_at: None,
            metadata: Some(message.into()),
        }
    }
}

/// Metadata store contract keyed by report id.
///
/// `find` returning `Ok(None)` means no record exists yet, which the gate
/// treats as non-terminal. Implementations log (but do not fail) updates for
/// ids that are missing from the store.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Report>, StoreError>;

    async fn update(&self, id: Uuid, update: StatusUpdate) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_update_carries_timestamp_only() {
        let now = Utc::now();
        let update = StatusUpdate::finished(now);
        assert_eq!(update.status, ReportStatus::Finished);
        assert_eq!(update.completed_at, Some(now));
        assert!(update.metadata.is_none());
    }

    #[test]
    fn test_error_update_carries_diagnostic() {
        let update = StatusUpdate::error("template not found");
        assert_eq!(update.status, ReportStatus::Error);
        assert!(update.completed_at.is_none());
        assert_eq!(update.metadata.as_deref(), Some("template not found"));
    }
}
