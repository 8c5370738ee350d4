//! Artifact store and template store contracts.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::StoreError;
use crate::mime::{content_type_for, extension_for};

/// Rendered bytes ready for the object store.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub object_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub ttl: Option<Duration>,
}

impl Artifact {
    /// Build an artifact for a report, deriving object name and content type
    /// from the requested output format.
    pub fn for_report(
        report_id: Uuid,
        output_format: &str,
        bytes: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            object_name: format!("{report_id}.{}", extension_for(output_format)),
            content_type: content_type_for(output_format).to_string(),
            bytes,
            ttl,
        }
    }
}

/// Object store contract: content-typed put with an optional TTL.
///
/// Implementations wrap the actual client; the pipeline only depends on this
/// trait.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, artifact: Artifact) -> Result<(), StoreError>;
}

/// Template storage contract, resolved by template id.
///
/// `Ok(None)` means the template does not exist; the pipeline maps that to
/// its own not-found error.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn fetch(&self, template_id: Uuid) -> Result<Option<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_naming_carries_report_id() {
        let id: Uuid = "7e5a52d2-95f5-4d32-a83a-6f85e8d4ac07".parse().unwrap();
        let artifact = Artifact::for_report(id, "pdf", vec![1, 2, 3], None);
        assert_eq!(
            artifact.object_name,
            "7e5a52d2-95f5-4d32-a83a-6f85e8d4ac07.pdf"
        );
        assert_eq!(artifact.content_type, "application/pdf");
    }

    #[test]
    fn test_unknown_format_names_txt() {
        let id = Uuid::nil();
        let artifact = Artifact::for_report(id, "", vec![], None);
        assert!(artifact.object_name.ends_with(".txt"));
        assert_eq!(artifact.content_type, "text/plain");
    }
}
