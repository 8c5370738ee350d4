//! Store contracts for the reporter worker.
//!
//! The object store, status store and template store are external
//! collaborators; this crate specifies them as async traits plus the small
//! amount of first-party logic that belongs with them: the output-format
//! MIME table, object naming, and the TTL duration grammar.

pub mod artifact;
pub mod mime;
pub mod status;
pub mod ttl;

use thiserror::Error;

pub use artifact::{Artifact, ArtifactStore, TemplateStore};
pub use mime::{content_type_for, extension_for};
pub use status::{StatusStore, StatusUpdate};
pub use ttl::parse_ttl;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store write failed for {object_name}: {reason}")]
    PutFailed { object_name: String, reason: String },

    #[error("status lookup failed for {id}: {reason}")]
    LookupFailed { id: String, reason: String },

    #[error("status update failed for {id}: {reason}")]
    UpdateFailed { id: String, reason: String },

    #[error("template fetch failed for {id}: {reason}")]
    TemplateFetchFailed { id: String, reason: String },

    #[error("invalid ttl {value}: {reason}")]
    InvalidTtl { value: String, reason: String },
}
