//! Field-level encryption adapter.
//!
//! Two transforms guard encrypted backends. Before a query is dispatched,
//! filter values targeting indexed-search columns are replaced with their
//! deterministic keyed hash and the filter path is remapped to the backend's
//! search index ([`filters`]). After rows come back, the registered nested
//! paths are decrypted in place before rendering ([`paths`]).
//!
//! Keys come in pairs per encryption profile, read from the environment by
//! profile name. A source with an engaged profile and missing keys is a
//! fatal error for that report.

pub mod filters;
pub mod paths;
pub mod profile;

use thiserror::Error;

pub use filters::rewrite_filters;
pub use paths::decrypt_row;
pub use profile::EncryptionProfile;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("missing crypto key for profile {profile}: environment variable {variable} not set")]
    KeyMissing { profile: String, variable: String },

    #[error("invalid crypto key for profile {profile} in {variable}: {reason}")]
    InvalidKey {
        profile: String,
        variable: String,
        reason: String,
    },

    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("decryption failed for field {field}: {reason}")]
    DecryptionFailed { field: String, reason: String },
}
