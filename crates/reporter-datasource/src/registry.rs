//! Data source configuration and name-keyed registry.

use std::sync::Arc;

use indexmap::IndexMap;
use reporter_crypto::EncryptionProfile;

use crate::repository::{DocumentRepository, RelationalRepository};

/// The backend handle a source routes to.
#[derive(Clone)]
pub enum Backend {
    Relational(Arc<dyn RelationalRepository>),
    Document(Arc<dyn DocumentRepository>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Relational(_) => f.write_str("Backend::Relational"),
            Backend::Document(_) => f.write_str("Backend::Document"),
        }
    }
}

/// One configured external data source.
///
/// `database_type` is kept as configured so the dispatcher can reject types
/// it does not route rather than failing at config decode time.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: String,
    pub database_type: String,
    pub initialized: bool,
    pub backend: Backend,
    /// Relational only: schemas to sample; empty means derive from table refs.
    pub schemas: Vec<String>,
    /// Relational only: schema assumed for bare legacy table names.
    pub default_schema: String,
    pub encryption_profile: Option<Arc<EncryptionProfile>>,
}

impl DataSource {
    pub fn relational(name: &str, repository: Arc<dyn RelationalRepository>) -> Self {
        Self {
            name: name.to_string(),
            database_type: "postgresql".to_string(),
            initialized: true,
            backend: Backend::Relational(repository),
            schemas: Vec::new(),
            default_schema: "public".to_string(),
            encryption_profile: None,
        }
    }

    pub fn document(name: &str, repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            name: name.to_string(),
            database_type: "mongodb".to_string(),
            initialized: true,
            backend: Backend::Document(repository),
            schemas: Vec::new(),
            default_schema: String::new(),
            encryption_profile: None,
        }
    }

    pub fn with_encryption(mut self, profile: Arc<EncryptionProfile>) -> Self {
        self.encryption_profile = Some(profile);
        self
    }

    pub fn with_schemas(mut self, schemas: Vec<String>) -> Self {
        self.schemas = schemas;
        self
    }
}

/// Registry keyed by case-preserving source name, matching the first key of
/// a request's `data_queries`.
#[derive(Debug, Default)]
pub struct Registry {
    sources: IndexMap<String, DataSource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: DataSource) {
        self.sources.insert(source.name.clone(), source);
    }

    /// Configured source, or `None` for unknown names. Unknown sources do
    /// not abort a report; the caller logs and leaves the section empty.
    pub fn lookup(&self, name: &str) -> Option<&DataSource> {
        self.sources.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}
