//! Data source registry, fan-out dispatcher and backend adapters.
//!
//! A request's `data_queries` name sources by configuration key; the
//! [`Registry`] resolves them, the [`Dispatcher`] routes each source through
//! its circuit breaker to the matching adapter, and the adapters translate
//! field lists and filter conditions into backend-native queries executed
//! through the repository contracts in [`repository`]. Driver libraries stay
//! outside this workspace.

pub mod dispatch;
pub mod document;
pub mod registry;
pub mod relational;
pub mod repository;

use reporter_crypto::CryptoError;
use reporter_model::FilterError;

pub use dispatch::Dispatcher;
pub use registry::{Backend, DataSource, Registry};
pub use repository::{DocumentRepository, RelationalRepository, RepositoryError, SqlStatement};

#[derive(Debug)]
pub enum DataSourceError {
    UnsupportedDatabaseType {
        source: String,
        database_type: String,
    },

    BreakerOpen { source: String },

    Adapter {
        source: String,
        error: RepositoryError,
    },

    InvalidIdentifier { identifier: String },

    Filter(FilterError),

    Crypto(CryptoError),
}

impl std::fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceError::UnsupportedDatabaseType {
                source,
                database_type,
            } => write!(
                f,
                "unsupported database type {database_type} for source {source}"
            ),
            DataSourceError::BreakerOpen { source } => {
                write!(f, "circuit breaker open for source {source}")
            }
            DataSourceError::Adapter { source, error } => {
                write!(f, "adapter error for source {source}: {error}")
            }
            DataSourceError::InvalidIdentifier { identifier } => {
                write!(f, "invalid identifier {identifier:?}")
            }
            DataSourceError::Filter(err) => write!(f, "{err}"),
            DataSourceError::Crypto(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DataSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataSourceError::UnsupportedDatabaseType { .. } => None,
            DataSourceError::BreakerOpen { .. } => None,
            DataSourceError::Adapter { error, .. } => Some(error),
            DataSourceError::InvalidIdentifier { .. } => None,
            DataSourceError::Filter(err) => err.source(),
            DataSourceError::Crypto(err) => err.source(),
        }
    }
}

impl From<FilterError> for DataSourceError {
    fn from(err: FilterError) -> Self {
        DataSourceError::Filter(err)
    }
}

impl From<CryptoError> for DataSourceError {
    fn from(err: CryptoError) -> Self {
        DataSourceError::Crypto(err)
    }
}
