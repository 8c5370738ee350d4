//! Document adapter: collection queries, hybrid schema discovery and
//! extended-JSON normalization over the [`DocumentRepository`] contract.

pub mod decode;
pub mod discover;
pub mod filter;

use indexmap::IndexMap;
use reporter_model::{CollectionSchema, FilterCondition, Row, Value};
use tracing::warn;

use crate::DataSourceError;
use crate::repository::{DocumentRepository, RepositoryError};

/// Adapter over one document source.
pub struct DocumentAdapter<'a> {
    source_name: &'a str,
    repository: &'a dyn DocumentRepository,
}

impl<'a> DocumentAdapter<'a> {
    pub fn new(source_name: &'a str, repository: &'a dyn DocumentRepository) -> Self {
        Self {
            source_name,
            repository,
        }
    }

    fn adapter_error(&self, error: RepositoryError) -> DataSourceError {
        DataSourceError::Adapter {
            source: self.source_name.to_string(),
            error,
        }
    }

    /// Sample the schema of every named collection.
    pub async fn get_database_schema(
        &self,
        collections: &[String],
    ) -> Result<Vec<CollectionSchema>, DataSourceError> {
        let mut schemas = Vec::with_capacity(collections.len());
        for collection in collections {
            schemas.push(
                discover::get_collection_schema(self.source_name, self.repository, collection)
                    .await?,
            );
        }
        Ok(schemas)
    }

    /// Simple query: one value per field is equality, several are membership.
    pub async fn query(
        &self,
        collection: &str,
        fields: &[String],
        filter: &IndexMap<String, Vec<Value>>,
        schema: Option<&CollectionSchema>,
    ) -> Result<Vec<Row>, DataSourceError> {
        let filter_document = filter::compile_simple(filter);
        self.execute(collection, fields, filter_document, schema)
            .await
    }

    /// Query compiled from the full filter algebra.
    pub async fn query_with_advanced_filters(
        &self,
        collection: &str,
        fields: &[String],
        filters: &IndexMap<String, FilterCondition>,
        schema: Option<&CollectionSchema>,
    ) -> Result<Vec<Row>, DataSourceError> {
        let filter_document = filter::compile_filters(filters);
        self.execute(collection, fields, filter_document, schema)
            .await
    }

    async fn execute(
        &self,
        collection: &str,
        fields: &[String],
        filter_document: serde_json::Value,
        schema: Option<&CollectionSchema>,
    ) -> Result<Vec<Row>, DataSourceError> {
        if let Some(schema) = schema {
            for field in fields {
                let top_level = field.split('.').next().unwrap_or(field);
                if !schema.has_field(top_level) {
                    warn!(
                        source = self.source_name,
                        collection,
                        field = %field,
                        "requested field not present in sampled schema"
                    );
                }
            }
        }

        let projection = prune_projection(fields);
        let documents = self
            .repository
            .find(collection, &filter_document, &projection, None)
            .await
            .map_err(|e| self.adapter_error(e))?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in &documents {
            rows.push(decode::decode_row(document).map_err(|e| self.adapter_error(e))?);
        }
        Ok(rows)
    }
}

/// Remove descendant paths whose parent is already projected.
///
/// Projecting `a` already includes `a.b` and `a.b.c`, and mixing both forms
/// in one projection is a path collision on the backend.
pub fn prune_projection(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| {
            !fields.iter().any(|other| {
                *other != **field && field.starts_with(&format!("{other}."))
            })
        })
        .cloned()
        .collect()
}
