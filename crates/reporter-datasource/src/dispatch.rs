//! Multi-source fan-out dispatcher.
//!
//! Walks a request's `data_queries`, resolves each source, consults its
//! circuit breaker and routes to the matching adapter. Sources fan out
//! concurrently; within a source, tables are queried in the request's
//! declared order and merged append-only into the render context.

use std::sync::Arc;

use indexmap::IndexMap;
use reporter_breaker::{BreakerError, BreakerManager};
use reporter_crypto::{decrypt_row, rewrite_filters};
use reporter_model::{FilterCondition, GenerateRequest, RenderContext, Row};
use tracing::{debug, warn};

use crate::DataSourceError;
use crate::document::DocumentAdapter;
use crate::registry::{Backend, DataSource, Registry};
use crate::relational::{RelationalAdapter, TableRef};

/// Rows fetched for one source, keyed the way the render context will be.
type SourceSections = Vec<(String, Vec<Row>)>;

pub struct Dispatcher {
    registry: Arc<Registry>,
    breakers: Arc<BreakerManager>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, breakers: Arc<BreakerManager>) -> Self {
        Self { registry, breakers }
    }

    /// Fan out the request across all its sources and build the render
    /// context. Unknown sources stay soft; any other failure is hard for
    /// the report, but every branch still runs to completion first.
    pub async fn dispatch(
        &self,
        request: &GenerateRequest,
    ) -> Result<RenderContext, DataSourceError> {
        let tasks = request
            .data_queries
            .iter()
            .map(|(source_name, tables)| self.fetch_source(source_name, tables, request));
        let results = futures::future::join_all(tasks).await;

        let mut context = RenderContext::new();
        let mut first_error = None;
        for (source_name, result) in request.data_queries.keys().zip(results) {
            match result {
                Ok(Some(sections)) => {
                    for (table_key, rows) in sections {
                        context.append_rows(source_name, &table_key, rows);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(context),
        }
    }

    async fn fetch_source(
        &self,
        source_name: &str,
        tables: &IndexMap<String, Vec<String>>,
        request: &GenerateRequest,
    ) -> Result<Option<SourceSections>, DataSourceError> {
        let Some(source) = self.registry.lookup(source_name) else {
            warn!(source = source_name, "unknown data source, leaving section empty");
            return Ok(None);
        };
        if !source.initialized {
            return Err(DataSourceError::Adapter {
                source: source_name.to_string(),
                error: crate::repository::RepositoryError::Connection {
                    reason: "source not initialized".to_string(),
                },
            });
        }

        let result = self
            .breakers
            .execute(source_name, || self.fetch_tables(source, tables, request))
            .await;
        match result {
            Ok(sections) => Ok(Some(sections)),
            Err(BreakerError::Open { source }) => Err(DataSourceError::BreakerOpen { source }),
            Err(BreakerError::Inner(err)) => Err(err),
        }
    }

    async fn fetch_tables(
        &self,
        source: &DataSource,
        tables: &IndexMap<String, Vec<String>>,
        request: &GenerateRequest,
    ) -> Result<SourceSections, DataSourceError> {
        match (source.database_type.as_str(), &source.backend) {
            ("postgresql", Backend::Relational(repository)) => {
                self.fetch_relational(source, repository.as_ref(), tables, request)
                    .await
            }
            ("mongodb", Backend::Document(repository)) => {
                self.fetch_document(source, repository.as_ref(), tables, request)
                    .await
            }
            (other, _) => Err(DataSourceError::UnsupportedDatabaseType {
                source: source.name.clone(),
                database_type: other.to_string(),
            }),
        }
    }

    async fn fetch_relational(
        &self,
        source: &DataSource,
        repository: &dyn crate::repository::RelationalRepository,
        tables: &IndexMap<String, Vec<String>>,
        request: &GenerateRequest,
    ) -> Result<SourceSections, DataSourceError> {
        let adapter = RelationalAdapter::new(&source.name, repository);

        // Resolve every reference first so mixed spellings of one logical
        // table can be flagged instead of silently merged.
        let mut refs: Vec<(String, TableRef)> = Vec::with_capacity(tables.len());
        for table_key in tables.keys() {
            let table_ref = TableRef::parse(table_key, &source.default_schema);
            if let Some((earlier, _)) = refs
                .iter()
                .find(|(key, existing)| existing.canonical() == table_ref.canonical() && key != table_key)
            {
                warn!(
                    source = %source.name,
                    first = %earlier,
                    second = %table_key,
                    "mixed table reference forms resolve to the same table"
                );
            }
            refs.push((table_key.clone(), table_ref));
        }

        let schemas = if source.schemas.is_empty() {
            let mut derived: Vec<String> = Vec::new();
            for (_, table_ref) in &refs {
                if !derived.contains(&table_ref.schema) {
                    derived.push(table_ref.schema.clone());
                }
            }
            derived
        } else {
            source.schemas.clone()
        };
        let sampled = adapter.get_database_schema(&schemas).await?;

        let mut sections = Vec::with_capacity(refs.len());
        for (table_key, table_ref) in &refs {
            let fields = &tables[table_key];
            let table_schema = sampled.iter().find(|t| {
                t.schema.eq_ignore_ascii_case(&table_ref.schema)
                    && t.name.eq_ignore_ascii_case(&table_ref.table)
            });

            let filters = self.effective_filters(source, request, table_key)?;
            debug!(
                source = %source.name,
                table = %table_ref.canonical(),
                fields = fields.len(),
                "querying relational table"
            );
            let mut rows = adapter
                .query_with_advanced_filters(table_ref, fields, &filters, table_schema)
                .await?;
            self.decrypt_rows(source, &mut rows)?;
            sections.push((table_ref.context_key(), rows));
        }
        Ok(sections)
    }

    async fn fetch_document(
        &self,
        source: &DataSource,
        repository: &dyn crate::repository::DocumentRepository,
        tables: &IndexMap<String, Vec<String>>,
        request: &GenerateRequest,
    ) -> Result<SourceSections, DataSourceError> {
        let adapter = DocumentAdapter::new(&source.name, repository);

        let mut sections = Vec::with_capacity(tables.len());
        for (collection, fields) in tables {
            let schema = crate::document::discover::get_collection_schema(
                &source.name,
                repository,
                collection,
            )
            .await?;

            let filters = self.effective_filters(source, request, collection)?;
            debug!(
                source = %source.name,
                collection = %collection,
                fields = fields.len(),
                "querying collection"
            );
            let mut rows = adapter
                .query_with_advanced_filters(collection, fields, &filters, Some(&schema))
                .await?;
            self.decrypt_rows(source, &mut rows)?;
            sections.push((collection.clone(), rows));
        }
        Ok(sections)
    }

    /// The request's filters for a table, rewritten for indexed search when
    /// the source has an engaged encryption profile.
    fn effective_filters(
        &self,
        source: &DataSource,
        request: &GenerateRequest,
        table_key: &str,
    ) -> Result<IndexMap<String, FilterCondition>, DataSourceError> {
        let filters = request
            .filters_for(&source.name, table_key)
            .cloned()
            .unwrap_or_default();
        match &source.encryption_profile {
            Some(profile) => Ok(rewrite_filters(profile, &filters)),
            None => Ok(filters),
        }
    }

    fn decrypt_rows(&self, source: &DataSource, rows: &mut [Row]) -> Result<(), DataSourceError> {
        if let Some(profile) = &source.encryption_profile {
            for row in rows.iter_mut() {
                decrypt_row(profile, row)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        DocumentRepository, RelationalRepository, RepositoryError, SqlStatement,
    };
    use async_trait::async_trait;
    use reporter_breaker::BreakerPolicy;
    use reporter_model::Value;
    use serde_json::{Value as JsonValue, json};
    use std::time::Duration;
    use uuid::Uuid;

    struct StaticRelational {
        rows: Vec<Row>,
    }

    #[async_trait]
    impl RelationalRepository for StaticRelational {
        async fn select(&self, statement: &SqlStatement) -> Result<Vec<Row>, RepositoryError> {
            if statement.text.contains("information_schema") {
                return Ok(Vec::new());
            }
            Ok(self.rows.clone())
        }
    }

    struct FailingRelational;

    #[async_trait]
    impl RelationalRepository for FailingRelational {
        async fn select(&self, _: &SqlStatement) -> Result<Vec<Row>, RepositoryError> {
            Err(RepositoryError::Connection {
                reason: "connection refused".to_string(),
            })
        }
    }

    struct StaticDocument {
        documents: Vec<JsonValue>,
    }

    #[async_trait]
    impl DocumentRepository for StaticDocument {
        async fn count_documents(&self, _: &str) -> Result<u64, RepositoryError> {
            Ok(self.documents.len() as u64)
        }

        async fn aggregate(
            &self,
            _: &str,
            _: &[JsonValue],
        ) -> Result<Vec<JsonValue>, RepositoryError> {
            Ok(vec![json!({"_id": null, "keys": ["name"]})])
        }

        async fn find(
            &self,
            _: &str,
            _: &JsonValue,
            _: &[String],
            _: Option<u64>,
        ) -> Result<Vec<JsonValue>, RepositoryError> {
            Ok(self.documents.clone())
        }
    }

    fn request(sources: Vec<(&str, Vec<&str>)>) -> GenerateRequest {
        let mut data_queries = IndexMap::new();
        for (source, tables) in sources {
            let mut section = IndexMap::new();
            for table in tables {
                section.insert(table.to_string(), Vec::new());
            }
            data_queries.insert(source.to_string(), section);
        }
        GenerateRequest {
            report_id: Uuid::nil(),
            template_id: Uuid::nil(),
            output_format: "txt".to_string(),
            data_queries,
            filters: IndexMap::new(),
            ttl: None,
        }
    }

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(name));
        row
    }

    #[tokio::test]
    async fn test_unknown_source_is_soft() {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(registry, Arc::new(BreakerManager::default()));

        let context = dispatcher
            .dispatch(&request(vec![("ghost", vec!["things"])]))
            .await
            .unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_relational_rows_land_under_canonical_key() {
        let mut registry = Registry::new();
        registry.insert(DataSource::relational(
            "onboarding",
            Arc::new(StaticRelational {
                rows: vec![row("World")],
            }),
        ));
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(BreakerManager::default()));

        let context = dispatcher
            .dispatch(&request(vec![("onboarding", vec!["onboarding.organization"])]))
            .await
            .unwrap();

        let rows = context.rows("onboarding", "onboarding__organization").unwrap();
        assert_eq!(rows[0]["name"], Value::from("World"));
    }

    #[tokio::test]
    async fn test_uninitialized_source_is_hard() {
        let mut registry = Registry::new();
        let mut source = DataSource::relational(
            "cold",
            Arc::new(StaticRelational { rows: Vec::new() }),
        );
        source.initialized = false;
        registry.insert(source);
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(BreakerManager::default()));

        let err = dispatcher
            .dispatch(&request(vec![("cold", vec!["t"])]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_unsupported_database_type_is_hard() {
        let mut registry = Registry::new();
        let mut source = DataSource::relational(
            "legacy",
            Arc::new(StaticRelational { rows: Vec::new() }),
        );
        source.database_type = "oracle".to_string();
        registry.insert(source);
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(BreakerManager::default()));

        let err = dispatcher
            .dispatch(&request(vec![("legacy", vec!["t"])]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::UnsupportedDatabaseType { database_type, .. } if database_type == "oracle"
        ));
    }

    #[tokio::test]
    async fn test_open_breaker_fails_source_but_others_run() {
        let mut registry = Registry::new();
        registry.insert(DataSource::relational(
            "broken",
            Arc::new(FailingRelational),
        ));
        registry.insert(DataSource::document(
            "ledger",
            Arc::new(StaticDocument {
                documents: vec![json!({"name": "ok"})],
            }),
        ));

        let breakers = Arc::new(BreakerManager::new(BreakerPolicy {
            failure_threshold: 1,
            cooldown: Duration::from_secs(300),
        }));
        let dispatcher = Dispatcher::new(Arc::new(registry), breakers);

        // First dispatch trips the breaker on the failing source.
        let err = dispatcher
            .dispatch(&request(vec![("broken", vec!["t"]), ("ledger", vec!["books"])]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Adapter { .. }));

        // Second dispatch: the broken branch is refused outright while the
        // healthy branch still executes; the overall result is still hard.
        let err = dispatcher
            .dispatch(&request(vec![("broken", vec!["t"]), ("ledger", vec!["books"])]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::BreakerOpen { source } if source == "broken"));
    }

    #[tokio::test]
    async fn test_document_rows_decode() {
        let mut registry = Registry::new();
        registry.insert(DataSource::document(
            "ledger",
            Arc::new(StaticDocument {
                documents: vec![json!({"name": "acc-1", "balance": {"$numberDecimal": "10.5"}})],
            }),
        ));
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(BreakerManager::default()));

        let context = dispatcher
            .dispatch(&request(vec![("ledger", vec!["balances"])]))
            .await
            .unwrap();
        let rows = context.rows("ledger", "balances").unwrap();
        assert_eq!(rows[0]["balance"], Value::Decimal("10.5".parse().unwrap()));
    }
}
