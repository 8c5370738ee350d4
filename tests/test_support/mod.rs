//! Shared in-memory fakes implementing the external-collaborator contracts.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reporter::pdf::{PdfConverter, PdfError};
use reporter_datasource::repository::{
    DocumentRepository, RelationalRepository, RepositoryError, SqlStatement,
};
use reporter_model::{Report, ReportStatus, Row, Value};
use reporter_store::{Artifact, ArtifactStore, StatusStore, StatusUpdate, StoreError, TemplateStore};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStatusStore {
    pub reports: Mutex<HashMap<Uuid, Report>>,
    pub updates: Mutex<Vec<(Uuid, StatusUpdate)>>,
}

impl InMemoryStatusStore {
    pub fn with_report(self, report: Report) -> Self {
        self.reports.lock().unwrap().insert(report.id, report);
        self
    }

    pub fn recorded_statuses(&self, id: Uuid) -> Vec<ReportStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(updated, _)| *updated == id)
            .map(|(_, update)| update.status)
            .collect()
    }

    pub fn last_metadata(&self, id: Uuid) -> Option<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(updated, _)| *updated == id)
            .and_then(|(_, update)| update.metadata.clone())
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn find(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: StatusUpdate) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push((id, update.clone()));
        let mut reports = self.reports.lock().unwrap();
        let report = reports.entry(id).or_insert(Report {
            id,
            status: update.status,
            completed_at: None,
            metadata: None,
        });
        report.status = update.status;
        if update.completed_at.is_some() {
            report.completed_at = update.completed_at;
        }
        if update.metadata.is_some() {
            report.metadata = update.metadata;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    pub templates: HashMap<Uuid, String>,
}

impl InMemoryTemplateStore {
    pub fn with_template(mut self, id: Uuid, source: &str) -> Self {
        self.templates.insert(id, source.to_string());
        self
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn fetch(&self, template_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.templates.get(&template_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    pub artifacts: Mutex<Vec<Artifact>>,
}

impl InMemoryArtifactStore {
    pub fn single_artifact(&self) -> Artifact {
        let artifacts = self.artifacts.lock().unwrap();
        assert_eq!(artifacts.len(), 1, "expected exactly one artifact");
        artifacts[0].clone()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, artifact: Artifact) -> Result<(), StoreError> {
        self.artifacts.lock().unwrap().push(artifact);
        Ok(())
    }
}

/// Relational fake: serves canned `information_schema` rows for discovery
/// and canned data rows for everything else, recording each statement.
#[derive(Default)]
pub struct StaticRelationalRepository {
    pub schema_rows: Vec<Row>,
    pub data_rows: Vec<Row>,
    pub statements: Mutex<Vec<SqlStatement>>,
}

impl StaticRelationalRepository {
    pub fn data_statements(&self) -> Vec<SqlStatement> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.text.contains("information_schema"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RelationalRepository for StaticRelationalRepository {
    async fn select(&self, statement: &SqlStatement) -> Result<Vec<Row>, RepositoryError> {
        self.statements.lock().unwrap().push(statement.clone());
        if statement.text.contains("information_schema") {
            Ok(self.schema_rows.clone())
        } else {
            Ok(self.data_rows.clone())
        }
    }
}

/// Relational fake that always fails, for breaker scenarios.
pub struct FailingRelationalRepository;

#[async_trait]
impl RelationalRepository for FailingRelationalRepository {
    async fn select(&self, _: &SqlStatement) -> Result<Vec<Row>, RepositoryError> {
        Err(RepositoryError::Connection {
            reason: "connection refused".to_string(),
        })
    }
}

/// Document fake recording find filters.
#[derive(Default)]
pub struct StaticDocumentRepository {
    pub documents: Vec<JsonValue>,
    pub keys: Vec<String>,
    pub find_filters: Mutex<Vec<JsonValue>>,
}

#[async_trait]
impl DocumentRepository for StaticDocumentRepository {
    async fn count_documents(&self, _: &str) -> Result<u64, RepositoryError> {
        Ok(self.documents.len() as u64)
    }

    async fn aggregate(&self, _: &str, _: &[JsonValue]) -> Result<Vec<JsonValue>, RepositoryError> {
        Ok(vec![serde_json::json!({"_id": null, "keys": self.keys})])
    }

    async fn find(
        &self,
        _: &str,
        filter: &JsonValue,
        _: &[String],
        limit: Option<u64>,
    ) -> Result<Vec<JsonValue>, RepositoryError> {
        // The schema type sweep passes a limit; only record query filters.
        if limit.is_none() {
            self.find_filters.lock().unwrap().push(filter.clone());
        }
        Ok(self.documents.clone())
    }
}

/// PDF fake that stamps a recognizable header onto the rendered HTML.
pub struct StaticPdfConverter;

#[async_trait]
impl PdfConverter for StaticPdfConverter {
    async fn convert(&self, html: &[u8]) -> Result<Vec<u8>, PdfError> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(html);
        Ok(bytes)
    }
}

/// Column row in the shape `information_schema.columns` queries return.
pub fn schema_row(schema: &str, table: &str, column: &str, data_type: &str) -> Row {
    let mut row = Row::new();
    row.insert("table_schema".to_string(), Value::from(schema));
    row.insert("table_name".to_string(), Value::from(table));
    row.insert("column_name".to_string(), Value::from(column));
    row.insert("data_type".to_string(), Value::from(data_type));
    row
}

pub fn data_row(fields: &[(&str, Value)]) -> Row {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}
