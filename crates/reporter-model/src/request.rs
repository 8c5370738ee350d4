//! The immutable generation request decoded from a queue message.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FilterCondition, FilterError};

/// `source → table → ordered list of field paths` to fetch.
pub type DataQueries = IndexMap<String, IndexMap<String, Vec<String>>>;

/// `source → table → field → condition` restricting each query.
pub type FilterMap = IndexMap<String, IndexMap<String, IndexMap<String, FilterCondition>>>;

/// A report generation request, as carried on the queue (§6.1 wire format).
///
/// The request is immutable once decoded; it is dropped when the pipeline
/// reaches a terminal state for its `report_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(alias = "reportId")]
    pub report_id: Uuid,
    #[serde(alias = "templateId")]
    pub template_id: Uuid,
    #[serde(default, alias = "outputFormat")]
    pub output_format: String,
    #[serde(default, alias = "dataQueries")]
    pub data_queries: DataQueries,
    #[serde(default)]
    pub filters: FilterMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl GenerateRequest {
    /// Filters declared for one `(source, table)` pair, if any.
    pub fn filters_for(
        &self,
        source: &str,
        table: &str,
    ) -> Option<&IndexMap<String, FilterCondition>> {
        self.filters.get(source)?.get(table)
    }

    /// Validate every condition's arity before any dispatch.
    ///
    /// Diagnostics name the field as `source.table.field` so an operator can
    /// trace the offending condition back through the nested map.
    pub fn validate_filters(&self) -> Result<(), FilterError> {
        for (source, tables) in &self.filters {
            for (table, fields) in tables {
                for (field, condition) in fields {
                    condition.validate(&format!("{source}.{table}.{field}"))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_decodes_queue_message() {
        let raw = r#"{
            "report_id": "7e5a52d2-95f5-4d32-a83a-6f85e8d4ac07",
            "template_id": "c1d2e3f4-0000-4000-8000-000000000001",
            "output_format": "pdf",
            "data_queries": {"onboarding": {"organization": ["name", "document"]}},
            "filters": {"onboarding": {"organization": {"document": {"equals": ["123"]}}}},
            "ttl": "30d"
        }"#;
        let request: GenerateRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.output_format, "pdf");
        assert_eq!(request.ttl.as_deref(), Some("30d"));
        assert_eq!(
            request.data_queries["onboarding"]["organization"],
            vec!["name".to_string(), "document".to_string()]
        );
        let condition = &request.filters_for("onboarding", "organization").unwrap()["document"];
        assert_eq!(condition.equals, vec![Value::from("123")]);
    }

    #[test]
    fn test_missing_optional_sections_default_empty() {
        let raw = r#"{
            "report_id": "7e5a52d2-95f5-4d32-a83a-6f85e8d4ac07",
            "template_id": "c1d2e3f4-0000-4000-8000-000000000001",
            "output_format": "txt"
        }"#;
        let request: GenerateRequest = serde_json::from_str(raw).unwrap();
        assert!(request.data_queries.is_empty());
        assert!(request.filters.is_empty());
        assert!(request.ttl.is_none());
        assert!(request.validate_filters().is_ok());
    }

    #[test]
    fn test_validate_filters_names_nested_field() {
        let raw = r#"{
            "report_id": "7e5a52d2-95f5-4d32-a83a-6f85e8d4ac07",
            "template_id": "c1d2e3f4-0000-4000-8000-000000000001",
            "output_format": "txt",
            "filters": {"ledger": {"accounts": {"amount": {"between": [10]}}}}
        }"#;
        let request: GenerateRequest = serde_json::from_str(raw).unwrap();
        let err = request.validate_filters().unwrap_err();
        assert!(err.to_string().contains("ledger.accounts.amount"));
        assert!(err.to_string().contains("between"));
    }
}
