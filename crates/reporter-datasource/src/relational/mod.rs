//! Relational adapter: table reference resolution, schema discovery and
//! query building over the [`RelationalRepository`] contract.

pub mod sql;

use indexmap::IndexMap;
use reporter_model::{FieldDescriptor, FieldType, FilterCondition, Row, TableSchema, Value};
use tracing::warn;

use crate::DataSourceError;
use crate::repository::{RelationalRepository, RepositoryError, SqlStatement};

/// A resolved table reference.
///
/// Callers may pass `schema__table` (canonical), `schema.table` (qualified)
/// or a bare legacy `table` that defaults to the source's configured schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
    /// Whether the caller spelled out the schema.
    pub explicit: bool,
}

impl TableRef {
    pub fn parse(key: &str, default_schema: &str) -> Self {
        if let Some((schema, table)) = key.split_once("__") {
            Self {
                schema: schema.to_string(),
                table: table.to_string(),
                explicit: true,
            }
        } else if let Some((schema, table)) = key.split_once('.') {
            Self {
                schema: schema.to_string(),
                table: table.to_string(),
                explicit: true,
            }
        } else {
            Self {
                schema: default_schema.to_string(),
                table: key.to_string(),
                explicit: false,
            }
        }
    }

    /// Canonical `schema__table` spelling.
    pub fn canonical(&self) -> String {
        format!("{}__{}", self.schema, self.table)
    }

    /// Key used in the render context: canonical for qualified references,
    /// the bare name for legacy references so legacy template paths keep
    /// resolving.
    pub fn context_key(&self) -> String {
        if self.explicit {
            self.canonical()
        } else {
            self.table.clone()
        }
    }
}

/// Adapter over one relational source.
pub struct RelationalAdapter<'a> {
    source_name: &'a str,
    repository: &'a dyn RelationalRepository,
}

impl<'a> RelationalAdapter<'a> {
    pub fn new(source_name: &'a str, repository: &'a dyn RelationalRepository) -> Self {
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

    /// Sample the live schema for the given schemas, ordered by schema,
    /// table and column position.
    pub async fn get_database_schema(
        &self,
        schemas: &[String],
    ) -> Result<Vec<TableSchema>, DataSourceError> {
        let statement = SqlStatement {
            text: "SELECT table_schema, table_name, column_name, data_type \
                   FROM information_schema.columns \
                   WHERE table_schema = ANY($1) \
                   ORDER BY table_schema, table_name, ordinal_position"
                .to_string(),
            params: vec![Value::Array(
                schemas.iter().map(|s| Value::from(s.as_str())).collect(),
            )],
        };
        let rows = self
            .repository
            .select(&statement)
            .await
            .map_err(|e| self.adapter_error(e))?;

        let mut tables: Vec<TableSchema> = Vec::new();
        for row in rows {
            let schema = string_field(&row, "table_schema");
            let table = string_field(&row, "table_name");
            let column = string_field(&row, "column_name");
            let data_type = string_field(&row, "data_type");

            let descriptor = FieldDescriptor {
                name: column,
                data_type: map_sql_type(&data_type),
            };
            match tables
                .last_mut()
                .filter(|t| t.schema == schema && t.name == table)
            {
                Some(current) => current.fields.push(descriptor),
                None => tables.push(TableSchema {
                    schema,
                    name: table,
                    fields: vec![descriptor],
                }),
            }
        }
        Ok(tables)
    }

    /// Positional-parameter SELECT with a simple equality/membership filter.
    pub async fn query(
        &self,
        table_ref: &TableRef,
        fields: &[String],
        filter_map: Option<&IndexMap<String, Vec<Value>>>,
        table_schema: Option<&TableSchema>,
    ) -> Result<Vec<Row>, DataSourceError> {
        let mut filters = IndexMap::new();
        if let Some(map) = filter_map {
            for (field, values) in map {
                let condition = if values.len() == 1 {
                    FilterCondition {
                        equals: values.clone(),
                        ..Default::default()
                    }
                } else {
                    FilterCondition {
                        in_: values.clone(),
                        ..Default::default()
                    }
                };
                filters.insert(field.clone(), condition);
            }
        }
        self.query_with_advanced_filters(table_ref, fields, &filters, table_schema)
            .await
    }

    /// SELECT compiled from the full filter algebra.
    pub async fn query_with_advanced_filters(
        &self,
        table_ref: &TableRef,
        fields: &[String],
        filters: &IndexMap<String, FilterCondition>,
        table_schema: Option<&TableSchema>,
    ) -> Result<Vec<Row>, DataSourceError> {
        let columns = self.resolve_columns(table_ref, fields, table_schema);

        let mut params = Vec::new();
        let mut predicates = Vec::new();
        for (field, condition) in filters {
            if condition.is_empty() {
                continue;
            }
            predicates.extend(sql::compile_condition(field, condition, &mut params)?);
        }

        let text = sql::build_select(&table_ref.schema, &table_ref.table, &columns, &predicates)?;
        self.repository
            .select(&SqlStatement { text, params })
            .await
            .map_err(|e| self.adapter_error(e))
    }

    /// Narrow the requested field list against the sampled schema.
    ///
    /// Unknown fields are diagnostics, not hard failures; an empty request
    /// means every known column.
    fn resolve_columns(
        &self,
        table_ref: &TableRef,
        fields: &[String],
        table_schema: Option<&TableSchema>,
    ) -> Vec<String> {
        let Some(schema) = table_schema else {
            // No sample available: pass the request through as-is.
            return fields.to_vec();
        };

        if fields.is_empty() {
            return schema.fields.iter().map(|f| f.name.clone()).collect();
        }

        let mut columns = Vec::new();
        for field in fields {
            match schema
                .fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(field))
            {
                Some(descriptor) => columns.push(descriptor.name.clone()),
                None => warn!(
                    source = self.source_name,
                    table = %table_ref.canonical(),
                    field = %field,
                    "requested field not present in sampled schema"
                ),
            }
        }
        if columns.is_empty() {
            schema.fields.iter().map(|f| f.name.clone()).collect()
        } else {
            columns
        }
    }
}

fn string_field(row: &Row, name: &str) -> String {
    row.get(name)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// Map an `information_schema` data type to the closed field-type set.
fn map_sql_type(data_type: &str) -> FieldType {
    match data_type.to_ascii_lowercase().as_str() {
        "character varying" | "varchar" | "character" | "char" | "text" | "uuid" => {
            FieldType::String
        }
        "smallint" | "integer" | "bigint" | "real" | "double precision" => FieldType::Number,
        "numeric" | "decimal" | "money" => FieldType::Decimal,
        "boolean" => FieldType::Boolean,
        "date" => FieldType::Date,
        t if t.starts_with("timestamp") => FieldType::Timestamp,
        "json" | "jsonb" => FieldType::Object,
        "array" => FieldType::Array,
        "bytea" => FieldType::BinData,
        _ => FieldType::Unknown,
    }
}
