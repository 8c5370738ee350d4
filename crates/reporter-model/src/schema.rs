//! Schema descriptors sampled from remote backends.
//!
//! The worker never owns the source schemas; adapters sample them and the
//! result is captured in these descriptors for field validation and type
//! inference.

use serde::{Deserialize, Serialize};

/// Closed set of field types a sample can infer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Timestamp,
    Decimal,
    Array,
    Object,
    ObjectId,
    BinData,
    Regex,
    MinKeyMaxKey,
    Unknown,
}

impl FieldType {
    /// Precedence rank when samples disagree on a field's type; the higher
    /// rank wins. String, boolean, array and object share a rank, in which
    /// case the first-seen type is kept.
    pub fn precedence(self) -> u8 {
        match self {
            FieldType::ObjectId => 10,
            FieldType::Date => 9,
            FieldType::Timestamp => 8,
            FieldType::Decimal => 7,
            FieldType::BinData => 6,
            FieldType::Regex => 5,
            FieldType::MinKeyMaxKey => 4,
            FieldType::Number => 3,
            FieldType::String | FieldType::Boolean | FieldType::Array | FieldType::Object => 2,
            FieldType::Unknown => 1,
        }
    }

    /// Merge two inferred types for the same field across samples.
    pub fn merge(self, other: FieldType) -> FieldType {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }
}

/// A single `{name, data_type}` field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub data_type: FieldType,
}

/// Descriptor of a relational table, always schema-qualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableSchema {
    /// Canonical `schema__table` key used throughout the render context.
    pub fn qualified_name(&self) -> String {
        format!("{}__{}", self.schema, self.name)
    }

    /// Case-insensitive field lookup against the sampled columns.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.name.eq_ignore_ascii_case(name))
    }
}

/// Descriptor of a document collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl CollectionSchema {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_merge_prefers_higher_rank() {
        assert_eq!(FieldType::String.merge(FieldType::ObjectId), FieldType::ObjectId);
        assert_eq!(FieldType::Number.merge(FieldType::Unknown), FieldType::Number);
        assert_eq!(FieldType::Date.merge(FieldType::Timestamp), FieldType::Date);
    }

    #[test]
    fn test_precedence_merge_ties_keep_first_seen() {
        assert_eq!(FieldType::String.merge(FieldType::Boolean), FieldType::String);
        assert_eq!(FieldType::Array.merge(FieldType::Object), FieldType::Array);
    }

    #[test]
    fn test_qualified_name() {
        let table = TableSchema {
            schema: "onboarding".to_string(),
            name: "organization".to_string(),
            fields: vec![],
        };
        assert_eq!(table.qualified_name(), "onboarding__organization");
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let table = TableSchema {
            schema: "public".to_string(),
            name: "accounts".to_string(),
            fields: vec![FieldDescriptor {
                name: "AccountId".to_string(),
                data_type: FieldType::String,
            }],
        };
        assert!(table.has_field("accountid"));
        assert!(table.has_field("ACCOUNTID"));
        assert!(!table.has_field("balance"));
    }
}
