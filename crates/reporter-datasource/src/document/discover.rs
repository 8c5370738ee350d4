//! Hybrid collection schema discovery.
//!
//! Small collections are cheap to union exhaustively; large ones are
//! random-sampled with a size table. A second, much smaller sweep infers
//! field types, merged under the type precedence order.

use std::collections::BTreeMap;

use reporter_model::{CollectionSchema, FieldDescriptor, FieldType};
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::decode::infer_type;
use crate::DataSourceError;
use crate::repository::DocumentRepository;

/// Collections at or below this size use the key-set union pipeline.
const KEYSET_UNION_MAX: u64 = 10_000;
/// The union pipeline only reads this many leading documents.
const KEYSET_UNION_LIMIT: u64 = 1_000;
/// Documents read by the type-inference sweep.
const TYPE_SWEEP_LIMIT: u64 = 50;

/// Random sample size for collections too large to union.
fn sample_size(document_count: u64) -> u64 {
    match document_count {
        0..=1_000 => document_count,
        1_001..=10_000 => 1_000,
        10_001..=100_000 => 2_000,
        100_001..=1_000_000 => 5_000,
        _ => 10_000,
    }
}

fn keyset_stages() -> Vec<JsonValue> {
    vec![
        json!({"$project": {"kv": {"$objectToArray": "$$ROOT"}}}),
        json!({"$unwind": "$kv"}),
        json!({"$group": {"_id": null, "keys": {"$addToSet": "$kv.k"}}}),
    ]
}

/// Sample one collection's field set and types.
pub async fn get_collection_schema(
    source_name: &str,
    repository: &dyn DocumentRepository,
    collection: &str,
) -> Result<CollectionSchema, DataSourceError> {
    let adapter_error = |error| DataSourceError::Adapter {
        source: source_name.to_string(),
        error,
    };

    let count = repository
        .count_documents(collection)
        .await
        .map_err(adapter_error)?;

    let mut pipeline = Vec::new();
    if count <= KEYSET_UNION_MAX {
        pipeline.push(json!({"$limit": KEYSET_UNION_LIMIT}));
    } else {
        let size = sample_size(count);
        debug!(collection, count, size, "sampling large collection");
        pipeline.push(json!({"$sample": {"size": size}}));
    }
    pipeline.extend(keyset_stages());

    let grouped = repository
        .aggregate(collection, &pipeline)
        .await
        .map_err(adapter_error)?;

    let mut fields: BTreeMap<String, FieldType> = BTreeMap::new();
    for document in &grouped {
        if let Some(keys) = document.get("keys").and_then(JsonValue::as_array) {
            for key in keys {
                if let Some(name) = key.as_str() {
                    fields.entry(name.to_string()).or_insert(FieldType::Unknown);
                }
            }
        }
    }

    // Second sweep: infer types from a handful of whole documents.
    let samples = repository
        .find(collection, &json!({}), &[], Some(TYPE_SWEEP_LIMIT))
        .await
        .map_err(adapter_error)?;
    for document in &samples {
        if let Some(entries) = document.as_object() {
            for (name, value) in entries {
                let inferred = infer_type(value);
                fields
                    .entry(name.clone())
                    .and_modify(|existing| *existing = existing.merge(inferred))
                    .or_insert(inferred);
            }
        }
    }

    Ok(CollectionSchema {
        name: collection.to_string(),
        fields: fields
            .into_iter()
            .map(|(name, data_type)| FieldDescriptor { name, data_type })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_sample_size_table() {
        assert_eq!(sample_size(500), 500);
        assert_eq!(sample_size(1_000), 1_000);
        assert_eq!(sample_size(10_000), 1_000);
        assert_eq!(sample_size(100_000), 2_000);
        assert_eq!(sample_size(1_000_000), 5_000);
        assert_eq!(sample_size(5_000_000), 10_000);
    }

    struct FakeRepository {
        count: u64,
        pipelines: Mutex<Vec<Vec<JsonValue>>>,
        keys: Vec<&'static str>,
        samples: Vec<JsonValue>,
    }

    #[async_trait]
    impl DocumentRepository for FakeRepository {
        async fn count_documents(&self, _: &str) -> Result<u64, RepositoryError> {
            Ok(self.count)
        }

        async fn aggregate(
            &self,
            _: &str,
            pipeline: &[JsonValue],
        ) -> Result<Vec<JsonValue>, RepositoryError> {
            self.pipelines.lock().unwrap().push(pipeline.to_vec());
            Ok(vec![json!({"_id": null, "keys": self.keys})])
        }

        async fn find(
            &self,
            _: &str,
            _: &JsonValue,
            _: &[String],
            _: Option<u64>,
        ) -> Result<Vec<JsonValue>, RepositoryError> {
            Ok(self.samples.clone())
        }
    }

    #[tokio::test]
    async fn test_small_collection_uses_keyset_union() {
        let repository = FakeRepository {
            count: 5_000,
            pipelines: Mutex::new(Vec::new()),
            keys: vec!["_id", "name"],
            samples: vec![json!({"_id": {"$oid": "aa"}, "name": "x"})],
        };
        let schema = get_collection_schema("src", &repository, "holders")
            .await
            .unwrap();

        let pipelines = repository.pipelines.lock().unwrap();
        assert_eq!(pipelines[0][0], json!({"$limit": 1_000}));

        let by_name: BTreeMap<_, _> = schema
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.data_type))
            .collect();
        assert_eq!(by_name["_id"], FieldType::ObjectId);
        assert_eq!(by_name["name"], FieldType::String);
    }

    #[tokio::test]
    async fn test_large_collection_uses_sampling() {
        let repository = FakeRepository {
            count: 250_000,
            pipelines: Mutex::new(Vec::new()),
            keys: vec!["balance"],
            samples: vec![],
        };
        get_collection_schema("src", &repository, "balances")
            .await
            .unwrap();

        let pipelines = repository.pipelines.lock().unwrap();
        assert_eq!(pipelines[0][0], json!({"$sample": {"size": 5_000}}));
    }

    #[tokio::test]
    async fn test_type_precedence_merges_across_samples() {
        let repository = FakeRepository {
            count: 10,
            pipelines: Mutex::new(Vec::new()),
            keys: vec!["created"],
            samples: vec![
                json!({"created": "2026-01-01"}),
                json!({"created": {"$date": "2026-01-01T00:00:00Z"}}),
            ],
        };
        let schema = get_collection_schema("src", &repository, "events")
            .await
            .unwrap();
        // date outranks string in the precedence order.
        assert_eq!(schema.fields[0].data_type, FieldType::Date);
    }

    #[tokio::test]
    async fn test_keys_without_samples_stay_unknown() {
        let repository = FakeRepository {
            count: 10,
            pipelines: Mutex::new(Vec::new()),
            keys: vec!["rare_field"],
            samples: vec![json!({})],
        };
        let schema = get_collection_schema("src", &repository, "events")
            .await
            .unwrap();
        assert_eq!(schema.fields[0].data_type, FieldType::Unknown);
    }
}
