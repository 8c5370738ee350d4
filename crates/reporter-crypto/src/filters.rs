//! Pre-query filter rewrite for indexed-search columns.
//!
//! Encrypted backends cannot match on plaintext, so registered filter fields
//! are remapped to the backend's indexed-search path and every scalar string
//! operand is replaced by its keyed hash. Unregistered fields pass through
//! untouched.

use indexmap::IndexMap;
use reporter_model::{FilterCondition, Value};
use tracing::debug;

use crate::profile::EncryptionProfile;

/// One rewrite rule: a filter-field name and the search path it maps to.
///
/// A filter field engages a rule when it equals the name or ends with
/// `".<name>"`, so `holders.document` matches the `document` rule. Rules are
/// declared most-specific first.
#[derive(Debug, Clone, Copy)]
pub struct FilterFieldRule {
    pub name: &'static str,
    pub search_path: &'static str,
}

/// Registry of indexed-search filter fields. Adding a profile path is a data
/// change here, not a code change elsewhere.
pub const FILTER_FIELD_RULES: &[FilterFieldRule] = &[
    FilterFieldRule {
        name: "regulatory_fields.participant_document",
        search_path: "search.participant_document",
    },
    FilterFieldRule {
        name: "related_parties.document",
        search_path: "search.related_parties_document",
    },
    FilterFieldRule {
        name: "document",
        search_path: "search.document",
    },
    FilterFieldRule {
        name: "name",
        search_path: "search.name",
    },
];

fn matching_rule(field: &str) -> Option<&'static FilterFieldRule> {
    FILTER_FIELD_RULES.iter().find(|rule| {
        field == rule.name || field.ends_with(&format!(".{}", rule.name))
    })
}

/// Rewrite a table's filter map for an encrypted source.
///
/// Registered fields are re-keyed to their search path and their string
/// operands hashed in every slot; non-string scalars pass through unchanged.
pub fn rewrite_filters(
    profile: &EncryptionProfile,
    filters: &IndexMap<String, FilterCondition>,
) -> IndexMap<String, FilterCondition> {
    let mut rewritten = IndexMap::with_capacity(filters.len());
    for (field, condition) in filters {
        match matching_rule(field) {
            Some(rule) => {
                debug!(field = %field, search_path = rule.search_path, "hashing filter for indexed search");
                let mut condition = condition.clone();
                for slot in condition.slots_mut() {
                    for value in slot.iter_mut() {
                        if let Value::String(s) = value {
                            *value = Value::String(profile.hash(s));
                        }
                    }
                }
                rewritten.insert(rule.search_path.to_string(), condition);
            }
            None => {
                rewritten.insert(field.clone(), condition.clone());
            }
        }
    }
    rewritten
}
