//! Filter-algebra to document operator-tree compilation.

use indexmap::IndexMap;
use reporter_model::{FilterCondition, FilterOperator, Value};
use serde_json::{Map, Value as JsonValue, json};

use super::decode::encode_value;

fn operands(values: &[Value]) -> Vec<JsonValue> {
    values.iter().map(encode_value).collect()
}

/// Compile one condition into its operator tree.
///
/// A lone single-value `Equals` compiles to a direct match; everything else
/// merges into one `$`-operator document per field. `Between` expands to
/// `$gte` ∧ `$lte`.
pub fn compile_condition(condition: &FilterCondition) -> JsonValue {
    let mut operators = Map::new();
    for (operator, values) in condition.slots() {
        if values.is_empty() {
            continue;
        }
        match operator {
            FilterOperator::Equals => {
                if values.len() == 1 {
                    operators.insert("$eq".to_string(), encode_value(&values[0]));
                } else {
                    operators.insert("$in".to_string(), JsonValue::Array(operands(values)));
                }
            }
            FilterOperator::In => {
                operators.insert("$in".to_string(), JsonValue::Array(operands(values)));
            }
            FilterOperator::NotIn => {
                operators.insert("$nin".to_string(), JsonValue::Array(operands(values)));
            }
            FilterOperator::GreaterThan => {
                operators.insert("$gt".to_string(), encode_value(&values[0]));
            }
            FilterOperator::GreaterOrEqual => {
                operators.insert("$gte".to_string(), encode_value(&values[0]));
            }
            FilterOperator::LessThan => {
                operators.insert("$lt".to_string(), encode_value(&values[0]));
            }
            FilterOperator::LessOrEqual => {
                operators.insert("$lte".to_string(), encode_value(&values[0]));
            }
            FilterOperator::Between => {
                operators.insert("$gte".to_string(), encode_value(&values[0]));
                operators.insert("$lte".to_string(), encode_value(&values[1]));
            }
        }
    }

    // A bare equality stays a direct match so indexes see the plain value.
    if operators.len() == 1 {
        if let Some(direct) = operators.get("$eq") {
            return direct.clone();
        }
    }
    JsonValue::Object(operators)
}

/// Compile a field-to-condition map into a find filter document. Empty
/// conditions are skipped entirely.
pub fn compile_filters(filters: &IndexMap<String, FilterCondition>) -> JsonValue {
    let mut document = Map::new();
    for (field, condition) in filters {
        if condition.is_empty() {
            continue;
        }
        document.insert(field.clone(), compile_condition(condition));
    }
    JsonValue::Object(document)
}

/// Compile the simple `field → values` filter shape: one value is an
/// equality match, several become set membership.
pub fn compile_simple(filter: &IndexMap<String, Vec<Value>>) -> JsonValue {
    let mut document = Map::new();
    for (field, values) in filter {
        match values.as_slice() {
            [] => {}
            [single] => {
                document.insert(field.clone(), encode_value(single));
            }
            many => {
                document.insert(field.clone(), json!({"$in": operands(many)}));
            }
        }
    }
    JsonValue::Object(document)
}
