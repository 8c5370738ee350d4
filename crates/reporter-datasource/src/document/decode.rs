//! Normalization between relaxed extended JSON and the tagged value union.
//!
//! Raw documents cross the repository boundary as extended JSON. Decoding
//! turns them into language-neutral values: nested documents become maps,
//! arrays become sequences, `$date` becomes a native instant, object ids
//! become their hex string, and 16-byte binary payloads are attempted as
//! UUIDs before falling back to hex.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use reporter_model::{FieldType, Row, Value};
use rust_decimal::Decimal;
use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

use crate::repository::RepositoryError;

/// Decode one raw document into a row; the top level must be a document.
pub fn decode_row(json: &JsonValue) -> Result<Row, RepositoryError> {
    match decode_value(json) {
        Value::Map(entries) => Ok(entries),
        other => Err(RepositoryError::Decode {
            reason: format!("expected a document at the top level, got {other:?}"),
        }),
    }
}

/// Recursively normalize an extended JSON value.
pub fn decode_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(items.iter().map(decode_value).collect()),
        JsonValue::Object(entries) => {
            if let Some(special) = decode_extended(entries) {
                special
            } else {
                Value::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_value(v)))
                        .collect::<IndexMap<_, _>>(),
                )
            }
        }
    }
}

fn decode_extended(entries: &serde_json::Map<String, JsonValue>) -> Option<Value> {
    if let Some(oid) = entries.get("$oid") {
        return Some(Value::String(oid.as_str().unwrap_or_default().to_string()));
    }
    if let Some(date) = entries.get("$date") {
        return Some(decode_date(date));
    }
    if let Some(decimal) = entries.get("$numberDecimal") {
        let text = decimal.as_str().unwrap_or_default();
        return Some(match text.parse::<Decimal>() {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::String(text.to_string()),
        });
    }
    if let Some(long) = entries.get("$numberLong") {
        return Some(Value::Int(
            long.as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
        ));
    }
    if let Some(int) = entries.get("$numberInt") {
        return Some(Value::Int(
            int.as_str().and_then(|s| s.parse().ok()).unwrap_or(0),
        ));
    }
    if let Some(double) = entries.get("$numberDouble") {
        return Some(Value::Float(
            double.as_str().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        ));
    }
    if let Some(binary) = entries.get("$binary") {
        return Some(decode_binary(binary));
    }
    if let Some(regex) = entries.get("$regularExpression") {
        let pattern = regex
            .get("pattern")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        return Some(Value::String(pattern.to_string()));
    }
    if let Some(ts) = entries.get("$timestamp") {
        let seconds = ts.get("t").and_then(JsonValue::as_i64).unwrap_or(0);
        return Some(match Utc.timestamp_opt(seconds, 0).single() {
            Some(instant) => Value::DateTime(instant),
            None => Value::Null,
        });
    }
    if entries.contains_key("$minKey") || entries.contains_key("$maxKey") {
        return Some(Value::Null);
    }
    None
}

fn decode_date(date: &JsonValue) -> Value {
    match date {
        JsonValue::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Value::DateTime(ts.with_timezone(&Utc)),
            Err(_) => Value::String(s.clone()),
        },
        JsonValue::Object(inner) => {
            let millis = inner
                .get("$numberLong")
                .and_then(JsonValue::as_str)
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(0);
            match Utc.timestamp_millis_opt(millis).single() {
                Some(ts) => Value::DateTime(ts),
                None => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

fn decode_binary(binary: &JsonValue) -> Value {
    let encoded = binary
        .get("base64")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();
    let Ok(bytes) = BASE64.decode(encoded) else {
        return Value::String(encoded.to_string());
    };
    if bytes.len() == 16 {
        if let Ok(uuid) = Uuid::from_slice(&bytes) {
            return Value::String(uuid.hyphenated().to_string());
        }
    }
    Value::String(hex::encode(&bytes))
}

/// Re-encode a normalized value as relaxed extended JSON, used for filter
/// operands so typed comparisons (dates, decimals) survive the boundary.
pub fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Decimal(d) => json!({"$numberDecimal": d.to_string()}),
        Value::String(s) => json!(s),
        Value::DateTime(ts) => {
            json!({"$date": ts.to_rfc3339_opts(SecondsFormat::Millis, true)})
        }
        Value::Bytes(bytes) => json!({"$binary": {"base64": BASE64.encode(bytes), "subType": "00"}}),
        Value::Array(items) => JsonValue::Array(items.iter().map(encode_value).collect()),
        Value::Map(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        ),
    }
}

/// Infer a field type from a sampled extended JSON value.
pub fn infer_type(json: &JsonValue) -> FieldType {
    match json {
        JsonValue::Null => FieldType::Unknown,
        JsonValue::Bool(_) => FieldType::Boolean,
        JsonValue::Number(_) => FieldType::Number,
        JsonValue::String(_) => FieldType::String,
        JsonValue::Array(_) => FieldType::Array,
        JsonValue::Object(entries) => {
            if entries.contains_key("$oid") {
                FieldType::ObjectId
            } else if entries.contains_key("$date") {
                FieldType::Date
            } else if entries.contains_key("$timestamp") {
                FieldType::Timestamp
            } else if entries.contains_key("$numberDecimal") {
                FieldType::Decimal
            } else if entries.contains_key("$binary") {
                FieldType::BinData
            } else if entries.contains_key("$regularExpression") {
                FieldType::Regex
            } else if entries.contains_key("$minKey") || entries.contains_key("$maxKey") {
                FieldType::MinKeyMaxKey
            } else if entries.contains_key("$numberLong")
                || entries.contains_key("$numberInt")
                || entries.contains_key("$numberDouble")
            {
                FieldType::Number
            } else {
                FieldType::Object
            }
        }
    }
}
