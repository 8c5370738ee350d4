//! Post-query decryption at declared nested paths.
//!
//! Which fields are encrypted is a property of the backend's data model, so
//! the paths live in a declarative selector list. Selector grammar: dotted
//! segments descend into maps, a trailing `*` decrypts every direct string
//! value of a map, and `segment[]` applies the remainder to every element of
//! an array.

use reporter_model::{Row, Value};

use crate::CryptoError;
use crate::profile::EncryptionProfile;

/// Nested paths decrypted on every returned row.
pub const DECRYPT_PATHS: &[&str] = &[
    "document",
    "name",
    "contact.*",
    "banking_details.*",
    "legal_person.representative.*",
    "natural_person.*",
    "regulatory_fields.participant_document",
    "related_parties[].document",
];

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Each(String),
    AllKeys,
}

fn parse_selector(selector: &str) -> Vec<Segment> {
    selector
        .split('.')
        .map(|part| {
            if part == "*" {
                Segment::AllKeys
            } else if let Some(name) = part.strip_suffix("[]") {
                Segment::Each(name.to_string())
            } else {
                Segment::Key(part.to_string())
            }
        })
        .collect()
}

/// Decrypt every registered path in `row` in place.
///
/// Absent paths are skipped; non-strings, empty strings and nulls are left
/// untouched. The first decrypt failure aborts the row with an error naming
/// the field.
pub fn decrypt_row(profile: &EncryptionProfile, row: &mut Row) -> Result<(), CryptoError> {
    for selector in DECRYPT_PATHS {
        let segments = parse_selector(selector);
        apply_map(profile, row, &segments, "")?;
    }
    Ok(())
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn apply_map(
    profile: &EncryptionProfile,
    entries: &mut indexmap::IndexMap<String, Value>,
    segments: &[Segment],
    prefix: &str,
) -> Result<(), CryptoError> {
    match segments {
        [] => Ok(()),
        [Segment::AllKeys] => {
            let keys: Vec<String> = entries.keys().cloned().collect();
            for key in keys {
                let path = join(prefix, &key);
                if let Some(value) = entries.get_mut(&key) {
                    decrypt_in_place(profile, value, &path)?;
                }
            }
            Ok(())
        }
        [Segment::Key(name)] => {
            let path = join(prefix, name);
            if let Some(value) = entries.get_mut(name) {
                decrypt_in_place(profile, value, &path)?;
            }
            Ok(())
        }
        [Segment::Key(name), rest @ ..] => {
            let path = join(prefix, name);
            match entries.get_mut(name) {
                Some(Value::Map(inner)) => apply_map(profile, inner, rest, &path),
                _ => Ok(()),
            }
        }
        [Segment::Each(name), rest @ ..] => {
            let path = join(prefix, name);
            match entries.get_mut(name) {
                Some(Value::Array(items)) => {
                    for (index, item) in items.iter_mut().enumerate() {
                        if let Value::Map(inner) = item {
                            apply_map(profile, inner, rest, &format!("{path}.{index}"))?;
                        }
                    }
                    Ok(())
                }
                _ => Ok(()),
            }
        }
        [Segment::AllKeys, ..] => Ok(()),
    }
}

fn decrypt_in_place(
    profile: &EncryptionProfile,
    value: &mut Value,
    path: &str,
) -> Result<(), CryptoError> {
    if let Value::String(s) = value {
        if !s.is_empty() {
            *value = Value::String(profile.decrypt(s, path)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn profile() -> EncryptionProfile {
        EncryptionProfile::from_keys("p", b"hash-secret", &"ef".repeat(32), "VAR").unwrap()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_decrypts_top_level_and_nested_paths() {
        let p = profile();
        let mut row: Row = IndexMap::new();
        row.insert(
            "document".to_string(),
            Value::String(p.encrypt("12345678901").unwrap()),
        );
        row.insert(
            "contact".to_string(),
            map(vec![
                ("email", Value::String(p.encrypt("a@b.c").unwrap())),
                ("phone", Value::String(p.encrypt("555").unwrap())),
            ]),
        );
        row.insert("status".to_string(), Value::from("active"));

        decrypt_row(&p, &mut row).unwrap();

        assert_eq!(row["document"], Value::from("12345678901"));
        assert_eq!(
            row["contact"].lookup_path("email"),
            Some(&Value::from("a@b.c"))
        );
        assert_eq!(
            row["contact"].lookup_path("phone"),
            Some(&Value::from("555"))
        );
        // Unregistered fields are not touched (decrypting "active" would fail).
        assert_eq!(row["status"], Value::from("active"));
    }

    #[test]
    fn test_decrypts_each_related_party_document() {
        let p = profile();
        let mut row: Row = IndexMap::new();
        row.insert(
            "related_parties".to_string(),
            Value::Array(vec![
                map(vec![
                    ("document", Value::String(p.encrypt("111").unwrap())),
                    ("role", Value::from("owner")),
                ]),
                map(vec![("document", Value::String(p.encrypt("222").unwrap()))]),
            ]),
        );

        decrypt_row(&p, &mut row).unwrap();

        assert_eq!(
            row["related_parties"].lookup_path("0.document"),
            Some(&Value::from("111"))
        );
        assert_eq!(
            row["related_parties"].lookup_path("1.document"),
            Some(&Value::from("222"))
        );
        assert_eq!(
            row["related_parties"].lookup_path("0.role"),
            Some(&Value::from("owner"))
        );
    }

    #[test]
    fn test_skips_non_strings_empties_and_nulls() {
        let p = profile();
        let mut row: Row = IndexMap::new();
        row.insert("document".to_string(), Value::Null);
        row.insert(
            "natural_person".to_string(),
            map(vec![
                ("age", Value::Int(30)),
                ("nickname", Value::String(String::new())),
            ]),
        );

        decrypt_row(&p, &mut row).unwrap();

        assert_eq!(row["document"], Value::Null);
        assert_eq!(row["natural_person"].lookup_path("age"), Some(&Value::Int(30)));
        assert_eq!(
            row["natural_person"].lookup_path("nickname"),
            Some(&Value::String(String::new()))
        );
    }

    #[test]
    fn test_failure_names_the_field() {
        let p = profile();
        let mut row: Row = IndexMap::new();
        row.insert(
            "regulatory_fields".to_string(),
            map(vec![(
                "participant_document",
                Value::from("not-encrypted-at-all"),
            )]),
        );

        let err = decrypt_row(&p, &mut row).unwrap_err();
        assert!(
            err.to_string()
                .contains("regulatory_fields.participant_document")
        );
    }

    #[test]
    fn test_absent_paths_are_skipped() {
        let p = profile();
        let mut row: Row = IndexMap::new();
        row.insert("unrelated".to_string(), Value::from("x"));
        assert!(decrypt_row(&p, &mut row).is_ok());
    }
}
