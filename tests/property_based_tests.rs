//! Property suites for the filter algebra, the schema-syntax preprocessor
//! and decimal arithmetic output.

use proptest::prelude::*;
use reporter_model::{FilterCondition, Value};
use reporter_template::{TemplateSet, preprocess_schema_syntax};

fn values(len: usize) -> Vec<Value> {
    (0..len).map(|i| Value::Int(i as i64)).collect()
}

proptest! {
    /// `between` accepts exactly two operands, the ordering comparisons
    /// exactly one, membership any number.
    #[test]
    fn prop_filter_arity_rules(
        equals_len in 0usize..4,
        between_len in 0usize..4,
        greater_len in 0usize..4,
    ) {
        let condition = FilterCondition {
            equals: values(equals_len),
            between: values(between_len),
            greater_than: values(greater_len),
            ..Default::default()
        };

        let valid_greater = greater_len == 0 || greater_len == 1;
        let valid_between = between_len == 0 || between_len == 2;
        prop_assert_eq!(
            condition.validate("f").is_ok(),
            valid_greater && valid_between
        );
    }

    /// The emptiness predicate matches "compiles to no predicate at all".
    #[test]
    fn prop_emptiness_matches_compiled_predicates(
        equals_len in 0usize..3,
        in_len in 0usize..3,
        less_len in 0usize..2,
    ) {
        let condition = FilterCondition {
            equals: values(equals_len),
            in_: values(in_len),
            less_than: values(less_len),
            ..Default::default()
        };
        let compiled: usize = condition
            .slots()
            .iter()
            .map(|(_, slot)| usize::from(!slot.is_empty()))
            .sum();
        prop_assert_eq!(condition.is_empty(), compiled == 0);
    }

    /// The preprocessor is idempotent and never touches legacy-form paths.
    #[test]
    fn prop_preprocessor_idempotent(
        source in "[a-z][a-z0-9_]{0,8}",
        schema in "[a-z][a-z0-9_]{0,8}",
        table in "[a-z][a-z0-9_]{0,8}",
    ) {
        let template = format!("{{{{ {source}:{schema}.{table} }}}} and {{{{ {source}.{schema}__{table} }}}}");
        let once = preprocess_schema_syntax(&template);
        let twice = preprocess_schema_syntax(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.contains(&format!("{0}.{1}__{2}", source, schema, table)));

        let legacy = format!("{{{{ {source}.{table} }}}}");
        prop_assert_eq!(preprocess_schema_syntax(&legacy), legacy);
    }

    /// `calc` emits at most ten decimal places and never a trailing zero
    /// after the point.
    #[test]
    fn prop_calc_rounding(numerator in 1i64..10_000, denominator in 1i64..10_000) {
        let template = format!("{{% calc {numerator} / {denominator} %}}");
        let out = TemplateSet::new()
            .parse(&template)
            .unwrap()
            .render(&Value::Map(Default::default()))
            .unwrap();

        if let Some((_, fraction)) = out.split_once('.') {
            prop_assert!(fraction.len() <= 10, "too many decimals in {out}");
            prop_assert!(!fraction.ends_with('0'), "trailing zero in {out}");
            prop_assert!(!fraction.is_empty(), "trailing point in {out}");
        }
        prop_assert!(!out.is_empty());
    }

    /// Structure survives a decode/encode round trip through the value
    /// union.
    #[test]
    fn prop_value_json_round_trip(
        a in any::<i64>(),
        b in "[ -~]{0,24}",
        flag in any::<bool>(),
    ) {
        let json = serde_json::json!({"a": a, "b": b, "flag": flag, "nested": {"list": [a, b.clone()]}});
        let value: Value = serde_json::from_value(json).unwrap();
        let back: Value =
            serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        prop_assert_eq!(value, back);
    }
}
