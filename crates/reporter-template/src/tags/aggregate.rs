//! Aggregation tags: `sum_by`, `avg_by`, `min_by`, `max_by`, `count_by`.
//!
//! Shared syntax: `{% sum_by coll by "field" [if cond] %}`; `count_by` takes
//! no field. The condition is evaluated per element with the element's
//! fields in scope.

use reporter_model::Value;
use rust_decimal::Decimal;

use super::{item_matches, resolve_collection, split_condition, tag_error};
use crate::TemplateError;
use crate::engine::lexer::Token;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;
use crate::numeric::{RESULT_SCALE, format_decimal};

enum Aggregation {
    Sum,
    Avg,
    Min,
    Max,
}

fn aggregate(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
    aggregation: Aggregation,
) -> Result<String, TemplateError> {
    let (args, cond) = split_condition(invocation, &invocation.tokens)?;
    let [Token::Word(path), Token::Word(by), Token::Str(field)] = args.as_slice() else {
        return Err(tag_error(invocation, "expected: <coll> by \"field\""));
    };
    if by != "by" {
        return Err(tag_error(invocation, "expected the keyword \"by\""));
    }

    let items = resolve_collection(state, path);
    let mut values = Vec::new();
    for item in &items {
        if !item_matches(cond.as_ref(), state, item) {
            continue;
        }
        if let Some(value) = item.lookup_path(field).and_then(Value::to_decimal) {
            values.push(value);
        }
    }

    let result = match aggregation {
        Aggregation::Sum => values.iter().copied().sum(),
        Aggregation::Avg => {
            if values.is_empty() {
                Decimal::ZERO
            } else {
                let total: Decimal = values.iter().copied().sum();
                (total / Decimal::from(values.len() as i64)).round_dp(RESULT_SCALE)
            }
        }
        Aggregation::Min => values.iter().copied().min().unwrap_or(Decimal::ZERO),
        Aggregation::Max => values.iter().copied().max().unwrap_or(Decimal::ZERO),
    };
    Ok(format_decimal(result))
}

pub fn sum_by(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    aggregate(invocation, state, Aggregation::Sum)
}

pub fn avg_by(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    aggregate(invocation, state, Aggregation::Avg)
}

pub fn min_by(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    aggregate(invocation, state, Aggregation::Min)
}

pub fn max_by(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    aggregate(invocation, state, Aggregation::Max)
}

/// `{% count_by coll [if cond] %}` — matching element count.
pub fn count_by(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let (args, cond) = split_condition(invocation, &invocation.tokens)?;
    let [Token::Word(path)] = args.as_slice() else {
        return Err(tag_error(invocation, "expected a collection path"));
    };

    let items = resolve_collection(state, path);
    let mut matching = 0u64;
    for item in &items {
        if item_matches(cond.as_ref(), state, item) {
            matching += 1;
        }
    }
    Ok(matching.to_string())
}

#[cfg(test)]
mod tests {
    use crate::engine::TemplateSet;
    use reporter_model::Value;

    fn render(source: &str, context_json: &str) -> String {
        let context: Value = serde_json::from_str(context_json).unwrap();
        TemplateSet::new()
            .parse(source)
            .unwrap()
            .render(&context)
            .unwrap()
    }

    const LEDGER: &str = r#"{"entries": [
        {"amount": "100.50", "status": "active"},
        {"amount": "200.25", "status": "active"},
        {"amount": "999", "status": "closed"}
    ]}"#;

    #[test]
    fn test_sum_by() {
        assert_eq!(render(r#"{% sum_by entries by "amount" %}"#, LEDGER), "1299.75");
    }

    #[test]
    fn test_sum_by_with_condition() {
        assert_eq!(
            render(
                r#"{% sum_by entries by "amount" if status == "active" %}"#,
                LEDGER
            ),
            "300.75"
        );
    }

    #[test]
    fn test_avg_min_max() {
        assert_eq!(
            render(r#"{% avg_by entries by "amount" if status == "active" %}"#, LEDGER),
            "150.375"
        );
        assert_eq!(render(r#"{% min_by entries by "amount" %}"#, LEDGER), "100.5");
        assert_eq!(render(r#"{% max_by entries by "amount" %}"#, LEDGER), "999");
    }

    #[test]
    fn test_count_by() {
        assert_eq!(render(r#"{% count_by entries %}"#, LEDGER), "3");
        assert_eq!(
            render(r#"{% count_by entries if status == "active" %}"#, LEDGER),
            "2"
        );
    }

    #[test]
    fn test_empty_collection_is_zero() {
        assert_eq!(render(r#"{% sum_by missing by "amount" %}"#, "{}"), "0");
        assert_eq!(render(r#"{% avg_by missing by "amount" %}"#, "{}"), "0");
        assert_eq!(render(r#"{% count_by missing %}"#, "{}"), "0");
    }
}
