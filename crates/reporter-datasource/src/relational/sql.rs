//! Filter-algebra to SQL predicate compilation.
//!
//! Statements are always built with positional parameters; values never end
//! up inside the SQL text. Identifiers are restricted to a conservative
//! character set instead of being escaped.

use reporter_model::{FilterCondition, FilterOperator, Value};

use crate::DataSourceError;

/// Quote an identifier, rejecting anything outside `[A-Za-z0-9_]`.
pub fn quote_ident(ident: &str) -> Result<String, DataSourceError> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(DataSourceError::InvalidIdentifier {
            identifier: ident.to_string(),
        });
    }
    Ok(format!("\"{ident}\""))
}

fn placeholder(params: &[Value]) -> String {
    format!("${}", params.len())
}

fn push_param(params: &mut Vec<Value>, value: &Value) -> String {
    params.push(value.clone());
    placeholder(params)
}

fn in_list(params: &mut Vec<Value>, values: &[Value]) -> String {
    let placeholders: Vec<String> = values.iter().map(|v| push_param(params, v)).collect();
    placeholders.join(", ")
}

/// Compile one condition into SQL predicates, appending operand values to
/// `params`. Empty slots compile to nothing; an entirely empty condition
/// yields no predicates at all.
pub fn compile_condition(
    column: &str,
    condition: &FilterCondition,
    params: &mut Vec<Value>,
) -> Result<Vec<String>, DataSourceError> {
    let column = quote_ident(column)?;
    let mut predicates = Vec::new();

    for (operator, values) in condition.slots() {
        if values.is_empty() {
            continue;
        }
        let predicate = match operator {
            FilterOperator::Equals => {
                if values.len() == 1 {
                    format!("{column} = {}", push_param(params, &values[0]))
                } else {
                    format!("{column} IN ({})", in_list(params, values))
                }
            }
            FilterOperator::In => format!("{column} IN ({})", in_list(params, values)),
            FilterOperator::NotIn => format!("{column} NOT IN ({})", in_list(params, values)),
            FilterOperator::GreaterThan => {
                format!("{column} > {}", push_param(params, &values[0]))
            }
            FilterOperator::GreaterOrEqual => {
                format!("{column} >= {}", push_param(params, &values[0]))
            }
            FilterOperator::LessThan => format!("{column} < {}", push_param(params, &values[0])),
            FilterOperator::LessOrEqual => {
                format!("{column} <= {}", push_param(params, &values[0]))
            }
            FilterOperator::Between => format!(
                "{column} >= {} AND {column} <= {}",
                push_param(params, &values[0]),
                push_param(params, &values[1])
            ),
        };
        predicates.push(predicate);
    }

    Ok(predicates)
}

/// Assemble a SELECT for the given qualified table.
pub fn build_select(
    schema: &str,
    table: &str,
    columns: &[String],
    predicates: &[String],
) -> Result<String, DataSourceError> {
    let column_list = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")
    };

    let mut text = format!(
        "SELECT {column_list} FROM {}.{}",
        quote_ident(schema)?,
        quote_ident(table)?
    );
    if !predicates.is_empty() {
        text.push_str(" WHERE ");
        text.push_str(&predicates.join(" AND "));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_rejects_injection() {
        assert!(quote_ident("accounts").is_ok());
        assert!(quote_ident("account_id").is_ok());
        assert!(quote_ident("").is_err());
        assert!(quote_ident("a\"b").is_err());
        assert!(quote_ident("a; DROP TABLE x").is_err());
        assert!(quote_ident("search.document").is_err());
    }

    #[test]
    fn test_equals_single_and_many() {
        let mut params = Vec::new();
        let condition = FilterCondition {
            equals: vec![Value::from("x")],
            ..Default::default()
        };
        let predicates = compile_condition("status", &condition, &mut params).unwrap();
        assert_eq!(predicates, vec![r#""status" = $1"#.to_string()]);

        let mut params = Vec::new();
        let condition = FilterCondition {
            equals: vec![Value::from("x"), Value::from("y")],
            ..Default::default()
        };
        let predicates = compile_condition("status", &condition, &mut params).unwrap();
        assert_eq!(predicates, vec![r#""status" IN ($1, $2)"#.to_string()]);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_between_expands_to_bounds() {
        let mut params = Vec::new();
        let condition = FilterCondition {
            between: vec![Value::Int(10), Value::Int(20)],
            ..Default::default()
        };
        let predicates = compile_condition("amount", &condition, &mut params).unwrap();
        assert_eq!(
            predicates,
            vec![r#""amount" >= $1 AND "amount" <= $2"#.to_string()]
        );
        assert_eq!(params, vec![Value::Int(10), Value::Int(20)]);
    }

    #[test]
    fn test_ordering_operators() {
        let mut params = Vec::new();
        let condition = FilterCondition {
            greater_than: vec![Value::Int(1)],
            less_or_equal: vec![Value::Int(9)],
            ..Default::default()
        };
        let predicates = compile_condition("v", &condition, &mut params).unwrap();
        assert_eq!(
            predicates,
            vec![r#""v" > $1"#.to_string(), r#""v" <= $2"#.to_string()]
        );
    }

    #[test]
    fn test_empty_condition_compiles_to_nothing() {
        let mut params = Vec::new();
        let predicates =
            compile_condition("v", &FilterCondition::default(), &mut params).unwrap();
        assert!(predicates.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_select_wildcard_and_where() {
        let text = build_select("onboarding", "organization", &[], &[]).unwrap();
        assert_eq!(text, r#"SELECT * FROM "onboarding"."organization""#);

        let columns = vec!["name".to_string(), "document".to_string()];
        let predicates = vec![r#""status" = $1"#.to_string()];
        let text = build_select("public", "accounts", &columns, &predicates).unwrap();
        assert_eq!(
            text,
            r#"SELECT "name", "document" FROM "public"."accounts" WHERE "status" = $1"#
        );
    }
}
