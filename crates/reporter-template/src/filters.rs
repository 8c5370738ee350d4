//! Built-in reporting filters.
//!
//! Argument conventions follow the dialect's `field:value` packing: filters
//! taking two pieces of information receive them in one string argument
//! split at the first colon.

use reporter_model::Value;
use rust_decimal::Decimal;

use crate::TemplateError;
use crate::numeric::RESULT_SCALE;

fn string_arg(arg: Option<&Value>, filter: &str) -> Result<String, TemplateError> {
    match arg {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(TemplateError::render(format!(
            "filter {filter:?} expects a string argument"
        ))),
    }
}

fn split_arg(arg: &str) -> (&str, &str) {
    arg.split_once(':').unwrap_or((arg, ""))
}

/// `replace("search:replacement")` — substring replacement.
pub fn replace(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let arg = string_arg(arg, "replace")?;
    let (search, replacement) = split_arg(&arg);
    Ok(Value::String(input.to_string().replace(search, replacement)))
}

/// `where("field:value")` — keep sequence elements whose field matches.
pub fn where_(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let arg = string_arg(arg, "where")?;
    let (field, expected) = split_arg(&arg);
    let items = input.as_array().unwrap_or_default();
    let kept = items
        .iter()
        .filter(|item| {
            item.lookup_path(field)
                .is_some_and(|value| value.to_string() == expected)
        })
        .cloned()
        .collect();
    Ok(Value::Array(kept))
}

/// `sum("field")` — decimal sum of a field across a sequence.
pub fn sum(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let field = string_arg(arg, "sum")?;
    let items = input.as_array().unwrap_or_default();
    let total: Decimal = items
        .iter()
        .filter_map(|item| item.lookup_path(&field))
        .filter_map(Value::to_decimal)
        .sum();
    Ok(Value::Decimal(total.normalize()))
}

/// `count("field:value")` — number of elements whose field matches.
pub fn count(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let arg = string_arg(arg, "count")?;
    let (field, expected) = split_arg(&arg);
    let items = input.as_array().unwrap_or_default();
    let matching = items
        .iter()
        .filter(|item| {
            item.lookup_path(field)
                .is_some_and(|value| value.to_string() == expected)
        })
        .count();
    Ok(Value::Int(matching as i64))
}

/// `percent_of(total)` — the input as a percentage of `total`.
pub fn percent_of(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let total = arg
        .and_then(Value::to_decimal)
        .ok_or_else(|| TemplateError::render("filter \"percent_of\" expects a numeric argument"))?;
    if total.is_zero() {
        return Err(TemplateError::arithmetic("percent_of with a zero total"));
    }
    let value = input.to_decimal().unwrap_or(Decimal::ZERO);
    let percent = (value / total * Decimal::from(100))
        .round_dp(RESULT_SCALE)
        .normalize();
    Ok(Value::Decimal(percent))
}

/// `slice_str("start:end")` — substring by character positions, clamped.
pub fn slice_str(input: &Value, arg: Option<&Value>) -> Result<Value, TemplateError> {
    let arg = string_arg(arg, "slice_str")?;
    let (start_raw, end_raw) = split_arg(&arg);
    let text = input.to_string();
    let chars: Vec<char> = text.chars().collect();

    let start = start_raw.parse::<usize>().unwrap_or(0).min(chars.len());
    let end = end_raw.parse::<usize>().unwrap_or(chars.len()).min(chars.len());
    if start >= end {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// `strip_zeros` — drop trailing zeros (and a dangling point) from a
/// decimal rendering.
pub fn strip_zeros(input: &Value, _arg: Option<&Value>) -> Result<Value, TemplateError> {
    let text = input.to_string();
    if !text.contains('.') {
        return Ok(Value::String(text));
    }
    let stripped = text.trim_end_matches('0').trim_end_matches('.');
    Ok(Value::String(stripped.to_string()))
}

/// `xmlattr` — escape for use inside an XML attribute value.
pub fn xmlattr(input: &Value, _arg: Option<&Value>) -> Result<Value, TemplateError> {
    let escaped = input
        .to_string()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;");
    Ok(Value::String(escaped))
}

/// `xmlcontent` — escape for use as XML element content.
pub fn xmlcontent(input: &Value, _arg: Option<&Value>) -> Result<Value, TemplateError> {
    let escaped = input
        .to_string()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    Ok(Value::String(escaped))
}
