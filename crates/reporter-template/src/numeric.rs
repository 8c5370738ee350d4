//! Decimal-safe numeric helpers shared by filters and tags.

use chrono::{DateTime, NaiveDate, Utc};
use reporter_model::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::TemplateError;

/// Decimal places every computed result is rounded to before display.
pub const RESULT_SCALE: u32 = 10;

/// Round to [`RESULT_SCALE`] and format without trailing zeros or a trailing
/// decimal point.
pub fn format_decimal(value: Decimal) -> String {
    value.round_dp(RESULT_SCALE).normalize().to_string()
}

/// Numeric coercion with a zero default for unresolved or non-numeric input.
pub fn decimal_or_zero(value: Option<&Value>) -> Decimal {
    value.and_then(Value::to_decimal).unwrap_or(Decimal::ZERO)
}

/// Exponentiation: integral exponents stay exact, fractional ones fall back
/// to floating point.
pub fn pow(base: Decimal, exponent: Decimal) -> Result<Decimal, TemplateError> {
    if exponent.fract().is_zero() {
        let n = exponent
            .trunc()
            .to_string()
            .parse::<i64>()
            .map_err(|_| TemplateError::arithmetic("exponent out of range"))?;
        if n.unsigned_abs() > 10_000 {
            return Err(TemplateError::arithmetic("exponent out of range"));
        }
        let mut result = Decimal::ONE;
        for _ in 0..n.unsigned_abs() {
            result = result
                .checked_mul(base)
                .ok_or_else(|| TemplateError::arithmetic("exponentiation overflow"))?;
        }
        if n < 0 {
            if result.is_zero() {
                return Err(TemplateError::arithmetic("division by zero"));
            }
            result = Decimal::ONE / result;
        }
        Ok(result)
    } else {
        let base_f = base
            .to_f64()
            .ok_or_else(|| TemplateError::arithmetic("base out of range"))?;
        let exp_f = exponent
            .to_f64()
            .ok_or_else(|| TemplateError::arithmetic("exponent out of range"))?;
        Decimal::from_f64_retain(base_f.powf(exp_f))
            .ok_or_else(|| TemplateError::arithmetic("exponentiation produced a non-finite value"))
    }
}

/// Parse the date shapes accepted by ordering tags: native date-times,
/// RFC 3339 (with or without fractional seconds) and bare `YYYY-MM-DD`.
pub fn parse_order_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(ts) => Some(*ts),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}
