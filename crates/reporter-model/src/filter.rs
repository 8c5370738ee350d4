//! Filter condition algebra and its arity validator.
//!
//! A [`FilterCondition`] carries one slot per operator; each slot is an
//! ordered sequence of scalar operands. Adapters compile the algebra to
//! their native predicate shape (SQL or operator trees), but arity is
//! checked here once, before any dispatch happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// The eight filter operators, in canonical (validation and compilation) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    In,
    NotIn,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Between,
}

impl FilterOperator {
    /// Lowercase operator name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::GreaterOrEqual => "greater_or_equal",
            FilterOperator::LessThan => "less_than",
            FilterOperator::LessOrEqual => "less_or_equal",
            FilterOperator::Between => "between",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error(
        "invalid filter for field {field}: operator {operator} expects {expected} value(s), got {actual}"
    )]
    InvalidArity {
        field: String,
        operator: &'static str,
        expected: &'static str,
        actual: usize,
    },
}

/// Algebraic filter over a single field.
///
/// Slot names accept both snake_case and camelCase on the wire. A condition
/// with every slot empty is a no-op and compiles to no predicate at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCondition {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub equals: Vec<Value>,
    #[serde(alias = "greaterThan", skip_serializing_if = "Vec::is_empty")]
    pub greater_than: Vec<Value>,
    #[serde(alias = "greaterOrEqual", skip_serializing_if = "Vec::is_empty")]
    pub greater_or_equal: Vec<Value>,
    #[serde(alias = "lessThan", skip_serializing_if = "Vec::is_empty")]
    pub less_than: Vec<Value>,
    #[serde(alias = "lessOrEqual", skip_serializing_if = "Vec::is_empty")]
    pub less_or_equal: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub between: Vec<Value>,
    #[serde(rename = "in", skip_serializing_if = "Vec::is_empty")]
    pub in_: Vec<Value>,
    #[serde(alias = "notIn", skip_serializing_if = "Vec::is_empty")]
    pub not_in: Vec<Value>,
}

impl FilterCondition {
    /// All slots paired with their operator, in canonical order.
    pub fn slots(&self) -> [(FilterOperator, &Vec<Value>); 8] {
        [
            (FilterOperator::Equals, &self.equals),
            (FilterOperator::In, &self.in_),
            (FilterOperator::NotIn, &self.not_in),
            (FilterOperator::GreaterThan, &self.greater_than),
            (FilterOperator::GreaterOrEqual, &self.greater_or_equal),
            (FilterOperator::LessThan, &self.less_than),
            (FilterOperator::LessOrEqual, &self.less_or_equal),
            (FilterOperator::Between, &self.between),
        ]
    }

    /// Mutable access to every slot, for in-place operand rewriting.
    pub fn slots_mut(&mut self) -> [&mut Vec<Value>; 8] {
        [
            &mut self.equals,
            &mut self.in_,
            &mut self.not_in,
            &mut self.greater_than,
            &mut self.greater_or_equal,
            &mut self.less_than,
            &mut self.less_or_equal,
            &mut self.between,
        ]
    }

    /// A condition is empty iff every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(|(_, values)| values.is_empty())
    }

    /// Enforce arity per operator, first violation wins.
    ///
    /// `between` takes exactly two operands, the ordering comparisons take
    /// exactly one, and the membership operators are unbounded. Empty slots
    /// are skipped entirely.
    pub fn validate(&self, field: &str) -> Result<(), FilterError> {
        for (operator, values) in self.slots() {
            if values.is_empty() {
                continue;
            }
            let violation = match operator {
                FilterOperator::GreaterThan
                | FilterOperator::GreaterOrEqual
                | FilterOperator::LessThan
                | FilterOperator::LessOrEqual => (values.len() != 1).then_some("exactly 1"),
                FilterOperator::Between => (values.len() != 2).then_some("exactly 2"),
                FilterOperator::Equals | FilterOperator::In | FilterOperator::NotIn => None,
            };
            if let Some(expected) = violation {
                return Err(FilterError::InvalidArity {
                    field: field.to_string(),
                    operator: operator.name(),
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }
}
