//! Template engine for rendered reports.
//!
//! The dialect is closed: `{{ expr | filter("arg") }}` outputs, `{% for %}` /
//! `{% if %}` control blocks, `{# comments #}`, and a registry of reporting
//! tags (aggregations, decimal-safe arithmetic, counters, grouping). No
//! user-supplied code ever executes.
//!
//! Registration of filters and tags is global and happens at most once per
//! process; parsing always happens in a fresh [`TemplateSet`] so concurrent
//! parses never race on shared state. Counter state is scoped to a single
//! render.

pub mod engine;
pub mod filters;
pub mod numeric;
pub mod preprocess;
pub mod registry;
pub mod tags;

use thiserror::Error;

pub use engine::{Template, TemplateSet};
pub use preprocess::preprocess_schema_syntax;
pub use registry::register_extensions;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("render error: {message}")]
    Render { message: String },

    #[error("arithmetic error: {message}")]
    Arithmetic { message: String },

    #[error("template extensions already registered")]
    AlreadyRegistered,
}

impl TemplateError {
    pub(crate) fn render(message: impl Into<String>) -> Self {
        TemplateError::Render {
            message: message.into(),
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>) -> Self {
        TemplateError::Arithmetic {
            message: message.into(),
        }
    }
}
