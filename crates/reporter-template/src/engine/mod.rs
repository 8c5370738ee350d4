//! Template set, parsed template, and node rendering.

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod render;

use indexmap::IndexMap;
use reporter_model::Value;

use crate::TemplateError;
use crate::preprocess::preprocess_schema_syntax;
use crate::registry::{Extensions, extensions};

pub use parser::{Node, TagInvocation};
pub use render::RenderState;

/// A fresh parsing scope over the process-global extension registry.
///
/// Sets are cheap; creating one per parse keeps concurrent parses from ever
/// sharing mutable parser state, while registered filters and tags stay
/// shared globally.
pub struct TemplateSet {
    extensions: &'static Extensions,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self {
            extensions: extensions(),
        }
    }

    /// Preprocess and parse template source.
    pub fn parse(&self, source: &str) -> Result<Template, TemplateError> {
        let source = preprocess_schema_syntax(source);
        let segments = lexer::lex(&source)?;
        let nodes = parser::parse(segments, self.extensions)?;
        tracing::debug!(nodes = nodes.len(), "template parsed");
        Ok(Template {
            nodes,
            extensions: self.extensions,
        })
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed template, ready to render any number of times.
pub struct Template {
    nodes: Vec<Node>,
    extensions: &'static Extensions,
}

impl Template {
    /// Render against a context value. Every call gets its own
    /// [`RenderState`], so counters and scopes never leak between renders.
    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let mut state = RenderState::new(context);
        let mut out = String::new();
        render_nodes(&self.nodes, &mut state, self.extensions, &mut out)?;
        Ok(out)
    }
}

pub(crate) fn render_nodes(
    nodes: &[Node],
    state: &mut RenderState<'_>,
    extensions: &Extensions,
    out: &mut String,
) -> Result<(), TemplateError> {
    use std::fmt::Write;

    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = expr.eval(state, extensions)?;
                write!(out, "{value}")
                    .map_err(|_| TemplateError::render("formatting failed"))?;
            }
            Node::If {
                cond,
                then_body,
                else_body,
            } => {
                let branch = if cond.eval(state) { then_body } else { else_body };
                render_nodes(branch, state, extensions, out)?;
            }
            Node::For {
                var,
                iterable,
                body,
            } => {
                let items = match iterable.eval(state) {
                    Value::Array(items) => items,
                    // Missing or non-sequence iterables render nothing.
                    _ => Vec::new(),
                };
                let total = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let mut scope = IndexMap::new();
                    scope.insert(var.clone(), item);
                    let mut forloop = IndexMap::new();
                    forloop.insert("Counter".to_string(), Value::Int(index as i64 + 1));
                    forloop.insert("Counter0".to_string(), Value::Int(index as i64));
                    forloop.insert("First".to_string(), Value::Bool(index == 0));
                    forloop.insert("Last".to_string(), Value::Bool(index + 1 == total));
                    scope.insert("forloop".to_string(), Value::Map(forloop));

                    state.push_scope(scope);
                    let result = render_nodes(body, state, extensions, out);
                    state.pop_scope();
                    result?;
                }
            }
            Node::Tag(invocation) => {
                let tag = extensions.tag(&invocation.name).ok_or_else(|| {
                    TemplateError::render(format!("unknown tag {:?}", invocation.name))
                })?;
                let rendered = tag(invocation, state)?;
                out.push_str(&rendered);
            }
        }
    }
    Ok(())
}
