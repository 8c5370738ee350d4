//! Schema-syntax preprocessor.
//!
//! Templates may reference cross-schema tables as `source:schema.table`.
//! The render context keys tables by the canonical `schema__table` string,
//! so before parsing, every such reference inside `{{ }}` and `{% %}` spans
//! is rewritten to `source.schema__table`. String literals are left alone,
//! legacy dotted paths never match, and the rewrite is idempotent because
//! its output contains no colon.

use once_cell::sync::Lazy;
use regex::Regex;

static SCHEMA_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_]*):([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)")
        .expect("schema reference pattern is valid")
});

/// Rewrite `source:schema.table` references in template source.
pub fn preprocess_schema_syntax(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{").into_iter().chain(rest.find("{%")).min() {
        let close = if rest[start..].starts_with("{{") { "}}" } else { "%}" };
        let Some(end_rel) = rest[start + 2..].find(close) else {
            break;
        };
        let end = start + 2 + end_rel + 2;

        output.push_str(&rest[..start + 2]);
        rewrite_span(&rest[start + 2..end - 2], &mut output);
        output.push_str(close);
        rest = &rest[end..];
    }
    output.push_str(rest);
    output
}

/// Rewrite one span's content, skipping quoted string literals.
fn rewrite_span(content: &str, output: &mut String) {
    let mut chunk = String::new();
    let mut chars = content.chars();
    let mut in_string = false;

    for c in chars.by_ref() {
        if c == '"' {
            if in_string {
                output.push(c);
            } else {
                output.push_str(&SCHEMA_REF.replace_all(&chunk, "$1.$2__$3"));
                chunk.clear();
                output.push(c);
            }
            in_string = !in_string;
        } else if in_string {
            output.push(c);
        } else {
            chunk.push(c);
        }
    }
    output.push_str(&SCHEMA_REF.replace_all(&chunk, "$1.$2__$3"));
}
