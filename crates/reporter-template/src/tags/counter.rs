//! `{% counter "name" %}` / `{% counter_show "a" ["b" ...] %}`.
//!
//! Counter storage belongs to the render state, so concurrent renders of
//! the same template never observe each other's counts.

use super::{single_string, tag_error};
use crate::TemplateError;
use crate::engine::lexer::Token;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;

/// Increment a named counter; renders nothing.
pub fn counter(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let name = single_string(invocation, &invocation.tokens)?;
    state.counter_increment(&name);
    Ok(String::new())
}

/// Render the sum of one or more named counters.
pub fn counter_show(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    if invocation.tokens.is_empty() {
        return Err(tag_error(invocation, "expected at least one counter name"));
    }
    let mut names = Vec::with_capacity(invocation.tokens.len());
    for token in &invocation.tokens {
        match token {
            Token::Str(name) => names.push(name.clone()),
            other => {
                return Err(tag_error(
                    invocation,
                    format!("expected quoted counter names, got {other:?}"),
                ));
            }
        }
    }
    Ok(state.counter_total(names).to_string())
}

#[cfg(test)]
mod tests {
    use crate::engine::TemplateSet;
    use reporter_model::Value;

    fn render(source: &str) -> String {
        TemplateSet::new()
            .parse(source)
            .unwrap()
            .render(&Value::Map(Default::default()))
            .unwrap()
    }

    #[test]
    fn test_counter_accumulates() {
        let out = render(r#"{% counter "x" %}{% counter "x" %}{% counter_show "x" %}"#);
        assert_eq!(out, "2");
    }

    #[test]
    fn test_counter_show_sums_multiple_names() {
        let out = render(
            r#"{% counter "A" %}{% counter "A" %}{% counter "B" %}{% counter_show "A" "B" %}"#,
        );
        assert_eq!(out, "3");
    }

    #[test]
    fn test_counters_are_per_render() {
        let set = TemplateSet::new();
        let template = set
            .parse(r#"{% counter "x" %}{% counter "x" %}{% counter_show "x" %}"#)
            .unwrap();
        let context = Value::Map(Default::default());
        // Two renders of one parsed template never share counter state.
        assert_eq!(template.render(&context).unwrap(), "2");
        assert_eq!(template.render(&context).unwrap(), "2");
    }

    #[test]
    fn test_unknown_counter_shows_zero() {
        assert_eq!(render(r#"{% counter_show "missing" %}"#), "0");
    }

    #[test]
    fn test_concurrent_renders_are_isolated() {
        let set = TemplateSet::new();
        let template = std::sync::Arc::new(
            set.parse(r#"{% counter "x" %}{% counter "x" %}{% counter_show "x" %}"#)
                .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..16 {
            let template = std::sync::Arc::clone(&template);
            handles.push(std::thread::spawn(move || {
                template.render(&Value::Map(Default::default())).unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "2");
        }
    }
}
