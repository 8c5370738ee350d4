//! `{% date_time "<layout>" %}` — current time with friendly layout tokens.

use chrono::Utc;

use super::single_string;
use crate::TemplateError;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;

/// Translate layout tokens (`YYYY MM dd HH mm ss`) into a strftime format.
///
/// `MM` is replaced before `mm` so month and minute never collide.
fn translate_layout(layout: &str) -> String {
    layout
        .replace("YYYY", "%Y")
        .replace("MM", "%m")
        .replace("dd", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}

pub fn date_time(
    invocation: &TagInvocation,
    _state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let layout = single_string(invocation, &invocation.tokens)?;
    let format = translate_layout(&layout);
    Ok(Utc::now().format(&format).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TemplateSet;
    use reporter_model::Value;

    #[test]
    fn test_translate_layout() {
        assert_eq!(translate_layout("YYYY-MM-dd"), "%Y-%m-%d");
        assert_eq!(translate_layout("dd/MM/YYYY HH:mm:ss"), "%d/%m/%Y %H:%M:%S");
        assert_eq!(translate_layout("literal"), "literal");
    }

    #[test]
    fn test_renders_current_date_shape() {
        let out = TemplateSet::new()
            .parse(r#"{% date_time "YYYY-MM-dd" %}"#)
            .unwrap()
            .render(&Value::Map(Default::default()))
            .unwrap();
        // 2026-08-01 style: ten characters, dashes in the right places.
        assert_eq!(out.len(), 10);
        assert_eq!(&out[4..5], "-");
        assert_eq!(&out[7..8], "-");
        assert!(out[..4].chars().all(|c| c.is_ascii_digit()));
    }
}
