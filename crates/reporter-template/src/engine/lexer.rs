//! Template lexing: source text into segments, span content into tokens.

use crate::TemplateError;

/// One top-level piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    Text(String),
    /// `{{ ... }}` content.
    Output(String),
    /// `{% ... %}` content.
    Tag(String),
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub line: usize,
}

/// Split template source into text, output, tag and comment segments.
pub fn lex(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut line = 1;

    loop {
        let next = ["{{", "{%", "{#"]
            .iter()
            .filter_map(|open| rest.find(open).map(|at| (at, *open)))
            .min();
        let Some((start, open)) = next else {
            if !rest.is_empty() {
                segments.push(Segment {
                    kind: SegmentKind::Text(rest.to_string()),
                    line,
                });
            }
            break;
        };

        if start > 0 {
            let text = &rest[..start];
            segments.push(Segment {
                kind: SegmentKind::Text(text.to_string()),
                line,
            });
            line += text.matches('\n').count();
        }

        let close = match open {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let body_start = start + 2;
        let Some(end_rel) = rest[body_start..].find(close) else {
            return Err(TemplateError::Parse {
                line,
                message: format!("unclosed {open} span"),
            });
        };
        let content = &rest[body_start..body_start + end_rel];

        let kind = match open {
            "{{" => SegmentKind::Output(content.trim().to_string()),
            "{%" => SegmentKind::Tag(content.trim().to_string()),
            _ => SegmentKind::Comment,
        };
        segments.push(Segment { kind, line });

        line += content.matches('\n').count();
        rest = &rest[body_start + end_rel + 2..];
    }

    Ok(segments)
}

/// A token inside an output expression, tag or condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, dotted path, number or keyword.
    Word(String),
    /// Double-quoted string literal, quotes stripped.
    Str(String),
    /// Operator or punctuation: `== != >= <= > < ( ) | ,`.
    Op(String),
}

/// Tokenize span content. Quoted strings keep their exact content; words
/// carry dots so paths stay whole.
pub fn lex_tokens(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(other) => literal.push(other),
                    None => return Err("unterminated string literal".to_string()),
                }
            }
            tokens.push(Token::Str(literal));
        } else if matches!(c, '=' | '!' | '<' | '>') {
            chars.next();
            let mut op = c.to_string();
            if chars.peek() == Some(&'=') {
                chars.next();
                op.push('=');
            }
            if op == "=" || op == "!" {
                return Err(format!("unexpected operator {op:?}"));
            }
            tokens.push(Token::Op(op));
        } else if matches!(c, '(' | ')' | '|' | ',') {
            chars.next();
            tokens.push(Token::Op(c.to_string()));
        } else {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if w.is_whitespace() || matches!(w, '"' | '=' | '!' | '<' | '>' | '(' | ')' | '|' | ',') {
                    break;
                }
                word.push(w);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_segments() {
        let segments = lex("Hello {{ name }}!{# note #}{% if x %}y{% endif %}").unwrap();
        assert_eq!(segments[0].kind, SegmentKind::Text("Hello ".to_string()));
        assert_eq!(segments[1].kind, SegmentKind::Output("name".to_string()));
        assert_eq!(segments[2].kind, SegmentKind::Text("!".to_string()));
        assert_eq!(segments[3].kind, SegmentKind::Comment);
        assert_eq!(segments[4].kind, SegmentKind::Tag("if x".to_string()));
    }

    #[test]
    fn test_lex_tracks_lines() {
        let segments = lex("a\nb\n{{ x }}").unwrap();
        assert_eq!(segments[1].line, 3);
    }

    #[test]
    fn test_unclosed_span_is_a_parse_error() {
        let err = lex("text {{ broken").unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_lex_tokens_words_strings_ops() {
        let tokens = lex_tokens(r#"sum_by rows by "amount" if status == "active""#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("sum_by".to_string()),
                Token::Word("rows".to_string()),
                Token::Word("by".to_string()),
                Token::Str("amount".to_string()),
                Token::Word("if".to_string()),
                Token::Word("status".to_string()),
                Token::Op("==".to_string()),
                Token::Str("active".to_string()),
            ]
        );
    }

    #[test]
    fn test_lex_tokens_filter_call() {
        let tokens = lex_tokens(r#"row.name | replace("a:b") | strip_zeros"#).unwrap();
        assert_eq!(tokens[0], Token::Word("row.name".to_string()));
        assert_eq!(tokens[1], Token::Op("|".to_string()));
        assert_eq!(tokens[2], Token::Word("replace".to_string()));
        assert_eq!(tokens[3], Token::Op("(".to_string()));
        assert_eq!(tokens[4], Token::Str("a:b".to_string()));
        assert_eq!(tokens[5], Token::Op(")".to_string()));
    }

    #[test]
    fn test_lex_tokens_comparisons_without_spaces() {
        let tokens = lex_tokens("count>=2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("count".to_string()),
                Token::Op(">=".to_string()),
                Token::Word("2".to_string()),
            ]
        );
    }
}
