//! Parsing lexed segments into the template AST.

use super::expr::{Cond, Expr, Operand};
use super::lexer::{Segment, SegmentKind, Token, lex_tokens};
use crate::TemplateError;
use crate::registry::Extensions;

/// One parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Expr),
    If {
        cond: Cond,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    For {
        var: String,
        iterable: Operand,
        body: Vec<Node>,
    },
    Tag(TagInvocation),
}

/// A registered tag call with its pre-lexed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TagInvocation {
    pub name: String,
    pub tokens: Vec<Token>,
    /// Raw argument text after the tag name, used by tags that run their own
    /// tokenizer (`calc`).
    pub raw: String,
    pub line: usize,
}

fn parse_error(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Parse {
        line,
        message: message.into(),
    }
}

/// Parse segments into a node tree, validating tag names against the
/// registry so unknown tags fail at parse time.
pub fn parse(segments: Vec<Segment>, extensions: &Extensions) -> Result<Vec<Node>, TemplateError> {
    let mut cursor = segments.into_iter().peekable();
    let nodes = parse_block(&mut cursor, extensions, None)?;
    Ok(nodes)
}

/// Parse nodes until one of the terminator tag names (or end of input when
/// no terminator is expected). The terminator segment is left in the cursor
/// for the caller to consume.
fn parse_block(
    cursor: &mut std::iter::Peekable<std::vec::IntoIter<Segment>>,
    extensions: &Extensions,
    terminators: Option<&[&str]>,
) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();

    while let Some(segment) = cursor.peek() {
        let line = segment.line;
        match &segment.kind {
            SegmentKind::Comment => {
                cursor.next();
            }
            SegmentKind::Text(_) => {
                let Some(Segment {
                    kind: SegmentKind::Text(text),
                    ..
                }) = cursor.next()
                else {
                    unreachable!("peeked a text segment");
                };
                nodes.push(Node::Text(text));
            }
            SegmentKind::Output(content) => {
                let tokens =
                    lex_tokens(content).map_err(|message| parse_error(line, message))?;
                let expr = Expr::parse(&tokens).map_err(|message| parse_error(line, message))?;
                nodes.push(Node::Output(expr));
                cursor.next();
            }
            SegmentKind::Tag(content) => {
                let name = content.split_whitespace().next().unwrap_or_default().to_string();
                if let Some(terminators) = terminators {
                    if terminators.contains(&name.as_str()) {
                        return Ok(nodes);
                    }
                }
                let content = content.clone();
                cursor.next();
                nodes.push(parse_tag(&name, &content, line, cursor, extensions)?);
            }
        }
    }

    if terminators.is_some() {
        return Err(parse_error(0, "unexpected end of template inside a block"));
    }
    Ok(nodes)
}

fn parse_tag(
    name: &str,
    content: &str,
    line: usize,
    cursor: &mut std::iter::Peekable<std::vec::IntoIter<Segment>>,
    extensions: &Extensions,
) -> Result<Node, TemplateError> {
    let rest = content[name.len()..].trim().to_string();
    match name {
        "for" => {
            let tokens = lex_tokens(&rest).map_err(|m| parse_error(line, m))?;
            let [Token::Word(var), Token::Word(kw), Token::Word(path)] = tokens.as_slice() else {
                return Err(parse_error(line, "expected: for <var> in <path>"));
            };
            if kw != "in" {
                return Err(parse_error(line, "expected: for <var> in <path>"));
            }
            let body = parse_block(cursor, extensions, Some(&["endfor"]))?;
            expect_terminator(cursor, "endfor", line)?;
            Ok(Node::For {
                var: var.clone(),
                iterable: Operand::Path(path.clone()),
                body,
            })
        }
        "if" => {
            let tokens = lex_tokens(&rest).map_err(|m| parse_error(line, m))?;
            let cond = Cond::parse(&tokens).map_err(|m| parse_error(line, m))?;
            let then_body = parse_block(cursor, extensions, Some(&["else", "endif"]))?;
            let else_body = if peek_tag_is(cursor, "else") {
                cursor.next();
                let body = parse_block(cursor, extensions, Some(&["endif"]))?;
                expect_terminator(cursor, "endif", line)?;
                body
            } else {
                expect_terminator(cursor, "endif", line)?;
                Vec::new()
            };
            Ok(Node::If {
                cond,
                then_body,
                else_body,
            })
        }
        "endfor" | "endif" | "else" => Err(parse_error(line, format!("unexpected {name:?}"))),
        _ => {
            if !extensions.has_tag(name) {
                return Err(parse_error(line, format!("unknown tag {name:?}")));
            }
            let tokens = lex_tokens(&rest).map_err(|m| parse_error(line, m))?;
            Ok(Node::Tag(TagInvocation {
                name: name.to_string(),
                tokens,
                raw: rest,
                line,
            }))
        }
    }
}

fn peek_tag_is(
    cursor: &mut std::iter::Peekable<std::vec::IntoIter<Segment>>,
    name: &str,
) -> bool {
    matches!(
        cursor.peek(),
        Some(Segment {
            kind: SegmentKind::Tag(content),
            ..
        }) if content.split_whitespace().next() == Some(name)
    )
}

fn expect_terminator(
    cursor: &mut std::iter::Peekable<std::vec::IntoIter<Segment>>,
    name: &str,
    line: usize,
) -> Result<(), TemplateError> {
    if peek_tag_is(cursor, name) {
        cursor.next();
        Ok(())
    } else {
        Err(parse_error(line, format!("missing {{% {name} %}}")))
    }
}
