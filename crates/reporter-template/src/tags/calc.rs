//! `{% calc <expr> %}` — decimal-safe inline arithmetic.
//!
//! Grammar, tightest first: `**`, then `*` `/`, then `+` `-`, with unary
//! minus and parentheses. Operands are numeric literals and dotted variable
//! references, resolved against the loop-private scope first and the public
//! context second; unresolved identifiers evaluate to zero.

use reporter_model::Value;
use rust_decimal::Decimal;

use super::tag_error;
use crate::TemplateError;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;
use crate::numeric::{self, format_decimal};

#[derive(Debug, Clone, PartialEq)]
enum CalcToken {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<CalcToken>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(CalcToken::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(CalcToken::Minus);
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(CalcToken::Power);
                } else {
                    tokens.push(CalcToken::Star);
                }
            }
            '/' => {
                chars.next();
                tokens.push(CalcToken::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(CalcToken::Open);
            }
            ')' => {
                chars.next();
                tokens.push(CalcToken::Close);
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse::<Decimal>()
                    .map_err(|_| format!("invalid number {number:?}"))?;
                tokens.push(CalcToken::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '.' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(CalcToken::Ident(ident));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [CalcToken],
    pos: usize,
    state: &'a RenderState<'a>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a CalcToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a CalcToken> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Decimal, TemplateError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(CalcToken::Plus) => {
                    self.next();
                    value += self.term()?;
                }
                Some(CalcToken::Minus) => {
                    self.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Decimal, TemplateError> {
        let mut value = self.power()?;
        loop {
            match self.peek() {
                Some(CalcToken::Star) => {
                    self.next();
                    value *= self.power()?;
                }
                Some(CalcToken::Slash) => {
                    self.next();
                    let divisor = self.power()?;
                    if divisor.is_zero() {
                        return Err(TemplateError::arithmetic("division by zero"));
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // Right-associative: 2 ** 3 ** 2 is 2 ** (3 ** 2).
    fn power(&mut self) -> Result<Decimal, TemplateError> {
        let base = self.unary()?;
        if matches!(self.peek(), Some(CalcToken::Power)) {
            self.next();
            let exponent = self.power()?;
            return numeric::pow(base, exponent);
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Decimal, TemplateError> {
        if matches!(self.peek(), Some(CalcToken::Minus)) {
            self.next();
            return Ok(-self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Decimal, TemplateError> {
        match self.next() {
            Some(CalcToken::Number(value)) => Ok(*value),
            Some(CalcToken::Ident(path)) => {
                let resolved = self.state.resolve(path);
                Ok(resolved
                    .as_ref()
                    .and_then(Value::to_decimal)
                    .unwrap_or(Decimal::ZERO))
            }
            Some(CalcToken::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(CalcToken::Close) => Ok(value),
                    _ => Err(TemplateError::arithmetic("missing closing parenthesis")),
                }
            }
            other => Err(TemplateError::arithmetic(format!(
                "unexpected token {other:?}"
            ))),
        }
    }
}

pub fn calc(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let tokens = tokenize(&invocation.raw).map_err(|message| tag_error(invocation, message))?;
    if tokens.is_empty() {
        return Err(tag_error(invocation, "empty expression"));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        state: &*state,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(TemplateError::arithmetic("trailing tokens in expression"));
    }
    Ok(format_decimal(value))
}
