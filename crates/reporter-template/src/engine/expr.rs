//! Expressions and conditions: parsing over token streams, evaluation
//! against the render state.

use reporter_model::Value;
use rust_decimal::Decimal;

use super::lexer::Token;
use super::render::RenderState;
use crate::TemplateError;
use crate::registry::Extensions;

/// A literal or a dotted path resolved at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Path(String),
}

impl Operand {
    /// Interpret a bare word: boolean and numeric literals win over paths.
    pub fn from_word(word: &str) -> Operand {
        match word {
            "true" => return Operand::Literal(Value::Bool(true)),
            "false" => return Operand::Literal(Value::Bool(false)),
            "null" => return Operand::Literal(Value::Null),
            _ => {}
        }
        if let Ok(i) = word.parse::<i64>() {
            return Operand::Literal(Value::Int(i));
        }
        if word.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-')
            && word.parse::<Decimal>().is_ok()
        {
            return Operand::Literal(Value::Decimal(word.parse().expect("checked above")));
        }
        Operand::Path(word.to_string())
    }

    /// Resolve against the render state; unresolved paths yield `Null`.
    pub fn eval(&self, state: &RenderState<'_>) -> Value {
        match self {
            Operand::Literal(value) => value.clone(),
            Operand::Path(path) => state.resolve(path).unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<Operand>,
}

/// An output expression: a base operand piped through filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub base: Operand,
    pub filters: Vec<FilterCall>,
}

impl Expr {
    /// Parse a full token slice as one expression.
    pub fn parse(tokens: &[Token]) -> Result<Expr, String> {
        let mut stream = TokenStream::new(tokens);
        let expr = Self::parse_stream(&mut stream)?;
        if !stream.is_done() {
            return Err("unexpected trailing tokens in expression".to_string());
        }
        Ok(expr)
    }

    fn parse_stream(stream: &mut TokenStream<'_>) -> Result<Expr, String> {
        let base = stream.operand()?;
        let mut filters = Vec::new();
        while stream.eat_op("|") {
            let name = stream.word()?;
            let arg = if stream.eat_op("(") {
                let arg = stream.operand()?;
                stream.expect_op(")")?;
                Some(arg)
            } else {
                None
            };
            filters.push(FilterCall { name, arg });
        }
        Ok(Expr { base, filters })
    }

    pub fn eval(
        &self,
        state: &RenderState<'_>,
        extensions: &Extensions,
    ) -> Result<Value, TemplateError> {
        let mut value = self.base.eval(state);
        for call in &self.filters {
            let filter = extensions
                .filter(&call.name)
                .ok_or_else(|| TemplateError::render(format!("unknown filter {:?}", call.name)))?;
            let arg = call.arg.as_ref().map(|operand| operand.eval(state));
            value = filter(&value, arg.as_ref())?;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A boolean condition over the render state.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Truthy(Operand),
    Not(Box<Cond>),
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}

impl Cond {
    pub fn parse(tokens: &[Token]) -> Result<Cond, String> {
        let mut stream = TokenStream::new(tokens);
        let cond = parse_or(&mut stream)?;
        if !stream.is_done() {
            return Err("unexpected trailing tokens in condition".to_string());
        }
        Ok(cond)
    }

    pub fn eval(&self, state: &RenderState<'_>) -> bool {
        match self {
            Cond::Truthy(operand) => truthy(&operand.eval(state)),
            Cond::Not(inner) => !inner.eval(state),
            Cond::Compare { lhs, op, rhs } => compare(&lhs.eval(state), *op, &rhs.eval(state)),
            Cond::And(a, b) => a.eval(state) && b.eval(state),
            Cond::Or(a, b) => a.eval(state) || b.eval(state),
        }
    }
}

fn parse_or(stream: &mut TokenStream<'_>) -> Result<Cond, String> {
    let mut cond = parse_and(stream)?;
    while stream.eat_word("or") {
        let rhs = parse_and(stream)?;
        cond = Cond::Or(Box::new(cond), Box::new(rhs));
    }
    Ok(cond)
}

fn parse_and(stream: &mut TokenStream<'_>) -> Result<Cond, String> {
    let mut cond = parse_not(stream)?;
    while stream.eat_word("and") {
        let rhs = parse_not(stream)?;
        cond = Cond::And(Box::new(cond), Box::new(rhs));
    }
    Ok(cond)
}

fn parse_not(stream: &mut TokenStream<'_>) -> Result<Cond, String> {
    if stream.eat_word("not") {
        return Ok(Cond::Not(Box::new(parse_not(stream)?)));
    }
    if stream.eat_op("(") {
        let inner = parse_or(stream)?;
        stream.expect_op(")")?;
        return Ok(inner);
    }
    let lhs = stream.operand()?;
    let op = match stream.peek_op() {
        Some("==") => Some(CompareOp::Eq),
        Some("!=") => Some(CompareOp::Ne),
        Some(">") => Some(CompareOp::Gt),
        Some(">=") => Some(CompareOp::Ge),
        Some("<") => Some(CompareOp::Lt),
        Some("<=") => Some(CompareOp::Le),
        _ => None,
    };
    match op {
        Some(op) => {
            stream.next();
            let rhs = stream.operand()?;
            Ok(Cond::Compare { lhs, op, rhs })
        }
        None => Ok(Cond::Truthy(lhs)),
    }
}

/// Comparison is numeric when both sides coerce, textual otherwise.
fn compare(lhs: &Value, op: CompareOp, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (lhs.to_decimal(), rhs.to_decimal()) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
        };
    }
    let (a, b) = (lhs.to_string(), rhs.to_string());
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Decimal(d) => !d.is_zero(),
        Value::String(s) => !s.is_empty(),
        Value::DateTime(_) => true,
        Value::Bytes(b) => !b.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Map(entries) => !entries.is_empty(),
    }
}

/// Cursor over a token slice.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Op(op)) => Some(op.as_str()),
            _ => None,
        }
    }

    pub fn eat_op(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_op(&mut self, op: &str) -> Result<(), String> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(format!("expected {op:?}, got {:?}", self.peek()))
        }
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn word(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w.clone()),
            other => Err(format!("expected a word, got {other:?}")),
        }
    }

    pub fn operand(&mut self) -> Result<Operand, String> {
        match self.next() {
            Some(Token::Word(word)) => Ok(Operand::from_word(word)),
            Some(Token::Str(literal)) => Ok(Operand::Literal(Value::String(literal.clone()))),
            other => Err(format!("expected an operand, got {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lexer::lex_tokens;

    fn state_with(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_operand_literals() {
        assert_eq!(Operand::from_word("true"), Operand::Literal(Value::Bool(true)));
        assert_eq!(Operand::from_word("42"), Operand::Literal(Value::Int(42)));
        assert_eq!(
            Operand::from_word("2.5"),
            Operand::Literal(Value::Decimal("2.5".parse().unwrap()))
        );
        assert_eq!(
            Operand::from_word("a.b.0"),
            Operand::Path("a.b.0".to_string())
        );
    }

    #[test]
    fn test_expr_parse_with_filters() {
        let tokens = lex_tokens(r#"row.name | replace("a:b") | strip_zeros"#).unwrap();
        let expr = Expr::parse(&tokens).unwrap();
        assert_eq!(expr.base, Operand::Path("row.name".to_string()));
        assert_eq!(expr.filters.len(), 2);
        assert_eq!(expr.filters[0].name, "replace");
        assert_eq!(
            expr.filters[0].arg,
            Some(Operand::Literal(Value::from("a:b")))
        );
        assert_eq!(expr.filters[1].arg, None);
    }

    #[test]
    fn test_cond_parse_and_eval() {
        let root = state_with(r#"{"status": "active", "count": 3}"#);
        let state = RenderState::new(&root);

        let cond = Cond::parse(&lex_tokens(r#"status == "active""#).unwrap()).unwrap();
        assert!(cond.eval(&state));

        let cond = Cond::parse(&lex_tokens("count >= 2 and count < 10").unwrap()).unwrap();
        assert!(cond.eval(&state));

        let cond = Cond::parse(&lex_tokens(r#"not status == "active""#).unwrap()).unwrap();
        assert!(!cond.eval(&state));

        let cond = Cond::parse(&lex_tokens("missing").unwrap()).unwrap();
        assert!(!cond.eval(&state));
    }

    #[test]
    fn test_numeric_comparison_coerces_strings() {
        let root = state_with(r#"{"amount": "1500.25"}"#);
        let state = RenderState::new(&root);
        let cond = Cond::parse(&lex_tokens("amount > 1000").unwrap()).unwrap();
        assert!(cond.eval(&state));
    }
}
