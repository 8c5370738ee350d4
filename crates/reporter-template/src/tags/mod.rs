//! Built-in reporting tags.

pub mod aggregate;
pub mod balance;
pub mod calc;
pub mod counter;
pub mod datetime;
pub mod group;

use indexmap::IndexMap;
use reporter_model::Value;

use crate::TemplateError;
use crate::engine::lexer::Token;
use crate::engine::expr::Cond;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;

/// Guard against pathological collection sizes in grouping tags.
pub const MAX_COLLECTION_ITEMS: usize = 100_000;

pub(crate) fn tag_error(invocation: &TagInvocation, message: impl Into<String>) -> TemplateError {
    TemplateError::render(format!("tag {:?}: {}", invocation.name, message.into()))
}

/// Split an argument token list at a top-level `if`, parsing the remainder
/// as the element condition.
pub(crate) fn split_condition(
    invocation: &TagInvocation,
    tokens: &[Token],
) -> Result<(Vec<Token>, Option<Cond>), TemplateError> {
    match tokens
        .iter()
        .position(|token| matches!(token, Token::Word(w) if w == "if"))
    {
        Some(at) => {
            let cond = Cond::parse(&tokens[at + 1..])
                .map_err(|message| tag_error(invocation, message))?;
            Ok((tokens[..at].to_vec(), Some(cond)))
        }
        None => Ok((tokens.to_vec(), None)),
    }
}

/// Resolve a collection path to its items; missing or non-sequence values
/// are an empty collection.
pub(crate) fn resolve_collection(state: &RenderState<'_>, path: &str) -> Vec<Value> {
    match state.resolve(path) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Evaluate an element condition with the element's fields in scope.
pub(crate) fn item_matches(cond: Option<&Cond>, state: &mut RenderState<'_>, item: &Value) -> bool {
    let Some(cond) = cond else {
        return true;
    };
    let scope: IndexMap<String, Value> = match item {
        Value::Map(entries) => entries.clone(),
        _ => IndexMap::new(),
    };
    state.push_scope(scope);
    let matched = cond.eval(state);
    state.pop_scope();
    matched
}

/// First string token, for tags taking a single quoted argument.
pub(crate) fn single_string(
    invocation: &TagInvocation,
    tokens: &[Token],
) -> Result<String, TemplateError> {
    match tokens {
        [Token::Str(s)] => Ok(s.clone()),
        _ => Err(tag_error(invocation, "expected one quoted argument")),
    }
}
