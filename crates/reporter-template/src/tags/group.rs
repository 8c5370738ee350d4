//! `{% last_item_by_group coll group_by "f1[,f2]" order_by "fd" [if cond] as var %}`
//!
//! Groups a collection by one or more dotted fields (composite keys are
//! `|`-joined), optionally filters elements, orders ascending by a date
//! field and keeps the last element of each group. The result, sorted by
//! composite key, is bound to `var`; the tag itself renders nothing.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reporter_model::Value;

use super::{MAX_COLLECTION_ITEMS, item_matches, resolve_collection, split_condition, tag_error};
use crate::TemplateError;
use crate::engine::expr::Cond;
use crate::engine::lexer::Token;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;
use crate::numeric::parse_order_date;

pub(crate) struct GroupSpec {
    pub collection: String,
    pub group_fields: Vec<String>,
    pub order_field: String,
    pub cond: Option<Cond>,
    pub var: String,
}

/// Parse the trailing `as var` pair off a token list.
pub(crate) fn split_binding(
    invocation: &TagInvocation,
    tokens: &[Token],
) -> Result<(Vec<Token>, String), TemplateError> {
    match tokens {
        [rest @ .., Token::Word(kw), Token::Word(var)] if kw == "as" => {
            Ok((rest.to_vec(), var.clone()))
        }
        _ => Err(tag_error(invocation, "expected a trailing \"as <var>\"")),
    }
}

pub(crate) fn composite_key(item: &Value, fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| {
            item.lookup_path(field)
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("|")
}

pub(crate) fn order_date(item: &Value, field: &str) -> DateTime<Utc> {
    item.lookup_path(field)
        .and_then(parse_order_date)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_spec(invocation: &TagInvocation) -> Result<GroupSpec, TemplateError> {
    let (tokens, var) = split_binding(invocation, &invocation.tokens)?;
    let (args, cond) = split_condition(invocation, &tokens)?;
    let [
        Token::Word(collection),
        Token::Word(group_kw),
        Token::Str(group_fields),
        Token::Word(order_kw),
        Token::Str(order_field),
    ] = args.as_slice()
    else {
        return Err(tag_error(
            invocation,
            "expected: <coll> group_by \"fields\" order_by \"field\" [if cond] as <var>",
        ));
    };
    if group_kw != "group_by" || order_kw != "order_by" {
        return Err(tag_error(
            invocation,
            "expected the keywords \"group_by\" and \"order_by\"",
        ));
    }

    Ok(GroupSpec {
        collection: collection.clone(),
        group_fields: group_fields.split(',').map(|f| f.trim().to_string()).collect(),
        order_field: order_field.clone(),
        cond,
        var,
    })
}

pub fn last_item_by_group(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let spec = parse_spec(invocation)?;
    let items = resolve_collection(state, &spec.collection);
    if items.len() > MAX_COLLECTION_ITEMS {
        return Err(tag_error(
            invocation,
            format!("collection exceeds {MAX_COLLECTION_ITEMS} elements"),
        ));
    }

    // Per group, keep the element with the latest order date; on equal
    // dates the later element wins, matching an ascending stable sort.
    let mut latest: IndexMap<String, (DateTime<Utc>, Value)> = IndexMap::new();
    for item in items {
        if !item_matches(spec.cond.as_ref(), state, &item) {
            continue;
        }
        let key = composite_key(&item, &spec.group_fields);
        let date = order_date(&item, &spec.order_field);
        match latest.get(&key) {
            Some((existing, _)) if *existing > date => {}
            _ => {
                latest.insert(key, (date, item));
            }
        }
    }

    let mut entries: Vec<(String, Value)> = latest
        .into_iter()
        .map(|(key, (_, item))| (key, item))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let result = Value::Array(entries.into_iter().map(|(_, item)| item).collect());
    state.set_var(&spec.var, result);
    Ok(String::new())
}
