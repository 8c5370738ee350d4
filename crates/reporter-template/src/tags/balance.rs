//! `{% aggregate_balance coll by "balance" group_by "f" order_by "d" [if cond] as var %}`
//!
//! Balance aggregation over movement-style rows: elements are grouped by
//! the primary field, sub-grouped by `account_id | route_id | id |
//! "_default_"`, the latest record of each sub-group is selected by date,
//! and the nominated balance field is summed across sub-groups. The result
//! rows (`{group, total}` ordered by group) are bound to `var`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reporter_model::Value;
use rust_decimal::Decimal;

use super::group::{order_date, split_binding};
use super::{MAX_COLLECTION_ITEMS, item_matches, resolve_collection, split_condition, tag_error};
use crate::TemplateError;
use crate::engine::lexer::Token;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;

const SUB_GROUP_FIELDS: &[&str] = &["account_id", "route_id", "id"];
const DEFAULT_SUB_GROUP: &str = "_default_";

fn sub_group_key(item: &Value) -> String {
    for field in SUB_GROUP_FIELDS {
        if let Some(value) = item.lookup_path(field) {
            if !value.is_null() {
                return value.to_string();
            }
        }
    }
    DEFAULT_SUB_GROUP.to_string()
}

pub fn aggregate_balance(
    invocation: &TagInvocation,
    state: &mut RenderState<'_>,
) -> Result<String, TemplateError> {
    let (tokens, var) = split_binding(invocation, &invocation.tokens)?;
    let (args, cond) = split_condition(invocation, &tokens)?;
    let [
        Token::Word(collection),
        Token::Word(by_kw),
        Token::Str(balance_field),
        Token::Word(group_kw),
        Token::Str(group_field),
        Token::Word(order_kw),
        Token::Str(date_field),
    ] = args.as_slice()
    else {
        return Err(tag_error(
            invocation,
            "expected: <coll> by \"balance\" group_by \"field\" order_by \"date\" [if cond] as <var>",
        ));
    };
    if by_kw != "by" || group_kw != "group_by" || order_kw != "order_by" {
        return Err(tag_error(
            invocation,
            "expected the keywords \"by\", \"group_by\" and \"order_by\"",
        ));
    }

    let items = resolve_collection(state, collection);
    if items.len() > MAX_COLLECTION_ITEMS {
        return Err(tag_error(
            invocation,
            format!("collection exceeds {MAX_COLLECTION_ITEMS} elements"),
        ));
    }

    // group → sub-group → latest element by date.
    let mut groups: IndexMap<String, IndexMap<String, (DateTime<Utc>, Value)>> = IndexMap::new();
    for item in items {
        if !item_matches(cond.as_ref(), state, &item) {
            continue;
        }
        let group = item
            .lookup_path(group_field)
            .map(|value| value.to_string())
            .unwrap_or_default();
        let sub_group = sub_group_key(&item);
        let date = order_date(&item, date_field);

        let sub_groups = groups.entry(group).or_default();
        match sub_groups.get(&sub_group) {
            Some((existing, _)) if *existing > date => {}
            _ => {
                sub_groups.insert(sub_group, (date, item));
            }
        }
    }

    let mut rows: Vec<(String, Decimal)> = groups
        .into_iter()
        .map(|(group, sub_groups)| {
            let total = sub_groups
                .values()
                .filter_map(|(_, item)| item.lookup_path(balance_field))
                .filter_map(Value::to_decimal)
                .sum::<Decimal>();
            (group, total)
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let result = Value::Array(
        rows.into_iter()
            .map(|(group, total)| {
                let mut row = IndexMap::new();
                row.insert("group".to_string(), Value::String(group));
                row.insert("total".to_string(), Value::Decimal(total.normalize()));
                Value::Map(row)
            })
            .collect(),
    );
    state.set_var(&var, result);
    Ok(String::new())
}
