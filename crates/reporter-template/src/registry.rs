//! Process-global extension registry.
//!
//! Filters and tags register once per process. Explicit re-registration is
//! refused rather than ignored; parsing goes through a fresh
//! [`crate::TemplateSet`] per template, so the registry itself is the only
//! shared state and it is immutable after initialization.

use std::collections::HashMap;
use std::sync::OnceLock;

use reporter_model::Value;

use crate::TemplateError;
use crate::engine::parser::TagInvocation;
use crate::engine::render::RenderState;
use crate::{filters, tags};

pub type FilterFn = fn(&Value, Option<&Value>) -> Result<Value, TemplateError>;
pub type TagFn = fn(&TagInvocation, &mut RenderState<'_>) -> Result<String, TemplateError>;

/// The single set of registered filters and tags.
pub struct Extensions {
    filters: HashMap<&'static str, FilterFn>,
    tags: HashMap<&'static str, TagFn>,
}

impl Extensions {
    fn build() -> Self {
        let mut f: HashMap<&'static str, FilterFn> = HashMap::new();
        f.insert("replace", filters::replace);
        f.insert("where", filters::where_);
        f.insert("sum", filters::sum);
        f.insert("count", filters::count);
        f.insert("percent_of", filters::percent_of);
        f.insert("slice_str", filters::slice_str);
        f.insert("strip_zeros", filters::strip_zeros);
        f.insert("xmlattr", filters::xmlattr);
        f.insert("xmlcontent", filters::xmlcontent);

        let mut t: HashMap<&'static str, TagFn> = HashMap::new();
        t.insert("sum_by", tags::aggregate::sum_by);
        t.insert("avg_by", tags::aggregate::avg_by);
        t.insert("min_by", tags::aggregate::min_by);
        t.insert("max_by", tags::aggregate::max_by);
        t.insert("count_by", tags::aggregate::count_by);
        t.insert("calc", tags::calc::calc);
        t.insert("date_time", tags::datetime::date_time);
        t.insert("counter", tags::counter::counter);
        t.insert("counter_show", tags::counter::counter_show);
        t.insert("last_item_by_group", tags::group::last_item_by_group);
        t.insert("aggregate_balance", tags::balance::aggregate_balance);

        Self { filters: f, tags: t }
    }

    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    pub fn tag(&self, name: &str) -> Option<TagFn> {
        self.tags.get(name).copied()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

static EXTENSIONS: OnceLock<Extensions> = OnceLock::new();

/// Registry accessor used by template sets; initializes on first use.
pub(crate) fn extensions() -> &'static Extensions {
    EXTENSIONS.get_or_init(Extensions::build)
}

/// Explicit one-time registration. A second call is refused so accidental
/// double-initialization surfaces instead of being silently ignored.
pub fn register_extensions() -> Result<(), TemplateError> {
    let mut initialized_now = false;
    EXTENSIONS.get_or_init(|| {
        initialized_now = true;
        Extensions::build()
    });
    if initialized_now {
        Ok(())
    } else {
        Err(TemplateError::AlreadyRegistered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_extensions() {
        let ext = extensions();
        assert!(ext.filter("replace").is_some());
        assert!(ext.filter("missing").is_none());
        assert!(ext.has_tag("calc"));
        assert!(ext.has_tag("aggregate_balance"));
        assert!(!ext.has_tag("missing"));
    }

    #[test]
    fn test_double_registration_is_refused() {
        // The registry may already be initialized by another test; either
        // the first call or both calls must report AlreadyRegistered.
        let first = register_extensions();
        let second = register_extensions();
        assert_eq!(second, Err(TemplateError::AlreadyRegistered));
        if first.is_err() {
            assert_eq!(first, Err(TemplateError::AlreadyRegistered));
        }
    }
}
