//! Render state: scope chain, path resolution and render-scoped counters.

use std::collections::HashMap;

use indexmap::IndexMap;
use reporter_model::Value;

/// Mutable state for one render pass.
///
/// Dotted paths resolve against loop-private scopes first (innermost wins),
/// then the public render context. Counter storage lives here — never in
/// process-global state — so concurrent renders are isolated by
/// construction.
pub struct RenderState<'a> {
    root: &'a Value,
    scopes: Vec<IndexMap<String, Value>>,
    counters: HashMap<String, i64>,
}

impl<'a> RenderState<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            // Base scope holds `as var` bindings made outside any loop.
            scopes: vec![IndexMap::new()],
            counters: HashMap::new(),
        }
    }

    /// Resolve a dotted path: scopes innermost-first, then the root context.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(head) {
                return match rest {
                    Some(rest) => value.lookup_path(rest).cloned(),
                    None => Some(value.clone()),
                };
            }
        }
        self.root.lookup_path(path).cloned()
    }

    pub fn push_scope(&mut self, scope: IndexMap<String, Value>) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind a variable in the innermost scope (`as var` results).
    pub fn set_var(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Increment a named counter, returning the new value.
    pub fn counter_increment(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Sum of the named counters; unknown names count as zero.
    pub fn counter_total(&self, names: impl IntoIterator<Item = impl AsRef<str>>) -> i64 {
        names
            .into_iter()
            .map(|name| self.counters.get(name.as_ref()).copied().unwrap_or(0))
            .sum()
    }
}
