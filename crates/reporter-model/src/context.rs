//! Render context assembled by the fan-out step.

use indexmap::IndexMap;

use crate::value::{Row, Value};

/// Nested `source → table → rows` mapping handed to the template engine.
///
/// Built during fan-out and discarded after render. Merging is append-only;
/// a source section that stays empty (unknown source, no rows) simply renders
/// as empty fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    sections: IndexMap<String, IndexMap<String, Vec<Row>>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows under `source → table`, preserving existing rows.
    pub fn append_rows(&mut self, source: &str, table: &str, rows: Vec<Row>) {
        self.sections
            .entry(source.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, source: &str, table: &str) -> Option<&Vec<Row>> {
        self.sections.get(source)?.get(table)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Collapse into the [`Value`] tree the template engine resolves paths
    /// against: `source.table` is an array of row maps.
    pub fn into_value(self) -> Value {
        let mut root = IndexMap::new();
        for (source, tables) in self.sections {
            let mut section = IndexMap::new();
            for (table, rows) in tables {
                let rows = rows.into_iter().map(Value::Map).collect::<Vec<_>>();
                section.insert(table, Value::Array(rows));
            }
            root.insert(source, Value::Map(section));
        }
        Value::Map(root)
    }
}
