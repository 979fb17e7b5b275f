use toml::{Table, Value};

use crate::types::Layer;

/// Sparse layers searched in order; the first layer defining a key wins.
///
/// Nothing is merged destructively. A key absent from a higher layer falls
/// through to the next one, so a layer can never mask a lower one with a
/// placeholder.
#[derive(Debug, Default)]
pub struct LayerStack<'a> {
    layers: Vec<(Layer, &'a Table)>,
}

impl<'a> LayerStack<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer below the ones already pushed.
    pub fn push(mut self, layer: Layer, table: &'a Table) -> Self {
        self.layers.push((layer, table));
        self
    }

    /// Find `key` in the highest layer that defines it.
    pub fn lookup(&self, key: &str) -> Option<(Layer, &'a Value)> {
        self.layers
            .iter()
            .find_map(|(layer, table)| table.get(key).map(|value| (*layer, value)))
    }
}

/// Keep only the entries whose key satisfies `known`.
pub fn filter_fields(table: Table, known: impl Fn(&str) -> bool) -> Table {
    table.into_iter().filter(|(key, _)| known(key)).collect()
}
