//! Immutable dispatch tables keyed by operator kind

use bqsql_ir::OpKind;
use std::collections::HashMap;
use std::fmt;

/// Operator-kind keyed lookup table.
///
/// Built once through [`DispatchTableBuilder`] and read-only afterwards, so a
/// table can be shared across threads behind an `Arc`.
pub struct DispatchTable<V> {
    entries: HashMap<OpKind, V>,
}

impl<V: Clone> DispatchTable<V> {
    pub fn builder() -> DispatchTableBuilder<V> {
        DispatchTableBuilder {
            entries: HashMap::new(),
        }
    }

    /// Start a new layer on top of this table
    pub fn to_builder(&self) -> DispatchTableBuilder<V> {
        DispatchTableBuilder {
            entries: self.entries.clone(),
        }
    }

    pub fn get(&self, kind: OpKind) -> Option<&V> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: OpKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<OpKind> {
        let mut kinds: Vec<OpKind> = self.entries.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> fmt::Debug for DispatchTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

pub struct DispatchTableBuilder<V> {
    entries: HashMap<OpKind, V>,
}

impl<V: Clone> DispatchTableBuilder<V> {
    /// Register (or replace) the entry for `kind`
    pub fn register(mut self, kind: OpKind, value: V) -> Self {
        self.entries.insert(kind, value);
        self
    }

    pub fn remove(mut self, kind: OpKind) -> Self {
        self.entries.remove(&kind);
        self
    }

    /// Layer every entry of `other` over this builder
    pub fn extend(mut self, other: &DispatchTable<V>) -> Self {
        for (kind, value) in &other.entries {
            self.entries.insert(*kind, value.clone());
        }
        self
    }

    pub fn build(self) -> DispatchTable<V> {
        tracing::trace!(entries = self.entries.len(), "dispatch table built");
        DispatchTable {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqsql_ir::{Agg, BinaryOp};

    #[test]
    fn test_layering_overrides_and_removes() {
        let base = DispatchTable::builder()
            .register(OpKind::Binary(BinaryOp::Divide), "base divide")
            .register(OpKind::Reduction(Agg::Sum), "base sum")
            .register(OpKind::Cast, "base cast")
            .build();

        let layered = base
            .to_builder()
            .register(OpKind::Binary(BinaryOp::Divide), "dialect divide")
            .remove(OpKind::Cast)
            .build();

        assert_eq!(layered.get(OpKind::Binary(BinaryOp::Divide)), Some(&"dialect divide"));
        assert_eq!(layered.get(OpKind::Reduction(Agg::Sum)), Some(&"base sum"));
        assert!(!layered.contains(OpKind::Cast));

        // The base table is untouched
        assert_eq!(base.get(OpKind::Binary(BinaryOp::Divide)), Some(&"base divide"));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_extend_and_sorted_kinds() {
        let overrides = DispatchTable::builder()
            .register(OpKind::Literal, 2)
            .build();
        let table = DispatchTable::builder()
            .register(OpKind::Literal, 1)
            .register(OpKind::Column, 1)
            .extend(&overrides)
            .build();

        assert_eq!(table.get(OpKind::Literal), Some(&2));
        assert_eq!(table.kinds(), vec![OpKind::Literal, OpKind::Column]);
    }
}
