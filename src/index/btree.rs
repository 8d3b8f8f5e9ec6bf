//! BTreeMap-based secondary index
//!
//! `IndexTree<K>` maps a key to the ascending list of row ids carrying it.
//! Ordering is deterministic, and range scans over timestamp keys stay
//! proportional to the size of the window, not the history.

use std::collections::BTreeMap;
use std::ops::Bound;

/// Row identifier assigned at write time, monotonic per table.
pub type RowId = u64;

/// A single-key index over a table.
#[derive(Debug, Clone)]
pub struct IndexTree<K: Ord> {
    tree: BTreeMap<K, Vec<RowId>>,
}

impl<K: Ord> Default for IndexTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> IndexTree<K> {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a row id for a key, keeping ids ascending.
    pub fn insert(&mut self, key: K, row: RowId) {
        let rows = self.tree.entry(key).or_default();
        match rows.binary_search(&row) {
            Ok(_) => {}
            Err(pos) => rows.insert(pos, row),
        }
    }

    /// All row ids for an exact key, ascending.
    pub fn lookup(&self, key: &K) -> &[RowId] {
        self.tree.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Row groups with key strictly greater than `lower`, newest key first.
    pub fn after_desc<'a>(&'a self, lower: &K) -> impl Iterator<Item = (&'a K, &'a [RowId])> + 'a {
        self.tree
            .range((Bound::Excluded(lower), Bound::Unbounded))
            .rev()
            .map(|(k, rows)| (k, rows.as_slice()))
    }
}
