use std::collections::HashMap;
use std::hash::Hash;

/// Most-recent row per subject, bulk-loaded once and kept current in memory
/// while a batch reconciles.
///
/// A missing key is meaningful: the subject has no materialized history yet.
#[derive(Debug)]
pub struct MostRecentCache<K, R> {
    rows: HashMap<K, R>,
}

impl<K: Eq + Hash, R> MostRecentCache<K, R> {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Replace the cache contents with the result of a bulk load.
    pub fn populate(&mut self, rows: HashMap<K, R>) {
        self.rows = rows;
    }

    pub fn try_get(&self, key: &K) -> Option<&R> {
        self.rows.get(key)
    }

    /// Clone of the cached row, or a fresh one from `make`.
    pub fn cloned_or_else(&self, key: &K, make: impl FnOnce() -> R) -> R
    where
        R: Clone,
    {
        self.rows.get(key).cloned().unwrap_or_else(make)
    }

    /// Record a newer row for `key`, replacing any cached one.
    pub fn insert(&mut self, key: K, row: R) {
        self.rows.insert(key, row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<K: Eq + Hash, R> Default for MostRecentCache<K, R> {
    fn default() -> Self {
        Self::new()
    }
}
