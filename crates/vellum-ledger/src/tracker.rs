use std::collections::HashMap;
use std::hash::Hash;

/// Ordered map of observed changes, grouped by key.
///
/// Observations made at different points of a batch land in the same group
/// when they share a key, while iteration replays groups in the order their
/// keys were first seen. Keys are typically `(subject, state version)` pairs,
/// so replay order follows the feed.
#[derive(Debug)]
pub struct ChangeTracker<K, V> {
    order: Vec<K>,
    changes: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V> ChangeTracker<K, V> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            changes: HashMap::new(),
        }
    }

    /// The group for `key`, created through `make` on first sight.
    pub fn get_or_add(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        if !self.changes.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.changes.entry(key).or_insert_with(make)
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Groups in first-insertion order of their keys.
    pub fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|key| self.changes.get(key).map(|value| (key, value)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for ChangeTracker<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
