//! Per-context memoization

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::trace;

/// A compute-once map with no eviction
///
/// Entries live as long as the owning resolution context. Lookups are
/// counted so hosts can see how effective a cache is.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    name: &'static str,
    entries: FxHashMap<K, V>,
    hits: u64,
    misses: u64,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Return the cached value for `key`, computing it on first use
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce(&K) -> V) -> &V {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                trace!("{} cache hit for {:?}", self.name, entry.key());
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                trace!("{} cache miss for {:?}", self.name, entry.key());
                let value = compute(entry.key());
                entry.insert(value)
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
