//! Cache storage module
//!
//! This module provides an in-memory memoizing cache used to hold remote
//! metadata for the lifetime of a run. Entries are filled on first access
//! and never invalidated.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

/// A memoizing key/value cache with fallible fill-on-miss
///
/// Access to a missing key runs the fetch function exactly once and stores
/// its result. A failing fetch stores nothing, so a later access retries.
/// Mutation requires `&mut self`, so at most one fetch per key can be in
/// flight.
#[derive(Debug)]
pub(crate) struct MemoCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, fetching and storing it on a miss
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let season = cache.get_or_try_insert_with(2, || fetch_season(2))?;
    /// ```
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, fetch: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let value = fetch()?;
                Ok(entry.insert(value))
            }
        }
    }

    /// Returns the cached value for `key`, inserting the default on a miss
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.entries.entry(key).or_insert_with(make)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}
