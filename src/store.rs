use std::collections::HashMap;

use crate::entry::CacheEntry;
use crate::key::CacheKey;

/// Pluggable flat key → value backing store.
///
/// The unary and serialized calling strategies keep their entries in a
/// `CacheStore`; the matched (positional-equality) strategy uses its own slot
/// sequence instead and never touches this trait.
///
/// A lookup miss is reported as `None`, which keeps "never computed" distinct
/// from any stored value, including `()` and other zero-information results,
/// without a sentinel.
///
/// Implementations are free to add their own bounds (persistence, size caps,
/// instrumentation); the memoizer only relies on the operations below. `get`
/// returns a clone so the store's lock never outlives a lookup.
///
/// # Examples
///
/// ```
/// use fnmemo::{CacheEntry, CacheKey, CacheStore, MapStore};
///
/// let mut store: MapStore<i32> = MapStore::new();
/// store.set(CacheKey::Int(1), CacheEntry::new(10));
///
/// assert!(store.has(&CacheKey::Int(1)));
/// assert_eq!(store.get(&CacheKey::Int(1)).map(|e| e.value), Some(10));
/// assert!(store.get(&CacheKey::Int(2)).is_none());
/// ```
pub trait CacheStore<R: Clone>: Send {
    /// Returns the entry stored under `key`, if any.
    fn get(&self, key: &CacheKey) -> Option<CacheEntry<R>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn set(&mut self, key: CacheKey, entry: CacheEntry<R>);

    /// Returns true if `key` has a stored entry.
    fn has(&self, key: &CacheKey) -> bool;

    /// Removes and returns the entry stored under `key`.
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry<R>>;

    /// Removes every entry.
    fn clear(&mut self);

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries, in no particular order. Returned pairs are
    /// copies; mutating them never touches the store.
    fn entries(&self) -> Vec<(CacheKey, CacheEntry<R>)>;
}

/// Default [`CacheStore`]: a `HashMap` keyed by [`CacheKey`].
///
/// `CacheKey` is a closed value enum and `HashMap` has no notion of inherited
/// keys, so hostile key names (`"constructor"`, `"__proto__"`, ...) are just
/// ordinary string keys with no special meaning.
#[derive(Debug, Default)]
pub struct MapStore<R> {
    map: HashMap<CacheKey, CacheEntry<R>>,
}

impl<R> MapStore<R> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<R: Clone + Send> CacheStore<R> for MapStore<R> {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry<R>> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: CacheKey, entry: CacheEntry<R>) {
        self.map.insert(key, entry);
    }

    fn has(&self, key: &CacheKey) -> bool {
        self.map.contains_key(key)
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry<R>> {
        self.map.remove(key)
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn entries(&self) -> Vec<(CacheKey, CacheEntry<R>)> {
        self.map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
