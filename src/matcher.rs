use crate::args::{EqualsFn, MemoArgs};
use crate::entry::CacheEntry;

/// One recorded call: its argument list, its cached result, and a stable id
/// used by the eviction scheduler to address the slot after later removals
/// shift indices.
#[derive(Clone, Debug)]
pub(crate) struct Slot<A, R> {
    pub args: A,
    pub entry: CacheEntry<R>,
    pub id: u64,
}

/// Append-only sequence of recorded calls for the matched calling strategy.
///
/// Lookups are a linear scan comparing argument positions, O(n·m) for n
/// recorded calls of m positions. That is the intended trade-off for
/// small-to-moderate caches; callers with large key populations should prefer
/// the serialized strategies (flat store lookup) or a custom [`CacheStore`].
///
/// The scan records *every* matching slot it passes, so when truncation via
/// `max_args` lets several recorded lists match one call, the last match in
/// scan order wins.
///
/// [`CacheStore`]: crate::CacheStore
#[derive(Debug)]
pub(crate) struct MatchCache<A, R> {
    slots: Vec<Slot<A, R>>,
    next_id: u64,
}

impl<A: MemoArgs, R: Clone> MatchCache<A, R> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }

    /// Scans for a recorded argument list matching `args`. Returns the index
    /// of the winning slot, or `None` when the call is new (its insertion
    /// point is then the current sequence length, i.e. append).
    pub fn find(
        &self,
        args: &A,
        max_args: Option<usize>,
        equals: Option<&EqualsFn>,
    ) -> Option<usize> {
        let mut found = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if args.matches(&slot.args, max_args, equals) {
                found = Some(index);
            }
        }
        found
    }

    pub fn slot(&self, index: usize) -> &Slot<A, R> {
        &self.slots[index]
    }

    /// Appends a new recorded call and returns its stable id.
    pub fn push(&mut self, args: A, entry: CacheEntry<R>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.push(Slot { args, entry, id });
        id
    }

    /// Removes the slot at `index`, keeping the remaining slots in scan order
    /// so that argument/result pairing and tie-break order survive removal.
    pub fn remove_at(&mut self, index: usize) -> Slot<A, R> {
        self.slots.remove(index)
    }

    /// Removes the slot with the given stable id, if it is still present.
    pub fn remove_id(&mut self, id: u64) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.id != id);
        self.slots.len() != before
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Snapshot of recorded argument lists, in scan order.
    pub fn keys(&self) -> Vec<A> {
        self.slots.iter().map(|slot| slot.args.clone()).collect()
    }

    /// Snapshot of cached results, parallel to [`MatchCache::keys`].
    pub fn values(&self) -> Vec<R> {
        self.slots
            .iter()
            .map(|slot| slot.entry.value.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(pairs: &[((i32, i32), i32)]) -> MatchCache<(i32, i32), i32> {
        let mut cache = MatchCache::new();
        for (args, value) in pairs {
            cache.push(*args, CacheEntry::new(*value));
        }
        cache
    }

    #[test]
    fn test_find_matches_recorded_call() {
        let cache = cache_with(&[((1, 2), 3), ((2, 1), 3)]);
        assert_eq!(cache.find(&(1, 2), None, None), Some(0));
        assert_eq!(cache.find(&(2, 1), None, None), Some(1));
        assert_eq!(cache.find(&(5, 5), None, None), None);
    }

    #[test]
    fn test_last_match_wins_under_truncation() {
        // Both recorded calls share the first position; with max_args = 1 the
        // scan matches both and the later one wins.
        let cache = cache_with(&[((1, 10), 100), ((1, 20), 200)]);
        let index = cache.find(&(1, 99), Some(1), None);
        assert_eq!(index, Some(1));
        assert_eq!(cache.slot(1).entry.value, 200);
    }

    #[test]
    fn test_push_assigns_monotonic_ids() {
        let mut cache: MatchCache<(i32, i32), i32> = MatchCache::new();
        let a = cache.push((1, 1), CacheEntry::new(2));
        let b = cache.push((2, 2), CacheEntry::new(4));
        assert!(b > a);
    }

    #[test]
    fn test_remove_id_preserves_scan_order() {
        let mut cache = cache_with(&[((1, 1), 1), ((2, 2), 2), ((3, 3), 3)]);
        let middle = cache.slot(1).id;
        assert!(cache.remove_id(middle));
        assert!(!cache.remove_id(middle));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec![(1, 1), (3, 3)]);
        assert_eq!(cache.values(), vec![1, 3]);
        // Ids stay attached to their slots across compaction.
        assert_eq!(cache.find(&(3, 3), None, None), Some(1));
    }

    #[test]
    fn test_snapshots_are_copies() {
        let cache = cache_with(&[((1, 2), 3)]);
        let mut keys = cache.keys();
        keys[0] = (9, 9);
        assert_eq!(cache.keys(), vec![(1, 2)]);
    }

    #[test]
    fn test_clear() {
        let mut cache = cache_with(&[((1, 2), 3)]);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.keys().is_empty());
        assert!(cache.values().is_empty());
    }
}
