use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Weak;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::key::CacheKey;

/// Interval of the background drain. Writes landing within one interval for
/// the same key collapse into a single timer (re)arm.
pub(crate) const TICK: Duration = Duration::from_millis(25);

/// Identity of one evictable entry inside its owning cache.
///
/// Flat stores address entries by their [`CacheKey`]; the matched strategy's
/// slot sequence addresses them by stable slot id, which survives the index
/// shifts of order-preserving compaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EvictKey {
    Keyed(CacheKey),
    Slot(u64),
}

/// Type-erased deletion hook into one memoizer's backing cache.
///
/// Held weakly by the scheduler: a dropped memoizer leaves only dead weak
/// handles behind, and its pending work is discarded on the next tick.
pub(crate) trait ExpireSink: Send + Sync {
    fn expire(&self, key: &EvictKey);
}

/// A write waiting to be turned into a timer arm on the next tick.
struct PendingChange {
    sink: Weak<dyn ExpireSink>,
    max_age: Duration,
}

struct ExpiryTimer {
    sink: Weak<dyn ExpireSink>,
    deadline: Instant,
}

/// (owner id, entry identity). The owner id keeps two memoizers that derive
/// identical keys from colliding in the shared scheduler maps.
type ChangeId = (u64, EvictKey);

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

/// Allocates a scheduler-wide unique id for one memoizer instance.
pub(crate) fn next_owner_id() -> u64 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

/// Process-wide timed-eviction scheduler.
///
/// Writes to caches configured with a `max_age` do not arm timers
/// synchronously. Each write records a pending change keyed by (owner, entry);
/// a background thread ticking at [`TICK`] drains the buffer, (re)arming one
/// timer per changed entry; inserting into the registry replaces any previous
/// timer for that entry, so a stale timer can never delete a freshly
/// rewritten value. Due timers then fire, deleting their entry through the
/// weak store handle and vacating the registry.
///
/// The tick thread is spawned lazily on the first scheduled change and never
/// starts if no memoizer configures `max_age`.
pub(crate) struct EvictionScheduler {
    changes: DashMap<ChangeId, PendingChange>,
    timers: DashMap<ChangeId, ExpiryTimer>,
    started: AtomicBool,
}

/// The global scheduler instance shared by every memoizer with a `max_age`.
pub(crate) fn scheduler() -> &'static EvictionScheduler {
    static SCHEDULER: Lazy<EvictionScheduler> = Lazy::new(EvictionScheduler::new);
    &SCHEDULER
}

impl EvictionScheduler {
    pub fn new() -> Self {
        Self {
            changes: DashMap::new(),
            timers: DashMap::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Records a write for deferred timer (re)arming and makes sure the tick
    /// thread is running.
    pub fn schedule(
        &'static self,
        owner: u64,
        key: EvictKey,
        sink: Weak<dyn ExpireSink>,
        max_age: Duration,
    ) {
        self.ensure_started();
        self.record_change(owner, key, sink, max_age);
    }

    /// Buffers a pending change. Repeated writes to the same entry within one
    /// tick overwrite each other: one arm per tick, not one per write.
    fn record_change(
        &self,
        owner: u64,
        key: EvictKey,
        sink: Weak<dyn ExpireSink>,
        max_age: Duration,
    ) {
        self.changes.insert((owner, key), PendingChange { sink, max_age });
    }

    /// Drops every pending change and cancels every armed timer belonging to
    /// `owner`. Called by `clear()` so a cleared cache cannot be touched by
    /// timers armed for its previous contents.
    pub fn cancel_owner(&self, owner: u64) {
        self.changes.retain(|(o, _), _| *o != owner);
        self.timers.retain(|(o, _), _| *o != owner);
    }

    /// One drain: pending changes become (re)armed timers, then due timers
    /// fire. Enumeration order of the buffer is not defined, so expiry order
    /// *across* entries within one tick is unspecified; per entry, the most
    /// recent write always wins via registry replacement.
    pub fn tick(&self, now: Instant) {
        let changed: Vec<ChangeId> = self.changes.iter().map(|e| e.key().clone()).collect();
        for id in changed {
            if let Some((id, change)) = self.changes.remove(&id) {
                self.timers.insert(
                    id,
                    ExpiryTimer {
                        sink: change.sink,
                        deadline: now + change.max_age,
                    },
                );
            }
        }

        let due: Vec<ChangeId> = self
            .timers
            .iter()
            .filter(|e| e.value().deadline <= now)
            .map(|e| e.key().clone())
            .collect();
        for id in due {
            if let Some(((_, key), timer)) = self.timers.remove(&id) {
                if let Some(sink) = timer.sink.upgrade() {
                    sink.expire(&key);
                }
            }
        }
    }

    fn ensure_started(&'static self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let spawned = thread::Builder::new()
            .name("fnmemo-eviction".to_string())
            .spawn(move || loop {
                thread::sleep(TICK);
                self.tick(Instant::now());
            });
        if spawned.is_err() {
            // Let a later write retry the spawn.
            self.started.store(false, Ordering::SeqCst);
        }
    }

    #[cfg(test)]
    fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    #[cfg(test)]
    fn armed_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sink that records which entry identities were expired.
    struct RecordingSink {
        expired: Mutex<Vec<EvictKey>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                expired: Mutex::new(Vec::new()),
            })
        }

        fn expired(&self) -> Vec<EvictKey> {
            self.expired.lock().clone()
        }
    }

    impl ExpireSink for RecordingSink {
        fn expire(&self, key: &EvictKey) {
            self.expired.lock().push(key.clone());
        }
    }

    fn weak(sink: &Arc<RecordingSink>) -> Weak<dyn ExpireSink> {
        let strong: Arc<dyn ExpireSink> = sink.clone();
        Arc::downgrade(&strong)
    }

    #[test]
    fn test_writes_within_one_tick_coalesce() {
        let scheduler = EvictionScheduler::new();
        let sink = RecordingSink::new();
        let age = Duration::from_millis(50);

        for _ in 0..100 {
            scheduler.record_change(1, EvictKey::Keyed(CacheKey::Int(7)), weak(&sink), age);
        }
        assert_eq!(scheduler.pending_changes(), 1);

        scheduler.tick(Instant::now());
        assert_eq!(scheduler.pending_changes(), 0);
        assert_eq!(scheduler.armed_timers(), 1);
    }

    #[test]
    fn test_due_timer_fires_and_vacates_registry() {
        let scheduler = EvictionScheduler::new();
        let sink = RecordingSink::new();
        let key = EvictKey::Keyed(CacheKey::Int(1));
        let now = Instant::now();

        scheduler.record_change(1, key.clone(), weak(&sink), Duration::from_millis(10));
        scheduler.tick(now);
        assert!(sink.expired().is_empty());

        scheduler.tick(now + Duration::from_millis(11));
        assert_eq!(sink.expired(), vec![key]);
        assert_eq!(scheduler.armed_timers(), 0);
    }

    #[test]
    fn test_rewrite_rearms_for_the_full_age() {
        let scheduler = EvictionScheduler::new();
        let sink = RecordingSink::new();
        let key = EvictKey::Slot(3);
        let age = Duration::from_millis(40);
        let now = Instant::now();

        scheduler.record_change(1, key.clone(), weak(&sink), age);
        scheduler.tick(now);

        // Rewrite just before expiry; the old timer must be replaced.
        let later = now + Duration::from_millis(30);
        scheduler.record_change(1, key.clone(), weak(&sink), age);
        scheduler.tick(later);
        assert_eq!(scheduler.armed_timers(), 1);

        // Past the original deadline: nothing fires.
        scheduler.tick(now + Duration::from_millis(45));
        assert!(sink.expired().is_empty());

        // Past the rearmed deadline: the entry goes.
        scheduler.tick(later + Duration::from_millis(41));
        assert_eq!(sink.expired(), vec![key]);
    }

    #[test]
    fn test_distinct_owners_do_not_collide() {
        let scheduler = EvictionScheduler::new();
        let sink_a = RecordingSink::new();
        let sink_b = RecordingSink::new();
        let key = EvictKey::Keyed(CacheKey::Int(1));
        let age = Duration::from_millis(5);
        let now = Instant::now();

        scheduler.record_change(1, key.clone(), weak(&sink_a), age);
        scheduler.record_change(2, key.clone(), weak(&sink_b), age);
        assert_eq!(scheduler.pending_changes(), 2);

        scheduler.tick(now);
        scheduler.tick(now + Duration::from_millis(6));
        assert_eq!(sink_a.expired(), vec![key.clone()]);
        assert_eq!(sink_b.expired(), vec![key]);
    }

    #[test]
    fn test_cancel_owner_drops_changes_and_timers() {
        let scheduler = EvictionScheduler::new();
        let sink = RecordingSink::new();
        let age = Duration::from_millis(5);
        let now = Instant::now();

        scheduler.record_change(1, EvictKey::Slot(0), weak(&sink), age);
        scheduler.tick(now);
        scheduler.record_change(1, EvictKey::Slot(1), weak(&sink), age);

        scheduler.cancel_owner(1);
        assert_eq!(scheduler.pending_changes(), 0);
        assert_eq!(scheduler.armed_timers(), 0);

        scheduler.tick(now + Duration::from_millis(10));
        assert!(sink.expired().is_empty());
    }

    #[test]
    fn test_dead_sink_is_discarded() {
        let scheduler = EvictionScheduler::new();
        let key = EvictKey::Keyed(CacheKey::Bool(true));
        let now = Instant::now();

        let sink = RecordingSink::new();
        scheduler.record_change(1, key, weak(&sink), Duration::from_millis(1));
        drop(sink);

        scheduler.tick(now);
        scheduler.tick(now + Duration::from_millis(2));
        assert_eq!(scheduler.armed_timers(), 0);
    }
}
