use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::args::{EqualsFn, MemoArgs};
use crate::entry::CacheEntry;
use crate::error::MemoError;
use crate::eviction::{next_owner_id, scheduler, EvictKey, ExpireSink};
use crate::key::CacheKey;
use crate::matcher::MatchCache;
use crate::store::{CacheStore, MapStore};
use crate::strategy::Strategy;

#[cfg(feature = "stats")]
use crate::stats::CacheStats;

/// Custom whole-argument-list key serializer.
///
/// On the unary path the argument pack is the single argument; on the
/// serialized path it is the full ordered list. Must be deterministic.
pub type SerializerFn<A> = Arc<dyn Fn(&A) -> CacheKey + Send + Sync>;

/// A flat store shared behind a lock, so several memoizers can be pointed at
/// the same storage explicitly. The default is one private store per wrap.
pub type SharedStore<R> = Arc<Mutex<Box<dyn CacheStore<R>>>>;

/// Memoizes `f` with all defaults: private [`MapStore`], default key
/// serialization, strict positional equality, no expiration.
///
/// # Examples
///
/// ```
/// use fnmemo::memoize;
///
/// let add = memoize(|&(a, b): &(i32, i32)| a + b);
/// assert_eq!(add.call((1, 2)), 3);
/// assert_eq!(add.call((1, 2)), 3); // served from cache
/// ```
pub fn memoize<A, R, F>(f: F) -> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> R,
{
    MemoBuilder::new().assemble(f)
}

/// Configures and wraps a memoized function.
///
/// # Options
///
/// * [`store`](MemoBuilder::store) / [`store_shared`](MemoBuilder::store_shared) -
///   custom or shared flat backing store
/// * [`serializer`](MemoBuilder::serializer) - custom key derivation
/// * [`equals`](MemoBuilder::equals) - custom positional equality (forces the
///   matched strategy)
/// * [`max_age`](MemoBuilder::max_age) - entry time-to-live
/// * [`max_args`](MemoBuilder::max_args) - truncate argument matching to the
///   first N positions (forces the matched strategy)
/// * [`vargs`](MemoBuilder::vargs) - force the matched strategy for a tuple
///   pack
///
/// # Examples
///
/// ```
/// use fnmemo::MemoBuilder;
/// use std::time::Duration;
///
/// let lookup = MemoBuilder::new()
///     .max_age(Duration::from_secs(30))
///     .build(|&(id,): &(u64,)| format!("user-{id}"))
///     .unwrap();
///
/// assert_eq!(lookup.call((7,)), "user-7");
/// ```
pub struct MemoBuilder<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    store: Option<SharedStore<R>>,
    serializer: Option<SerializerFn<A>>,
    equals: Option<EqualsFn>,
    max_age: Option<Duration>,
    max_args: Option<usize>,
    vargs: bool,
    _args: PhantomData<A>,
}

impl<A, R> Default for MemoBuilder<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> MemoBuilder<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            store: None,
            serializer: None,
            equals: None,
            max_age: None,
            max_args: None,
            vargs: false,
            _args: PhantomData,
        }
    }

    /// Uses a custom flat backing store instead of the default [`MapStore`].
    ///
    /// Only the unary and serialized strategies consult the flat store; the
    /// matched strategy keeps its own slot sequence and ignores this option.
    pub fn store<S: CacheStore<R> + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(Mutex::new(Box::new(store))));
        self
    }

    /// Points this memoizer at an existing shared store. Key collisions
    /// between functions sharing a store are the caller's responsibility.
    pub fn store_shared(mut self, store: SharedStore<R>) -> Self {
        self.store = Some(store);
        self
    }

    /// Custom key serializer over the whole argument pack.
    pub fn serializer<S>(mut self, serializer: S) -> Self
    where
        S: Fn(&A) -> CacheKey + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Custom positional equality. Switches the wrap to the matched strategy;
    /// the callback runs per argument position, left to right, and matching
    /// stops at the first position it rejects.
    pub fn equals<E>(mut self, equals: E) -> Self
    where
        E: Fn(&dyn Any, &dyn Any) -> bool + Send + Sync + 'static,
    {
        self.equals = Some(Arc::new(equals));
        self
    }

    /// Entries older than `max_age` stop being served immediately and are
    /// deleted by the background scheduler within one tick past expiry.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Match only the first `max_args` argument positions. Later positions
    /// are ignored, so calls differing only past the limit share one entry.
    pub fn max_args(mut self, max_args: usize) -> Self {
        self.max_args = Some(max_args);
        self
    }

    /// Forces the matched (variadic) strategy regardless of arity.
    pub fn vargs(mut self) -> Self {
        self.vargs = true;
        self
    }

    fn validate(&self) -> Result<(), MemoError> {
        if self.max_args == Some(0) {
            return Err(MemoError::InvalidOptions(
                "max_args must be at least 1".to_string(),
            ));
        }
        if self.max_age == Some(Duration::ZERO) {
            return Err(MemoError::InvalidOptions(
                "max_age must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Wraps an infallible function.
    ///
    /// # Returns
    ///
    /// * `Ok(Memoized)` - The wrapped function
    /// * `Err(MemoError::InvalidOptions)` - A configured option is statically
    ///   invalid (`max_args(0)`, zero `max_age`)
    pub fn build<F>(self, f: F) -> Result<Memoized<A, R, F>, MemoError>
    where
        F: Fn(&A) -> R,
    {
        self.validate()?;
        Ok(self.assemble(f))
    }

    /// Wraps a fallible function. Only `Ok` results are cached; `Err` results
    /// propagate to the caller and write nothing.
    pub fn build_fallible<E, F>(self, f: F) -> Result<TryMemoized<A, R, E, F>, MemoError>
    where
        F: Fn(&A) -> Result<R, E>,
    {
        self.validate()?;
        Ok(TryMemoized {
            core: self.into_core(),
            f: Arc::new(f),
            _err: PhantomData,
        })
    }

    fn assemble<F>(self, f: F) -> Memoized<A, R, F>
    where
        F: Fn(&A) -> R,
    {
        Memoized {
            core: self.into_core(),
            f: Arc::new(f),
        }
    }

    fn into_core(self) -> Arc<MemoCore<A, R>> {
        let strategy =
            Strategy::select::<A>(self.equals.is_some(), self.vargs, self.max_args.is_some());

        let backing = match strategy {
            Strategy::Matched => Backing::Matched(Arc::new(Mutex::new(MatchCache::new()))),
            _ => Backing::Flat(
                self.store
                    .unwrap_or_else(|| Arc::new(Mutex::new(Box::new(MapStore::new())))),
            ),
        };

        // The deletion hook only exists when entries can expire, so wraps
        // without max_age never touch the scheduler.
        let sink: Option<Arc<dyn ExpireSink>> = if self.max_age.is_some() {
            Some(match &backing {
                Backing::Flat(store) => Arc::new(FlatSink(store.clone())),
                Backing::Matched(cache) => Arc::new(MatchSink(cache.clone())),
            })
        } else {
            None
        };

        Arc::new(MemoCore {
            strategy,
            backing,
            serializer: self.serializer,
            equals: self.equals,
            max_age: self.max_age,
            max_args: self.max_args,
            owner: next_owner_id(),
            sink,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        })
    }
}

enum Backing<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    Flat(SharedStore<R>),
    Matched(Arc<Mutex<MatchCache<A, R>>>),
}

struct FlatSink<R: Clone + Send + 'static>(SharedStore<R>);

impl<R: Clone + Send + 'static> ExpireSink for FlatSink<R> {
    fn expire(&self, key: &EvictKey) {
        if let EvictKey::Keyed(key) = key {
            self.0.lock().remove(key);
        }
    }
}

struct MatchSink<A, R>(Arc<Mutex<MatchCache<A, R>>>)
where
    A: MemoArgs,
    R: Clone + Send + 'static;

impl<A, R> ExpireSink for MatchSink<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    fn expire(&self, key: &EvictKey) {
        if let EvictKey::Slot(id) = key {
            self.0.lock().remove_id(*id);
        }
    }
}

/// Wrap-time state shared by the callable façades: the selected strategy, the
/// bound backing cache, the bound serializer/equality, and the options. All of
/// it is resolved once at wrap time; nothing is re-derived per call.
struct MemoCore<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    strategy: Strategy,
    backing: Backing<A, R>,
    serializer: Option<SerializerFn<A>>,
    equals: Option<EqualsFn>,
    max_age: Option<Duration>,
    max_args: Option<usize>,
    owner: u64,
    sink: Option<Arc<dyn ExpireSink>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<A, R> MemoCore<A, R>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
{
    fn derive_key(&self, args: &A) -> CacheKey {
        match &self.serializer {
            Some(serializer) => serializer(args),
            None => args.list_key(),
        }
    }

    /// Cache probe. Expired entries are pruned on sight and reported as
    /// misses, so a stale value is never served during the scheduler's tick
    /// gap.
    fn get(&self, args: &A) -> Option<R> {
        let found = match &self.backing {
            Backing::Flat(store) => {
                let key = self.derive_key(args);
                let mut store = store.lock();
                match store.get(&key) {
                    Some(entry) if entry.is_expired(self.max_age) => {
                        store.remove(&key);
                        None
                    }
                    Some(entry) => Some(entry.value),
                    None => None,
                }
            }
            Backing::Matched(cache) => {
                let mut cache = cache.lock();
                match cache.find(args, self.max_args, self.equals.as_ref()) {
                    Some(index) if cache.slot(index).entry.is_expired(self.max_age) => {
                        cache.remove_at(index);
                        None
                    }
                    Some(index) => Some(cache.slot(index).entry.value.clone()),
                    None => None,
                }
            }
        };

        #[cfg(feature = "stats")]
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }

        found
    }

    /// Stores a freshly computed result and, when expiration is configured,
    /// buffers the write for the scheduler's next tick.
    fn insert(&self, args: &A, value: R) {
        let evict_key = match &self.backing {
            Backing::Flat(store) => {
                let key = self.derive_key(args);
                store.lock().set(key.clone(), CacheEntry::new(value));
                EvictKey::Keyed(key)
            }
            Backing::Matched(cache) => {
                let id = cache.lock().push(args.clone(), CacheEntry::new(value));
                EvictKey::Slot(id)
            }
        };

        if let (Some(max_age), Some(sink)) = (self.max_age, &self.sink) {
            scheduler().schedule(self.owner, evict_key, Arc::downgrade(sink), max_age);
        }
    }

    fn clear(&self) {
        match &self.backing {
            Backing::Flat(store) => store.lock().clear(),
            Backing::Matched(cache) => cache.lock().clear(),
        }
        if self.max_age.is_some() {
            scheduler().cancel_owner(self.owner);
        }
    }

    fn len(&self) -> usize {
        match &self.backing {
            Backing::Flat(store) => store.lock().len(),
            Backing::Matched(cache) => cache.lock().len(),
        }
    }

    fn keys(&self) -> Option<Vec<A>> {
        match &self.backing {
            Backing::Matched(cache) => Some(cache.lock().keys()),
            Backing::Flat(_) => None,
        }
    }

    fn values(&self) -> Option<Vec<R>> {
        match &self.backing {
            Backing::Matched(cache) => Some(cache.lock().values()),
            Backing::Flat(_) => None,
        }
    }

    fn key_values(&self) -> Option<HashMap<CacheKey, R>> {
        match &self.backing {
            Backing::Flat(store) => Some(
                store
                    .lock()
                    .entries()
                    .into_iter()
                    .map(|(key, entry)| (key, entry.value))
                    .collect(),
            ),
            Backing::Matched(_) => None,
        }
    }
}

macro_rules! facade_common {
    () => {
        /// Idempotently empties every backing structure and cancels this
        /// memoizer's pending and armed expiration timers. Existing references
        /// to the wrapped function keep working against the emptied cache.
        pub fn clear(&self) {
            self.core.clear();
        }

        /// Number of currently cached entries.
        pub fn len(&self) -> usize {
            self.core.len()
        }

        pub fn is_empty(&self) -> bool {
            self.core.len() == 0
        }

        /// The calling strategy selected at wrap time.
        pub fn strategy(&self) -> Strategy {
            self.core.strategy
        }

        /// Snapshot of recorded argument lists, in scan order. `None` on the
        /// flat-store strategies, where no argument lists are recorded.
        /// The snapshot is a copy; mutating it never touches the cache.
        pub fn keys(&self) -> Option<Vec<A>> {
            self.core.keys()
        }

        /// Snapshot of cached results, parallel to `keys()`. `None` on the
        /// flat-store strategies.
        pub fn values(&self) -> Option<Vec<R>> {
            self.core.values()
        }

        /// Snapshot of the flat key → value mapping. `None` on the matched
        /// strategy, which records argument lists instead of flat keys.
        ///
        /// Both flat-store strategies answer `Some`, including the serialized
        /// multi-argument path: there each key covers the whole ordered
        /// argument list, and this snapshot is the only window into that
        /// cache (its `keys()`/`values()` are not applicable, since it
        /// records no argument lists).
        pub fn key_values(&self) -> Option<HashMap<CacheKey, R>> {
            self.core.key_values()
        }

        /// Hit/miss counters for this memoizer.
        #[cfg(feature = "stats")]
        pub fn stats(&self) -> &CacheStats {
            &self.core.stats
        }
    };
}

/// A memoized function.
///
/// Created by [`memoize`] or [`MemoBuilder::build`]. Calling it runs the
/// selected strategy's lookup; on a miss the wrapped function executes once
/// and its result is stored. Cloning is cheap and clones share the cache.
///
/// # Examples
///
/// ```
/// use fnmemo::memoize;
/// use std::cell::Cell;
///
/// let calls = Cell::new(0u32);
/// let double = memoize(|&(n,): &(u64,)| {
///     calls.set(calls.get() + 1);
///     n * 2
/// });
///
/// assert_eq!(double.call((21,)), 42);
/// assert_eq!(double.call((21,)), 42);
/// assert_eq!(calls.get(), 1); // computed once
/// ```
pub struct Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> R,
{
    core: Arc<MemoCore<A, R>>,
    f: Arc<F>,
}

impl<A, R, F> Clone for Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> R,
{
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            f: self.f.clone(),
        }
    }
}

impl<A, R, F> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> R,
{
    /// Invokes the memoized function with one argument pack.
    ///
    /// A panic raised by the wrapped function (or by a custom serializer or
    /// equality) unwinds to the caller before any cache write, so a failed
    /// call never leaves a cache entry behind.
    pub fn call(&self, args: A) -> R {
        if let Some(value) = self.core.get(&args) {
            return value;
        }
        let value = (self.f)(&args);
        self.core.insert(&args, value.clone());
        value
    }

    facade_common!();
}

/// A memoized fallible function.
///
/// Created by [`MemoBuilder::build_fallible`]. `Ok` results are cached like
/// any other value; an `Err` propagates to the caller unmodified and the
/// cache state for that argument pack is left untouched, so the next call
/// with the same arguments runs the function again.
///
/// # Examples
///
/// ```
/// use fnmemo::MemoBuilder;
///
/// let parse = MemoBuilder::new()
///     .build_fallible(|(s,): &(String,)| s.parse::<i32>())
///     .unwrap();
///
/// assert_eq!(parse.call(("42".to_string(),)), Ok(42));
/// assert!(parse.call(("nope".to_string(),)).is_err());
/// assert_eq!(parse.len(), 1); // only the Ok result was cached
/// ```
pub struct TryMemoized<A, R, E, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> Result<R, E>,
{
    core: Arc<MemoCore<A, R>>,
    f: Arc<F>,
    _err: PhantomData<fn() -> E>,
}

impl<A, R, E, F> Clone for TryMemoized<A, R, E, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> Result<R, E>,
{
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            f: self.f.clone(),
            _err: PhantomData,
        }
    }
}

impl<A, R, E, F> TryMemoized<A, R, E, F>
where
    A: MemoArgs,
    R: Clone + Send + 'static,
    F: Fn(&A) -> Result<R, E>,
{
    /// Invokes the memoized function; only successful results populate the
    /// cache.
    pub fn call(&self, args: A) -> Result<R, E> {
        if let Some(value) = self.core.get(&args) {
            return Ok(value);
        }
        let value = (self.f)(&args)?;
        self.core.insert(&args, value.clone());
        Ok(value)
    }

    facade_common!();
}
