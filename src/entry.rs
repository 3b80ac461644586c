use std::time::{Duration, Instant};

/// Internal wrapper that tracks when a value was written into a cache.
///
/// Timed eviction is driven by the background scheduler, but lookups also
/// check entry age directly so that a value past its `max_age` is never served
/// during the gap before the scheduler's next tick.
///
/// # Examples
///
/// ```
/// use fnmemo::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(42);
/// assert_eq!(entry.value, 42);
/// assert!(!entry.is_expired(Some(Duration::from_secs(60))));
/// assert!(!entry.is_expired(None));
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<R> {
    pub value: R,
    pub inserted_at: Instant,
}

impl<R> CacheEntry<R> {
    /// Creates a new entry with `inserted_at` set to `Instant::now()`.
    pub fn new(value: R) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// Returns true if the entry is older than the given maximum age.
    ///
    /// `None` means entries never age out.
    pub fn is_expired(&self, max_age: Option<Duration>) -> bool {
        match max_age {
            Some(age) => self.inserted_at.elapsed() >= age,
            None => false,
        }
    }
}
