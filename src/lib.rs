//! # fnmemo
//!
//! Single-process, single-function memoization with pluggable key strategies
//! and optional timed eviction.
//!
//! Wrapping a function picks one of three calling strategies at wrap time,
//! based on the argument pack's declared arity and the options in play:
//!
//! - **Unary**: one declared argument. The argument itself becomes the cache
//!   key (primitives directly, with no allocation; everything else through a
//!   deterministic serialization) and a flat map answers in one lookup.
//! - **Serialized**: fixed multi-argument signature, default equality. The
//!   whole ordered argument list serializes into one key.
//! - **Matched**: custom equality, variadic (`Vec`) packs, `max_args`
//!   truncation, or an explicit override. Recorded calls are scanned with
//!   per-position equality, short-circuiting on the first mismatch.
//!
//! ## Features
//!
//! - **Key derivation**: primitive fast path, `Debug`-driven default
//!   serialization, pluggable custom serializers
//! - **Pluggable storage**: bring your own [`CacheStore`], or share one store
//!   across memoizers explicitly
//! - **Positional matching**: custom equality, partial-argument matching via
//!   `max_args`
//! - **Timed eviction**: `max_age` entries expire via a batched background
//!   scheduler that stays off the calling path
//! - **Result-aware caching**: fallible functions cache only `Ok` results
//! - **Introspection**: `keys()` / `values()` / `key_values()` snapshots,
//!   `clear()`, and hit/miss statistics (with the `stats` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use fnmemo::memoize;
//!
//! let add = memoize(|&(a, b): &(i32, i32)| a + b);
//!
//! assert_eq!(add.call((1, 2)), 3); // computed
//! assert_eq!(add.call((1, 2)), 3); // cached
//! assert_eq!(add.call((2, 1)), 3); // distinct key, computed
//! ```
//!
//! ## With Options
//!
//! ```rust
//! use fnmemo::MemoBuilder;
//! use std::time::Duration;
//!
//! let fetch = MemoBuilder::new()
//!     .max_age(Duration::from_secs(30))
//!     .build(|&(id,): &(u64,)| format!("record-{id}"))
//!     .unwrap();
//!
//! assert_eq!(fetch.call((7,)), "record-7");
//! ```
//!
//! ## Module Organization
//!
//! - [`key`](CacheKey) - cache key values and the [`CacheKeyed`] trait
//! - [`store`](CacheStore) - flat backing-store abstraction and [`MapStore`]
//! - [`args`](MemoArgs) - argument packs and positional matching
//! - [`strategy`](Strategy) - wrap-time strategy selection
//! - [`memoizer`](Memoized) - the builder and the callable façades

mod args;
mod entry;
mod error;
mod eviction;
mod key;
mod matcher;
mod memoizer;
mod store;
mod strategy;

#[cfg(feature = "stats")]
mod stats;

pub use args::{ArgValue, EqualsFn, MemoArgs};
pub use entry::CacheEntry;
pub use error::MemoError;
pub use key::{CacheKey, CacheKeyed};
pub use memoizer::{memoize, MemoBuilder, Memoized, SerializerFn, SharedStore, TryMemoized};
pub use store::{CacheStore, MapStore};
pub use strategy::Strategy;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
