use std::any::Any;
use std::sync::Arc;

use crate::key::{CacheKey, CacheKeyed};

/// Positional equality callback for the matched calling strategy.
///
/// The callback receives the new call's value and the recorded value for one
/// argument position, type-erased. Downcast to the concrete position type:
///
/// ```
/// use fnmemo::EqualsFn;
/// use std::any::Any;
/// use std::sync::Arc;
///
/// // Case-insensitive matching on string positions.
/// let equals: EqualsFn = Arc::new(|a: &dyn Any, b: &dyn Any| {
///     match (a.downcast_ref::<String>(), b.downcast_ref::<String>()) {
///         (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
///         _ => false,
///     }
/// });
/// ```
pub type EqualsFn = Arc<dyn Fn(&dyn Any, &dyn Any) -> bool + Send + Sync>;

/// Bound alias for a value usable as one argument position.
pub trait ArgValue: CacheKeyed + PartialEq + Clone + Send + Any {}

impl<T: CacheKeyed + PartialEq + Clone + Send + Any> ArgValue for T {}

#[inline]
fn position_matches<T: ArgValue>(new: &T, recorded: &T, equals: Option<&EqualsFn>) -> bool {
    match equals {
        Some(eq) => eq(new, recorded),
        None => new == recorded,
    }
}

/// An ordered argument list accepted by a memoized function.
///
/// Tuples up to twelve positions implement this with a fixed arity; `Vec<T>`
/// implements it with a dynamic length and is the variadic argument form. The
/// arity (or its absence) is what the strategy selector inspects at wrap time.
///
/// `matches` is the positional matching rule used by the matched strategy:
/// a recorded list matches a new call when the lengths are compatible (equal,
/// or, with `max_args` truncation configured, recorded length at most
/// `max_args` and shorter than the call) and every compared position is equal
/// under `equals` (default: `PartialEq`). Comparison runs left to right and
/// stops at the first mismatch; positions past the first mismatch are never
/// evaluated.
pub trait MemoArgs: Clone + Send + 'static {
    /// Declared parameter count; `None` for variadic lists.
    const ARITY: Option<usize>;

    /// Number of argument positions in this particular call.
    fn len(&self) -> usize;

    /// Default whole-list serialization: one key covering every position in
    /// order. For a single-position list this is the position's own key.
    fn list_key(&self) -> CacheKey;

    /// Positional matching against a recorded argument list.
    fn matches(
        &self,
        recorded: &Self,
        max_args: Option<usize>,
        equals: Option<&EqualsFn>,
    ) -> bool;
}

impl<A: ArgValue> MemoArgs for (A,) {
    const ARITY: Option<usize> = Some(1);

    fn len(&self) -> usize {
        1
    }

    fn list_key(&self) -> CacheKey {
        self.0.cache_key()
    }

    fn matches(
        &self,
        recorded: &Self,
        max_args: Option<usize>,
        equals: Option<&EqualsFn>,
    ) -> bool {
        if max_args == Some(0) {
            return true;
        }
        position_matches(&self.0, &recorded.0, equals)
    }
}

macro_rules! tuple_args {
    ($len:expr => $(($idx:tt, $T:ident)),+) => {
        impl<$($T: ArgValue),+> MemoArgs for ($($T,)+) {
            const ARITY: Option<usize> = Some($len);

            fn len(&self) -> usize {
                $len
            }

            fn list_key(&self) -> CacheKey {
                CacheKey::List(vec![$(self.$idx.cache_key()),+])
            }

            fn matches(
                &self,
                recorded: &Self,
                max_args: Option<usize>,
                equals: Option<&EqualsFn>,
            ) -> bool {
                let limit = max_args.unwrap_or(usize::MAX);
                let mut position = 0usize;
                $(
                    if position >= limit {
                        return true;
                    }
                    if !position_matches(&self.$idx, &recorded.$idx, equals) {
                        return false;
                    }
                    position += 1;
                )+
                let _ = position;
                true
            }
        }
    };
}

tuple_args!(2 => (0, A), (1, B));
tuple_args!(3 => (0, A), (1, B), (2, C));
tuple_args!(4 => (0, A), (1, B), (2, C), (3, D));
tuple_args!(5 => (0, A), (1, B), (2, C), (3, D), (4, E));
tuple_args!(6 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G));
tuple_args!(7 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H));
tuple_args!(8 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H), (7, I));
tuple_args!(9 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H), (7, I), (8, J));
tuple_args!(10 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H), (7, I), (8, J), (9, K));
tuple_args!(11 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H), (7, I), (8, J), (9, K), (10, L));
tuple_args!(12 => (0, A), (1, B), (2, C), (3, D), (4, E), (5, G), (6, H), (7, I), (8, J), (9, K), (10, L), (11, M));

impl MemoArgs for () {
    const ARITY: Option<usize> = Some(0);

    fn len(&self) -> usize {
        0
    }

    fn list_key(&self) -> CacheKey {
        CacheKey::List(Vec::new())
    }

    fn matches(&self, _recorded: &Self, _max_args: Option<usize>, _equals: Option<&EqualsFn>) -> bool {
        true
    }
}

impl<T: ArgValue> MemoArgs for Vec<T> {
    const ARITY: Option<usize> = None;

    fn len(&self) -> usize {
        self.len()
    }

    fn list_key(&self) -> CacheKey {
        CacheKey::List(self.iter().map(CacheKeyed::cache_key).collect())
    }

    fn matches(
        &self,
        recorded: &Self,
        max_args: Option<usize>,
        equals: Option<&EqualsFn>,
    ) -> bool {
        let call_len = self.len();
        let recorded_len = recorded.len();
        let length_ok = recorded_len == call_len
            || max_args.is_some_and(|m| recorded_len <= m && recorded_len < call_len);
        if !length_ok {
            return false;
        }

        let compared = max_args
            .unwrap_or(usize::MAX)
            .min(call_len)
            .min(recorded_len);
        self[..compared]
            .iter()
            .zip(&recorded[..compared])
            .all(|(new, old)| position_matches(new, old, equals))
    }
}
