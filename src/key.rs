use std::fmt::Debug;
use std::sync::Arc;

/// A derived cache key.
///
/// Keys are the lookup identity for flat (key → value) cache storage. Primitive
/// argument values map to dedicated variants and are used as keys directly,
/// with no serialization and no heap allocation. Everything else serializes to
/// a string form, or composes structurally with [`CacheKey::List`].
///
/// Strings deliberately do **not** get a raw-value fast path: a `String`
/// argument is keyed through its `Debug` form (quoted and escaped), so the
/// string `"Point { x: 1 }"` can never collide with the serialized form of an
/// actual `Point { x: 1 }` value.
///
/// # Examples
///
/// ```
/// use fnmemo::{CacheKey, CacheKeyed};
///
/// assert_eq!(42i32.cache_key(), CacheKey::Int(42));
/// assert_eq!(true.cache_key(), CacheKey::Bool(true));
/// assert_eq!("1".to_string().cache_key(), CacheKey::Str("\"1\"".to_string()));
///
/// // An integer and its string spelling never share a key.
/// assert_ne!(1i64.cache_key(), "1".to_string().cache_key());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Key for `()` and `Option::None`.
    Unit,
    Bool(bool),
    /// Signed integer arguments.
    Int(i64),
    /// Unsigned integer arguments wider than `i64` can hold.
    UInt(u64),
    /// Floating-point arguments, keyed by IEEE-754 bit pattern so that every
    /// distinct bit pattern (including NaNs) is a distinct, hashable key.
    Float(u64),
    Char(char),
    /// Serialized form of a non-primitive argument.
    Str(String),
    /// Structural composition: one key per element, in order. Used for whole
    /// argument lists and for container arguments.
    List(Vec<CacheKey>),
}

impl CacheKey {
    /// Builds a key from any `Debug` value by serializing its `Debug` form.
    ///
    /// This is the default serialization for user-defined argument types:
    ///
    /// ```
    /// use fnmemo::{CacheKey, CacheKeyed};
    ///
    /// #[derive(Debug)]
    /// struct UserId(u64);
    ///
    /// impl CacheKeyed for UserId {
    ///     fn cache_key(&self) -> CacheKey {
    ///         CacheKey::debug(self)
    ///     }
    /// }
    ///
    /// assert_eq!(UserId(7).cache_key(), CacheKey::Str("UserId(7)".to_string()));
    /// ```
    ///
    /// Determinism is required of every serializer: equal logical inputs must
    /// yield equal keys. Avoiding collisions between *distinct* logical inputs
    /// (for example, two types with identical `Debug` output sharing one cache
    /// store) is the caller's responsibility.
    pub fn debug<T: Debug + ?Sized>(value: &T) -> CacheKey {
        CacheKey::Str(format!("{:?}", value))
    }
}

/// Conversion of a single argument value into a [`CacheKey`].
///
/// Implemented for the primitive types (direct variant, no allocation), for
/// strings (`Debug`-quoted), and for `Option`/`Vec` containers of keyable
/// values. Implement it for your own argument types either manually or with
/// the [`debug_key!`](crate::debug_key) macro:
///
/// ```
/// use fnmemo::debug_key;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// debug_key!(Point);
/// ```
pub trait CacheKeyed {
    fn cache_key(&self) -> CacheKey;
}

/// Derives a [`CacheKeyed`] impl from a type's `Debug` representation.
///
/// The expansion is exactly `CacheKey::debug(self)`; prefer a manual impl when
/// the `Debug` form is expensive or when a narrower identity (say, an id
/// field) suffices.
#[macro_export]
macro_rules! debug_key {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::CacheKeyed for $ty {
                fn cache_key(&self) -> $crate::CacheKey {
                    $crate::CacheKey::debug(self)
                }
            }
        )+
    };
}

impl CacheKeyed for () {
    fn cache_key(&self) -> CacheKey {
        CacheKey::Unit
    }
}

impl CacheKeyed for bool {
    fn cache_key(&self) -> CacheKey {
        CacheKey::Bool(*self)
    }
}

impl CacheKeyed for char {
    fn cache_key(&self) -> CacheKey {
        CacheKey::Char(*self)
    }
}

macro_rules! signed_key {
    ($($ty:ty),+) => {
        $(
            impl CacheKeyed for $ty {
                fn cache_key(&self) -> CacheKey {
                    CacheKey::Int(*self as i64)
                }
            }
        )+
    };
}

macro_rules! unsigned_key {
    ($($ty:ty),+) => {
        $(
            impl CacheKeyed for $ty {
                fn cache_key(&self) -> CacheKey {
                    CacheKey::UInt(*self as u64)
                }
            }
        )+
    };
}

signed_key!(i8, i16, i32, i64, isize);
unsigned_key!(u8, u16, u32, u64, usize);

impl CacheKeyed for f32 {
    fn cache_key(&self) -> CacheKey {
        CacheKey::Float((*self as f64).to_bits())
    }
}

impl CacheKeyed for f64 {
    fn cache_key(&self) -> CacheKey {
        CacheKey::Float(self.to_bits())
    }
}

impl CacheKeyed for String {
    fn cache_key(&self) -> CacheKey {
        CacheKey::debug(self)
    }
}

impl CacheKeyed for &'static str {
    fn cache_key(&self) -> CacheKey {
        CacheKey::debug(self)
    }
}

impl CacheKeyed for Box<str> {
    fn cache_key(&self) -> CacheKey {
        CacheKey::debug(&**self)
    }
}

impl CacheKeyed for Arc<str> {
    fn cache_key(&self) -> CacheKey {
        CacheKey::debug(&**self)
    }
}

impl<T: CacheKeyed> CacheKeyed for Option<T> {
    fn cache_key(&self) -> CacheKey {
        match self {
            Some(value) => CacheKey::List(vec![value.cache_key()]),
            None => CacheKey::Unit,
        }
    }
}

impl<T: CacheKeyed> CacheKeyed for Vec<T> {
    fn cache_key(&self) -> CacheKey {
        CacheKey::List(self.iter().map(CacheKeyed::cache_key).collect())
    }
}
