use crate::args::MemoArgs;

/// Calling strategy chosen once at wrap time.
///
/// The selector inspects the argument pack's declared arity and the options in
/// play. Because the pack's type *is* the declared signature, variadic
/// detection here is exact: `Vec` packs are variadic by construction and tuple
/// packs are not. The `vargs` option remains as an explicit override forcing
/// the matched path for a tuple pack.
///
/// # Variants
///
/// * `Unary` - one declared argument, default equality: the key serializer
///   runs on the single argument and the flat store answers in one lookup.
///   The cheapest path and the common case.
/// * `Serialized` - fixed multi-argument signature with default equality: the
///   whole ordered argument list serializes into one key for the flat store.
/// * `Matched` - custom equality, a variadic pack, a `max_args` truncation
///   limit, or a forced override: recorded calls are scanned positionally.
///
/// # Examples
///
/// ```
/// use fnmemo::Strategy;
///
/// assert_eq!(Strategy::select::<(i32,)>(false, false, false), Strategy::Unary);
/// assert_eq!(Strategy::select::<(i32, i32)>(false, false, false), Strategy::Serialized);
/// assert_eq!(Strategy::select::<Vec<i32>>(false, false, false), Strategy::Matched);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Unary,
    Serialized,
    Matched,
}

impl Strategy {
    /// Picks the strategy for argument pack `A` under the given options.
    ///
    /// # Arguments
    ///
    /// * `has_equals` - A custom positional equality is configured
    /// * `forced_vargs` - The variadic override is set
    /// * `has_max_args` - A truncation limit is configured
    ///
    /// # Returns
    ///
    /// The strategy every call through the wrap will use.
    pub fn select<A: MemoArgs>(has_equals: bool, forced_vargs: bool, has_max_args: bool) -> Self {
        let variadic = A::ARITY.is_none() || forced_vargs;
        if variadic || has_equals || has_max_args {
            return Strategy::Matched;
        }
        if A::ARITY == Some(1) {
            Strategy::Unary
        } else {
            Strategy::Serialized
        }
    }
}
