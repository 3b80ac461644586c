use thiserror::Error;

/// Errors surfaced at wrap time.
///
/// Invocation itself never produces crate-level errors: a memoized function
/// propagates whatever its wrapped function returns (or panics with), and the
/// cache is left untouched by a failed call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoError {
    /// A builder option is statically invalid, e.g. `max_args(0)` or a zero
    /// `max_age`.
    #[error("invalid memoization option: {0}")]
    InvalidOptions(String),
}
