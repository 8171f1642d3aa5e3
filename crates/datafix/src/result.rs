use crate::error::DataError;

/// Outcome of a decode, read or conversion step.
///
/// Expected failures (a missing field, a string where a number was needed)
/// are reported as values of this type instead of as Rust errors, so callers
/// can branch on them and keep whatever was salvaged.
///
/// - `Success(value)`: the operation produced a complete value.
/// - `Error { partial: None, .. }`: nothing usable was produced.
/// - `Error { partial: Some(value), .. }`: a best-effort value is available.
///
/// # Example
///
/// ```
/// use datafix::DataResult;
///
/// let ok: DataResult<i32> = DataResult::success(4);
/// assert_eq!(ok.map(|v| v * 2).result(), Some(8));
///
/// let partial = DataResult::partial(1, "second element malformed");
/// assert!(partial.is_error());
/// assert_eq!(partial.result_or_partial(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DataResult<T> {
    /// A complete value.
    Success(T),
    /// A failure, optionally carrying a partial value.
    Error {
        /// Human readable description of what went wrong.
        message: String,
        /// Best-effort value, if one could be produced.
        partial: Option<T>,
    },
}

impl<T> DataResult<T> {
    /// Create a successful result.
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Create an error without a partial value.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            partial: None,
        }
    }

    /// Create an error that still carries a best-effort value.
    pub fn partial(value: T, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            partial: Some(value),
        }
    }

    /// Lift an `Option` into a result, using `message` when it is `None`.
    pub fn from_option(value: Option<T>, message: impl FnOnce() -> String) -> Self {
        match value {
            Some(value) => Self::Success(value),
            None => Self::error(message()),
        }
    }

    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for either error flavor.
    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// The complete value, discarding partials.
    pub fn result(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// A reference to the partial value of an error, if any.
    pub fn partial_value(&self) -> Option<&T> {
        match self {
            Self::Success(_) => None,
            Self::Error { partial, .. } => partial.as_ref(),
        }
    }

    /// The complete value, or the partial one if the result is an error.
    pub fn result_or_partial(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error { partial, .. } => partial,
        }
    }

    /// The error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { message, .. } => Some(message.as_str()),
        }
    }

    /// Transform the value (complete or partial).
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DataResult<U> {
        match self {
            Self::Success(value) => DataResult::Success(f(value)),
            Self::Error { message, partial } => DataResult::Error {
                message,
                partial: partial.map(f),
            },
        }
    }

    /// Chain a dependent computation.
    ///
    /// A partial value is fed into `f`; if `f` fails too, both messages are
    /// kept.
    pub fn flat_map<U>(self, f: impl FnOnce(T) -> DataResult<U>) -> DataResult<U> {
        match self {
            Self::Success(value) => f(value),
            Self::Error {
                message,
                partial: None,
            } => DataResult::error(message),
            Self::Error {
                message,
                partial: Some(value),
            } => match f(value) {
                DataResult::Success(next) => DataResult::partial(next, message),
                DataResult::Error {
                    message: next_message,
                    partial,
                } => DataResult::Error {
                    message: join_messages(&message, &next_message),
                    partial,
                },
            },
        }
    }

    /// Rewrite the error message, leaving successes alone.
    pub fn map_error(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Self::Success(value) => Self::Success(value),
            Self::Error { message, partial } => Self::Error {
                message: f(message),
                partial,
            },
        }
    }

    /// Turn a partial result into a success, reporting the dropped message.
    pub fn promote_partial(self, on_error: impl FnOnce(&str)) -> Self {
        match self {
            Self::Error {
                message,
                partial: Some(value),
            } => {
                on_error(&message);
                Self::Success(value)
            }
            other => other,
        }
    }

    /// Combine two results, accumulating messages from both sides.
    ///
    /// A partial value is produced only when both sides produced one.
    pub fn apply2<U, R>(self, other: DataResult<U>, f: impl FnOnce(T, U) -> R) -> DataResult<R> {
        match (self, other) {
            (Self::Success(a), DataResult::Success(b)) => DataResult::Success(f(a, b)),
            (left, right) => {
                let message = match (left.error_message(), right.error_message()) {
                    (Some(l), Some(r)) => join_messages(l, r),
                    (Some(l), None) => l.to_string(),
                    (None, Some(r)) => r.to_string(),
                    (None, None) => String::new(),
                };
                let partial = match (left.result_or_partial(), right.result_or_partial()) {
                    (Some(a), Some(b)) => Some(f(a, b)),
                    _ => None,
                };
                DataResult::Error { message, partial }
            }
        }
    }

    /// Fall back to a computed value when there is no complete result.
    pub fn or_else_get(self, f: impl FnOnce(&str) -> T) -> T {
        match self {
            Self::Success(value) => value,
            Self::Error { message, .. } => f(&message),
        }
    }

    /// Convert into a standard `Result`, dropping any partial value.
    pub fn into_result(self) -> Result<T, DataError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error { message, .. } => Err(DataError::new(message)),
        }
    }
}

impl<T> From<Result<T, DataError>> for DataResult<T> {
    fn from(result: Result<T, DataError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::error(err.message),
        }
    }
}

pub(crate) fn join_messages(first: &str, second: &str) -> String {
    if first.is_empty() {
        second.to_string()
    } else if second.is_empty() {
        first.to_string()
    } else {
        format!("{first}; {second}")
    }
}
