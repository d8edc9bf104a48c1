//! Error types for the combinator helpers.

/// Error returned by [`retry`](crate::retry).
///
/// A retry rejects either because the attempt budget ran out before the
/// predicate produced a value, or because the predicate itself failed.
///
/// # Examples
///
/// ```rust
/// use cadence::{retry, RetryError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let result: Result<u32, _> = retry(
///     || async { Ok::<_, String>(None) },
///     3,
///     Duration::from_millis(1),
/// )
/// .await;
///
/// let error = result.unwrap_err();
/// assert_eq!(error, RetryError::AttemptLimitExceeded { attempts: 3 });
/// assert_eq!(error.to_string(), "attempt limit exceeded");
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The predicate was invoked `attempts` times without producing a value.
    AttemptLimitExceeded {
        /// The configured attempt budget.
        attempts: u32,
    },
    /// The predicate itself failed; retrying stops immediately.
    Operation(E),
}

impl<E> RetryError<E> {
    /// Returns true if the attempt budget was exhausted.
    pub fn is_attempt_limit(&self) -> bool {
        matches!(self, Self::AttemptLimitExceeded { .. })
    }

    /// Extract the predicate's own error, if that is what stopped the retry.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::AttemptLimitExceeded { .. } => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttemptLimitExceeded { .. } => write!(f, "attempt limit exceeded"),
            Self::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AttemptLimitExceeded { .. } => None,
            Self::Operation(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_attempt_limit_display_is_exact() {
        let error: RetryError<String> = RetryError::AttemptLimitExceeded { attempts: 5 };
        assert_eq!(error.to_string(), "attempt limit exceeded");
        assert!(error.is_attempt_limit());
        assert_eq!(error.into_operation(), None);
    }

    #[test]
    fn test_operation_display_delegates() {
        let error = RetryError::Operation("connection refused".to_string());
        assert_eq!(error.to_string(), "connection refused");
        assert!(!error.is_attempt_limit());
        assert_eq!(
            error.into_operation(),
            Some("connection refused".to_string())
        );
    }
}
