//! The shared error taxonomy used by every layer of `cpp_dbc`: the driver
//! registry, the connection pool and the transaction manager all return
//! `Result<T, DbError>`. There is a single canonical error channel; no
//! panicking/throwing alternative form is offered.

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::time::Duration;

use cpp_dbc_types::{DriverFamily, IsolationLevel};

/// A flat error taxonomy shared across the whole workspace.
///
/// Every variant exposes a stable short `code()` suitable for log
/// correlation, independent of the `Display` message (which may interpolate
/// run-time detail and is not stable across versions).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DbError {
    /// Malformed URL or missing `cpp_dbc:` prefix.
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Scheme unknown to the driver registry.
    #[error("no driver registered for scheme `{0}`")]
    NoDriver(String),

    /// A columnar driver was handed to a relational pool, or vice versa.
    #[error("wrong driver family: expected {expected}, found {found}")]
    WrongDriverFamily {
        /// The family the caller required.
        expected: DriverFamily,
        /// The family the resolved driver actually belongs to.
        found: DriverFamily,
    },

    /// The underlying driver refused or failed to open a physical
    /// connection.
    #[error("connection attempt failed: {0}")]
    ConnectFailed(String),

    /// The validation query raised. Used internally by the pool to trigger
    /// replacement; callers should rarely observe this variant directly
    /// since the pool recovers from it without propagating.
    #[error("connection validation failed: {0}")]
    ValidationFailed(String),

    /// `connection_timeout_ms` elapsed before idle capacity appeared.
    #[error("timed out after {0:?} waiting for an available connection")]
    BorrowTimeout(Duration),

    /// Operation attempted on a pool that is not running, or returned to a
    /// borrower once shutdown has begun.
    #[error("the pool is closed")]
    PoolClosed,

    /// Operation attempted on a closed connection, statement or result set.
    #[error("the connection is closed")]
    ConnectionClosed,

    /// The requested isolation level is unsupported by the backend (for
    /// example, SQLite does not implement true `SERIALIZABLE` isolation
    /// outside its single-writer lock).
    #[error("isolation level {0} is not supported by this backend")]
    UnsupportedIsolation(IsolationLevel),

    /// The transaction id is not known to the manager, either because it
    /// never existed or because it already committed/rolled back.
    #[error("unknown transaction id `{0}`")]
    UnknownTransaction(String),

    /// A placeholder index was out of range, or a bound value's type did
    /// not match the column/placeholder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any backend-reported failure not captured by a more specific
    /// variant above, carrying the native error code (if any) and message.
    #[error("driver error{}: {message}", native_code_suffix(.code))]
    DriverError {
        /// The backend's native error code, when one was reported.
        code: Option<String>,
        /// The backend's error message.
        message: String,
    },
}

fn native_code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" [{code}]"),
        None => String::new(),
    }
}

impl DbError {
    /// A stable short code for log correlation, independent of the
    /// interpolated `Display` message.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "CPPDBC-INVALID-URL",
            Self::NoDriver(_) => "CPPDBC-NO-DRIVER",
            Self::WrongDriverFamily { .. } => "CPPDBC-WRONG-FAMILY",
            Self::ConnectFailed(_) => "CPPDBC-CONNECT-FAILED",
            Self::ValidationFailed(_) => "CPPDBC-VALIDATION-FAILED",
            Self::BorrowTimeout(_) => "CPPDBC-BORROW-TIMEOUT",
            Self::PoolClosed => "CPPDBC-POOL-CLOSED",
            Self::ConnectionClosed => "CPPDBC-CONNECTION-CLOSED",
            Self::UnsupportedIsolation(_) => "CPPDBC-UNSUPPORTED-ISOLATION",
            Self::UnknownTransaction(_) => "CPPDBC-UNKNOWN-TRANSACTION",
            Self::InvalidParameter(_) => "CPPDBC-INVALID-PARAMETER",
            Self::DriverError { .. } => "CPPDBC-DRIVER-ERROR",
        }
    }

    /// `true` if a retry with the same arguments has a reasonable chance of
    /// succeeding (timeouts and transient connection failures), as opposed
    /// to a programming error that will fail identically every time.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed(_) | Self::ValidationFailed(_) | Self::BorrowTimeout(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_distinct() {
        let errors: Vec<DbError> = vec![
            DbError::InvalidUrl("x".into()),
            DbError::NoDriver("mysql".into()),
            DbError::WrongDriverFamily {
                expected: DriverFamily::Relational,
                found: DriverFamily::Columnar,
            },
            DbError::ConnectFailed("refused".into()),
            DbError::ValidationFailed("SELECT 1 failed".into()),
            DbError::BorrowTimeout(Duration::from_millis(500)),
            DbError::PoolClosed,
            DbError::ConnectionClosed,
            DbError::UnsupportedIsolation(IsolationLevel::Serializable),
            DbError::UnknownTransaction("abc".into()),
            DbError::InvalidParameter("index 4 out of range".into()),
            DbError::DriverError {
                code: Some("1205".into()),
                message: "deadlock".into(),
            },
        ];

        let mut codes: Vec<&str> = errors.iter().map(DbError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len(), "every variant has a unique code");
    }

    #[test]
    fn driver_error_without_code_omits_bracket_suffix() {
        let err = DbError::DriverError {
            code: None,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "driver error: boom");
    }

    #[test]
    fn driver_error_with_code_includes_bracket_suffix() {
        let err = DbError::DriverError {
            code: Some("40501".into()),
            message: "throttled".into(),
        };
        assert_eq!(err.to_string(), "driver error [40501]: throttled");
    }

    #[test]
    fn transient_classification_matches_propagation_policy() {
        assert!(DbError::BorrowTimeout(Duration::from_secs(1)).is_transient());
        assert!(!DbError::PoolClosed.is_transient());
        assert!(!DbError::UnknownTransaction("x".into()).is_transient());
    }
}
