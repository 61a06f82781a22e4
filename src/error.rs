//! Error types for reactive-vdom.
//!
//! Nothing in the core raises under normal use. Misuse (writing through a
//! read-only view, writing a computed value) is suppressed and logged; the
//! `try_*` variants of those operations surface the same condition as a
//! [`ReactiveError`] instead.

use compact_str::CompactString;
use thiserror::Error;

/// Conditions reported by the reactive core and the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A write was attempted through a read-only view
    #[error("cannot set key `{key}`: target is readonly")]
    ReadonlyMutation {
        /// Property key of the rejected write
        key: CompactString,
    },

    /// A write was attempted on a derived value
    #[error("cannot set a computed value")]
    ComputedWrite,

    /// A component has neither a render function nor a setup returning one
    #[error("component `{component}` is missing a render function")]
    MissingRender {
        /// Name of the offending component definition
        component: CompactString,
    },

    /// A job kept re-queueing itself during one flush
    #[error("maximum recursive updates exceeded ({limit})")]
    RecursionLimit {
        /// Configured recursion limit
        limit: usize,
    },
}

/// Result type alias for reactive operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;

impl ReactiveError {
    /// Create a read-only mutation error for `key`.
    pub fn readonly(key: impl Into<CompactString>) -> Self {
        Self::ReadonlyMutation { key: key.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReactiveError::readonly("count");
        assert_eq!(err.to_string(), "cannot set key `count`: target is readonly");

        let err = ReactiveError::RecursionLimit { limit: 100 };
        assert_eq!(err.to_string(), "maximum recursive updates exceeded (100)");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReactiveError>();
    }
}
