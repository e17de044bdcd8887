//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Operators never catch anything:
//! errors either come from a usage mistake at pipeline-build time, or they
//! were raised by a leaf adapter and travel through the chain untouched.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Usage Errors
/// Returned synchronously from the call that violated a precondition.
/// - [`ErrorKind::ExcludeWithoutInclude`]
/// - [`ErrorKind::IndexOutOfRange`]
///
/// ### Data Errors
/// Surfaced as `Err` elements of a scanned sequence.
/// - [`ErrorKind::Source`]
/// - [`ErrorKind::Transform`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An exclude predicate was added to a filter that has no include
    /// predicates; the filter would never yield anything.
    #[display("at least one include must exist before an exclude can be added")]
    ExcludeWithoutInclude,
    /// An aggregate member index was outside the member list.
    #[display("scanner index {index} is out of range for {len} members")]
    IndexOutOfRange { index: usize, len: usize },
    /// A leaf adapter failed with a fault that no ignore policy swallowed.
    #[display("source operation '{_0}' failed")]
    Source(#[error(not(source))] String),
    /// A projection function failed.
    #[display("transform failed")]
    Transform,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Usage errors will fail the same way every time; a source may have
        // hit something transient (the leaf error tree has the details).
        matches!(self, Self::Source(_))
    }
}
