//! Ignore policies.
//!
//! Bridging adapters (the leaves that touch files, images, and other outside
//! state) absorb the faults they know to be recoverable on their own. For
//! anything else they ask the [`ScanContext`]: if any installed
//! [`IgnoreException`] returns `true` the offending item is omitted,
//! otherwise the fault surfaces as an `Err` element of the scanned sequence.

use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use std::any::type_name;
use std::collections::HashSet;
use std::error::Error as StdError;

/// Decides whether a fault caught during `operation` should be swallowed.
pub trait IgnoreException {
    fn ignore_exception(&self, operation: &str, error: &(dyn StdError + 'static)) -> bool;
}

impl<F> IgnoreException for F
where
    F: Fn(&str, &(dyn StdError + 'static)) -> bool,
{
    fn ignore_exception(&self, operation: &str, error: &(dyn StdError + 'static)) -> bool {
        self(operation, error)
    }
}

fn is_type<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

/// Swallows faults of any registered error type, wherever it appears in the
/// error's [`source`](StdError::source) chain.
///
/// ```
/// use scry_core::{IgnoreByType, IgnoreException};
///
/// let policy = IgnoreByType::new().with::<std::io::Error>();
/// let error = std::io::Error::other("disk on fire");
/// assert!(policy.ignore_exception("read_image", &error));
/// ```
#[derive(Default)]
pub struct IgnoreByType {
    types: Vec<(&'static str, fn(&(dyn StdError + 'static)) -> bool)>,
}
impl IgnoreByType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<E: StdError + 'static>(mut self) -> Self {
        self.types.push((type_name::<E>(), is_type::<E>));
        self
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.iter().map(|(name, _)| *name)
    }
}
impl IgnoreException for IgnoreByType {
    fn ignore_exception(&self, _operation: &str, error: &(dyn StdError + 'static)) -> bool {
        std::iter::successors(Some(error), |&e| e.source()).any(|e| self.types.iter().any(|(_, is_match)| is_match(e)))
    }
}

/// Swallows every fault raised by the named operations.
#[derive(Debug, Default, Clone)]
pub struct IgnoreOperations {
    operations: HashSet<String>,
}
impl IgnoreOperations {
    pub fn new(operations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            operations: operations.into_iter().map(Into::into).collect(),
        }
    }
}
impl IgnoreException for IgnoreOperations {
    fn ignore_exception(&self, operation: &str, _error: &(dyn StdError + 'static)) -> bool {
        self.operations.contains(operation)
    }
}

impl ScanContext {
    /// Resolve a fault caught by a bridging adapter.
    ///
    /// Returns `None` when an ignore policy swallowed the fault (omit the
    /// item), or the fault raised into this crate's error tree otherwise.
    pub fn recover<T, E>(&self, operation: &str, error: exn::Exn<E>) -> Option<Result<T>>
    where
        E: StdError + Send + Sync + 'static,
    {
        let cause: &E = &error;
        if self.ignore_exception(operation, cause) {
            tracing::debug!(operation, error = %cause, "Ignoring fault per scan context policy");
            return None;
        }
        Some(Err(error.raise(ErrorKind::Source(operation.to_string()))))
    }
}
