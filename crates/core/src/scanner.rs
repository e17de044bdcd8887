//! The scanner contract.
//!
//! A [`Scanner`] is a node in a pipeline. Leaves produce items, operators wrap
//! a parent and reshape what it produces. Nothing is enumerated until
//! [`scan`](ScannerHandle::scan) is called with a [`ScanContext`], and every
//! call pulls through the chain again (only [`Cache`] remembers anything).

use crate::context::ScanContext;
use crate::error::Result;
use crate::notify::Notifier;
use crate::ops::{Aggregate, Cache, Filter};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// A lazily evaluated sequence of scanned items.
///
/// Faults travel as `Err` elements; operators pass them through untouched.
pub type Items<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Pull contract shared by every pipeline node.
///
/// Implementors receive themselves as an `Rc` so the returned sequence can hold
/// on to whatever node state it needs, borrowing nothing but the context.
pub trait Scanner<T> {
    /// Enumerate the items this node provides for `context`.
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T>;

    /// The node's change notifications.
    fn notifier(&self) -> &Notifier;

    /// Downcast to a filter, if this node is one. Lets the fluent surface
    /// extend an existing filter instead of stacking a new one.
    fn as_filter(&self) -> Option<&Filter<T>> {
        None
    }

    fn as_cache(&self) -> Option<&Cache<T>> {
        None
    }

    fn as_aggregate(&self) -> Option<&Aggregate<T>> {
        None
    }
}

/// Shared handle to a pipeline node.
///
/// Cloning is cheap and yields another handle to the same node; node identity
/// is pointer identity (see [`ptr_eq`](Self::ptr_eq)).
pub struct ScannerHandle<T>(Rc<dyn Scanner<T>>);

impl<T> ScannerHandle<T> {
    pub fn new<S>(scanner: S) -> Self
    where
        S: Scanner<T> + 'static,
    {
        Self(Rc::new(scanner))
    }

    /// Enumerate the node's items for `context`.
    pub fn scan<'a>(&self, context: &'a ScanContext) -> Items<'a, T> {
        Rc::clone(&self.0).scan(context)
    }

    /// Run the pipeline to completion, stopping at the first fault.
    pub fn collect(&self, context: &ScanContext) -> Result<Vec<T>> {
        self.scan(context).collect()
    }

    /// `true` when both handles refer to the same node.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }
}
impl<T> Clone for ScannerHandle<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}
impl<T> Deref for ScannerHandle<T> {
    type Target = dyn Scanner<T>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
impl<T, S> From<Rc<S>> for ScannerHandle<T>
where
    S: Scanner<T> + 'static,
{
    fn from(scanner: Rc<S>) -> Self {
        Self(scanner)
    }
}
impl<T> fmt::Debug for ScannerHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerHandle")
            .field("node", &Rc::as_ptr(&self.0).cast::<()>())
            .field("subscribers", &self.0.notifier().subscriber_count())
            .finish()
    }
}
