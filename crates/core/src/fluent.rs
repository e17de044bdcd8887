//! Fluent pipeline construction.
//!
//! Every method takes `&self` and returns a handle to the resulting node,
//! leaving the receiver usable. Filters and aggregates are extended in place
//! when the receiver already is one; every other operator wraps the receiver
//! in a new node.

use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::ops::{Aggregate, Cache, Distinct, Filter, MetadataContext, Reflect, Transform, TransformMany};
use crate::scanner::{Items, ScannerHandle};
use exn::ResultExt;
use std::error::Error as StdError;
use std::hash::Hash;

impl<T: 'static> ScannerHandle<T> {
    /// Keep items matching `predicate` (or any other include predicate).
    pub fn include(&self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.include_with(move |_, item| predicate(item))
    }

    pub fn include_with(&self, predicate: impl Fn(&ScanContext, &T) -> bool + 'static) -> Self {
        if let Some(filter) = self.as_filter() {
            filter.add_include(predicate);
            return self.clone();
        }
        let filter = Filter::new(self.clone());
        filter.add_include(predicate);
        Self::new(filter)
    }

    /// Drop items matching `predicate`.
    ///
    /// The receiver must already be a filter with at least one include
    /// predicate; anything else is a usage error.
    pub fn exclude(&self, predicate: impl Fn(&T) -> bool + 'static) -> Result<Self> {
        self.exclude_with(move |_, item| predicate(item))
    }

    pub fn exclude_with(&self, predicate: impl Fn(&ScanContext, &T) -> bool + 'static) -> Result<Self> {
        let Some(filter) = self.as_filter() else {
            exn::bail!(ErrorKind::ExcludeWithoutInclude);
        };
        filter.add_exclude(predicate)?;
        Ok(self.clone())
    }

    pub fn transform<U: 'static>(&self, project: impl Fn(T) -> U + 'static) -> ScannerHandle<U> {
        self.transform_with(move |_, item| project(item))
    }

    pub fn transform_with<U: 'static>(&self, project: impl Fn(&ScanContext, T) -> U + 'static) -> ScannerHandle<U> {
        ScannerHandle::new(Transform::new(self.clone(), project))
    }

    /// A projection that may fail; failures surface as
    /// [`ErrorKind::Transform`] elements wrapping the projection's error.
    pub fn try_transform<U, E>(
        &self,
        project: impl Fn(&ScanContext, T) -> std::result::Result<U, exn::Exn<E>> + 'static,
    ) -> ScannerHandle<U>
    where
        U: 'static,
        E: StdError + Send + Sync + 'static,
    {
        ScannerHandle::new(Transform::fallible(self.clone(), move |context, item| {
            project(context, item).or_raise(|| ErrorKind::Transform)
        }))
    }

    pub fn transform_many<U, I>(&self, project: impl Fn(T) -> I + 'static) -> ScannerHandle<U>
    where
        U: 'static,
        I: IntoIterator<Item = U>,
        I::IntoIter: 'static,
    {
        self.transform_many_with(move |_, item| Box::new(project(item).into_iter().map(Ok)))
    }

    /// Flatten each item into whatever sequence `project` produces for it.
    /// This is how leaf data providers that need the scan context plug in.
    pub fn transform_many_with<U, F>(&self, project: F) -> ScannerHandle<U>
    where
        U: 'static,
        F: for<'c> Fn(&'c ScanContext, T) -> Items<'c, U> + 'static,
    {
        ScannerHandle::new(TransformMany::new(self.clone(), project))
    }

    pub fn distinct(&self) -> Self
    where
        T: Clone + Eq + Hash,
    {
        Self::new(Distinct::new(self.clone()))
    }

    pub fn distinct_by<K>(&self, key: impl Fn(&T) -> K + 'static) -> Self
    where
        K: Eq + Hash + 'static,
    {
        Self::new(Distinct::by_key(self.clone(), key))
    }

    pub fn cache(&self) -> Self
    where
        T: Clone,
    {
        Self::new(Cache::new(self.clone()))
    }

    /// Concatenate `others` after the receiver's items. An aggregate receiver
    /// is extended in place.
    pub fn aggregate(&self, others: impl IntoIterator<Item = ScannerHandle<T>>) -> Self {
        if let Some(aggregate) = self.as_aggregate() {
            aggregate.extend(others);
            return self.clone();
        }
        Self::new(Aggregate::with_members(std::iter::once(self.clone()).chain(others)))
    }

    pub fn reflect(&self, metadata: impl MetadataContext<T> + 'static) -> Self {
        Self::new(Reflect::new(self.clone(), metadata))
    }
}
