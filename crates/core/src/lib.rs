//! Lazy, event-propagating scanner pipelines.
//!
//! A pipeline is a chain of [`Scanner`] nodes: a leaf that produces items
//! wrapped by operators that filter, project, deduplicate, cache or
//! concatenate them. Nothing runs until [`ScannerHandle::scan`] pulls the
//! chain with a [`ScanContext`]. Change notifications travel the other way,
//! from leaf to root, and are what lets a [`Cache`](ops::Cache) invalidate
//! itself.

mod context;
pub mod error;
pub mod factory;
mod fluent;
mod ignore;
pub mod leaf;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod notify;
pub mod ops;
mod parent;
mod scanner;

pub use crate::context::{ScanContext, ScanOption};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::ignore::{IgnoreByType, IgnoreException, IgnoreOperations};
pub use crate::leaf::ObservableVec;
pub use crate::notify::{CollectionAction, Event, Notifier, Subscription};
pub use crate::ops::MetadataContext;
pub use crate::parent::Parent;
pub use crate::scanner::{Items, Scanner, ScannerHandle};
