//! Entry points for building pipelines.
//!
//! ```
//! use scry_core::factory;
//!
//! let libraries = factory::immutable(["libc.so", "app.exe", "libm.so"])
//!     .include(|name| name.ends_with(".so"))
//!     .transform(str::len)
//!     .cache();
//! assert_eq!(libraries.collect(&factory::context()).unwrap(), vec![7, 7]);
//! ```

use crate::context::ScanContext;
use crate::leaf::{Empty, Immutable, Observable, ObservableVec};
use crate::ops::Aggregate;
use crate::scanner::{Items, ScannerHandle};

/// A fresh context for one top-level scan.
pub fn context() -> ScanContext {
    ScanContext::new()
}

/// A scanner that yields nothing.
pub fn empty<T: 'static>() -> ScannerHandle<T> {
    ScannerHandle::new(Empty::new())
}

/// A scanner over a fixed sequence.
pub fn immutable<T: Clone + 'static>(items: impl IntoIterator<Item = T>) -> ScannerHandle<T> {
    ScannerHandle::new(Immutable::new(items))
}

/// A scanner that asks `provider` for its items on every scan.
pub fn deferred<T, F>(provider: F) -> ScannerHandle<T>
where
    T: Clone + 'static,
    F: for<'c> Fn(&'c ScanContext) -> Items<'c, T> + 'static,
{
    ScannerHandle::new(Immutable::deferred(provider))
}

/// A scanner concatenating `scanners` in order.
pub fn aggregate<T: 'static>(scanners: impl IntoIterator<Item = ScannerHandle<T>>) -> ScannerHandle<T> {
    ScannerHandle::new(Aggregate::with_members(scanners))
}

/// A scanner over a caller-owned observable list.
pub fn observable<T: Clone + 'static>(items: ObservableVec<T>) -> ScannerHandle<T> {
    ScannerHandle::new(Observable::new(items))
}
