//! Parent-linked nodes.

use crate::context::ScanContext;
use crate::notify::{Event, Notifier, Subscription};
use crate::scanner::{Items, ScannerHandle};

/// The upstream half of an operator node.
///
/// Holds exactly one parent scanner and forwards its notifications to the
/// owning node's [`Notifier`], normalized: property changes always arrive as
/// `"Parent"` and collection changes always as a reset. The forwarding
/// subscription lives exactly as long as this value.
pub struct Parent<T> {
    scanner: ScannerHandle<T>,
    _subscription: Subscription,
}
impl<T> Parent<T> {
    pub fn new(scanner: ScannerHandle<T>, downstream: &Notifier) -> Self {
        Self::with_hook(scanner, downstream, |_| {})
    }

    /// Like [`new`](Self::new), running `hook` on every parent event before
    /// it is re-raised downstream.
    pub fn with_hook(scanner: ScannerHandle<T>, downstream: &Notifier, hook: impl Fn(&Event) + 'static) -> Self {
        let downstream = downstream.clone();
        let subscription = scanner.notifier().subscribe(move |event| {
            hook(event);
            match event {
                Event::PropertyChanged(_) => downstream.property_changed("Parent"),
                Event::CollectionChanged(_) => downstream.collection_changed(),
            }
        });
        Self {
            scanner,
            _subscription: subscription,
        }
    }

    pub fn scanner(&self) -> &ScannerHandle<T> {
        &self.scanner
    }

    /// Pull the parent's items.
    pub fn items_or_empty<'a>(&self, context: &'a ScanContext) -> Items<'a, T> {
        self.scanner.scan(context)
    }
}
