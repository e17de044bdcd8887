use crate::context::ScanContext;
use crate::notify::Notifier;
use crate::scanner::{Items, Scanner};
use std::fmt;
use std::rc::Rc;

type Provider<T> = Rc<dyn for<'c> Fn(&'c ScanContext) -> Items<'c, T>>;

enum Source<T> {
    Fixed(Rc<[T]>),
    Deferred(Provider<T>),
}

/// A leaf over a fixed sequence, or over a provider that is asked again on
/// every scan. Never raises notifications.
pub struct Immutable<T> {
    source: Source<T>,
    notifier: Notifier,
}
impl<T> Immutable<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            source: Source::Fixed(items.into_iter().collect()),
            notifier: Notifier::new(),
        }
    }

    /// Wrap a data provider. It receives the scan's context and is invoked
    /// afresh for each scan.
    pub fn deferred<F>(provider: F) -> Self
    where
        F: for<'c> Fn(&'c ScanContext) -> Items<'c, T> + 'static,
    {
        Self {
            source: Source::Deferred(Rc::new(provider)),
            notifier: Notifier::new(),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.source, Source::Deferred(_))
    }
}

impl<T: Clone + 'static> Scanner<T> for Immutable<T> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        match &self.source {
            Source::Fixed(items) => {
                let items = Rc::clone(items);
                Box::new((0..items.len()).map(move |index| Ok(items[index].clone())))
            },
            Source::Deferred(provider) => provider(context),
        }
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
impl<T> fmt::Debug for Immutable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Fixed(items) => f.debug_struct("Immutable").field("len", &items.len()).finish(),
            Source::Deferred(_) => f.debug_struct("Immutable").field("deferred", &true).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScannerHandle;
    use std::cell::Cell;

    #[test]
    fn test_fixed_items_rescan() {
        let handle = ScannerHandle::new(Immutable::new(vec!["a", "b"]));
        let ctx = ScanContext::new();
        assert_eq!(handle.collect(&ctx).unwrap(), vec!["a", "b"]);
        assert_eq!(handle.collect(&ctx).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_deferred_recomputes_every_scan() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle = ScannerHandle::new(Immutable::deferred(move |_| {
            counter.set(counter.get() + 1);
            let n = counter.get();
            Box::new((0..n).map(Ok))
        }));
        let ctx = ScanContext::new();
        assert_eq!(handle.collect(&ctx).unwrap(), vec![0]);
        assert_eq!(handle.collect(&ctx).unwrap(), vec![0, 1]);
        assert_eq!(calls.get(), 2);
    }
}
