//! In-memory scanner for testing.

use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::notify::{Event, Notifier};
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// In-memory scanner for testing.
///
/// Yields a clone of its items on every scan and counts how often it was
/// pulled, so tests can tell whether an operator (a cache, say) went back to
/// its parent. Notifications never fire on their own; tests raise them with
/// [`raise`](Self::raise).
pub struct MockScanner<T> {
    items: RefCell<Vec<T>>,
    fault_at: Cell<Option<usize>>,
    pulls: Cell<usize>,
    notifier: Notifier,
}
impl<T> MockScanner<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: RefCell::new(items.into_iter().collect()),
            fault_at: Cell::new(None),
            pulls: Cell::new(0),
            notifier: Notifier::new(),
        }
    }

    /// Yield an `Err` element in place of the item at `index` (or after the
    /// last item, when `index` is past the end).
    pub fn with_fault_at(self, index: usize) -> Self {
        self.fault_at.set(Some(index));
        self
    }

    pub fn clear_fault(&self) {
        self.fault_at.set(None);
    }

    /// Replace the items returned by subsequent scans. Raises nothing.
    pub fn set_items(&self, items: impl IntoIterator<Item = T>) {
        *self.items.borrow_mut() = items.into_iter().collect();
    }

    /// Number of times [`scan`](Scanner::scan) has been called.
    pub fn pulls(&self) -> usize {
        self.pulls.get()
    }

    pub fn raise(&self, event: &Event) {
        self.notifier.notify(event);
    }
}
impl<T: Clone + 'static> MockScanner<T> {
    pub fn handle(self) -> ScannerHandle<T> {
        ScannerHandle::new(self)
    }
}

impl<T: Clone + 'static> Scanner<T> for MockScanner<T> {
    fn scan<'a>(self: Rc<Self>, _context: &'a ScanContext) -> Items<'a, T> {
        self.pulls.set(self.pulls.get() + 1);
        let mut items: Vec<Result<T>> = self.items.borrow().iter().cloned().map(Ok).collect();
        if let Some(index) = self.fault_at.get() {
            let fault = Err(exn::Exn::from(ErrorKind::Source("mock".to_string())));
            if index < items.len() {
                items[index] = fault;
            } else {
                items.push(fault);
            }
        }
        Box::new(items.into_iter())
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_pulls() {
        let mock = Rc::new(MockScanner::new(["a", "b"]));
        let handle = ScannerHandle::from(Rc::clone(&mock));
        let ctx = ScanContext::new();
        handle.collect(&ctx).unwrap();
        handle.collect(&ctx).unwrap();
        assert_eq!(mock.pulls(), 2);
    }

    #[test]
    fn test_fault_replaces_item() {
        let handle = MockScanner::new([1, 2, 3]).with_fault_at(1).handle();
        let results: Vec<_> = handle.scan(&ScanContext::new()).collect();
        assert!(matches!(results[0], Ok(1)));
        assert!(matches!(&results[1], Err(e) if matches!(&**e, ErrorKind::Source(_))));
        assert!(matches!(results[2], Ok(3)));
    }

    #[test]
    fn test_set_items() {
        let mock = Rc::new(MockScanner::new([1]));
        mock.set_items([4, 5]);
        let handle = ScannerHandle::from(Rc::clone(&mock));
        assert_eq!(handle.collect(&ScanContext::new()).unwrap(), vec![4, 5]);
    }
}
