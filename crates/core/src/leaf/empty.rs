use crate::context::ScanContext;
use crate::notify::Notifier;
use crate::scanner::{Items, Scanner};
use std::marker::PhantomData;
use std::rc::Rc;

/// Yields nothing, never notifies.
pub struct Empty<T> {
    notifier: Notifier,
    _items: PhantomData<fn() -> T>,
}
impl<T> Empty<T> {
    pub fn new() -> Self {
        Self {
            notifier: Notifier::new(),
            _items: PhantomData,
        }
    }
}
impl<T> Default for Empty<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Scanner<T> for Empty<T> {
    fn scan<'a>(self: Rc<Self>, _context: &'a ScanContext) -> Items<'a, T> {
        Box::new(std::iter::empty())
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScannerHandle;

    #[test]
    fn test_empty_yields_nothing() {
        let handle: ScannerHandle<u8> = ScannerHandle::new(Empty::new());
        assert!(handle.collect(&ScanContext::new()).unwrap().is_empty());
        assert_eq!(handle.notifier().subscriber_count(), 0);
    }
}
