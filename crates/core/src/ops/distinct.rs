use crate::context::ScanContext;
use crate::notify::Notifier;
use crate::parent::Parent;
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;

/// Yields the first occurrence of each distinct item, in parent order.
///
/// Items are compared by a key: the item itself for [`new`](Self::new), or a
/// projection for [`by_key`](Self::by_key). Every key seen during a scan is
/// held until the sequence is dropped.
pub struct Distinct<T, K = T> {
    parent: Parent<T>,
    key: Rc<dyn Fn(&T) -> K>,
    notifier: Notifier,
}
impl<T: Clone + Eq + Hash + 'static> Distinct<T, T> {
    pub fn new(parent: ScannerHandle<T>) -> Self {
        Self::by_key(parent, T::clone)
    }
}
impl<T, K> Distinct<T, K> {
    pub fn by_key(parent: ScannerHandle<T>, key: impl Fn(&T) -> K + 'static) -> Self {
        let notifier = Notifier::new();
        Self {
            parent: Parent::new(parent, &notifier),
            key: Rc::new(key),
            notifier,
        }
    }
}

impl<T: 'static, K: Eq + Hash + 'static> Scanner<T> for Distinct<T, K> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        let key = Rc::clone(&self.key);
        let mut seen = HashSet::new();
        Box::new(self.parent.items_or_empty(context).filter(move |item| match item {
            Ok(item) => seen.insert(key(item)),
            Err(_) => true,
        }))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Immutable;
    use crate::mock::MockScanner;
    use rstest::rstest;

    #[rstest]
    #[case(vec![1, 1, 2, 3, 4, 4, 4, 6], vec![1, 2, 3, 4, 6])]
    #[case(vec![3, 2, 3, 1, 2], vec![3, 2, 1])]
    #[case(vec![], vec![])]
    fn test_distinct_keeps_first_occurrences(#[case] input: Vec<i32>, #[case] expected: Vec<i32>) {
        let handle = ScannerHandle::new(Distinct::new(ScannerHandle::new(Immutable::new(input))));
        let ctx = ScanContext::new();
        assert_eq!(handle.collect(&ctx).unwrap(), expected);
        // A second scan starts with an empty seen-set.
        assert_eq!(handle.collect(&ctx).unwrap(), expected);
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let once = ScannerHandle::new(Distinct::new(ScannerHandle::new(Immutable::new([5, 5, 1, 5]))));
        let twice = ScannerHandle::new(Distinct::new(once.clone()));
        let ctx = ScanContext::new();
        assert_eq!(twice.collect(&ctx).unwrap(), once.collect(&ctx).unwrap());
    }

    #[test]
    fn test_distinct_by_key() {
        let parent = ScannerHandle::new(Immutable::new(["libc.so", "LIBC.SO", "libm.so"]));
        let handle = ScannerHandle::new(Distinct::by_key(parent, |name: &&str| name.to_lowercase()));
        assert_eq!(handle.collect(&ScanContext::new()).unwrap(), vec!["libc.so", "libm.so"]);
    }

    #[test]
    fn test_errors_are_not_recorded() {
        let parent = MockScanner::new([1, 1]).with_fault_at(5).handle();
        let handle = ScannerHandle::new(Distinct::new(parent));
        let results: Vec<_> = handle.scan(&ScanContext::new()).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Ok(1)));
        assert!(results[1].is_err());
    }
}
