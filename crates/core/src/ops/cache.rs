use crate::context::ScanContext;
use crate::error::Result;
use crate::notify::Notifier;
use crate::parent::Parent;
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::instrument;

type Slot<T> = Rc<RefCell<Option<Rc<[T]>>>>;

/// Memoizes the parent's items.
///
/// The first scan after construction or invalidation pulls the parent to
/// completion and stores the result; later scans replay it without touching
/// the parent. The slot is cleared by [`invalidate`](Self::invalidate) and by
/// any collection change the parent raises.
///
/// The stored items are shared by every context: a scan with a different
/// context still replays what the first scan produced.
///
/// Only a fault-free pull is stored. If the parent yields any `Err` element,
/// the scan yields that one error and none of the items pulled before it,
/// nothing is stored, and every later scan pulls the parent again until a
/// pull completes cleanly.
pub struct Cache<T> {
    parent: Parent<T>,
    slot: Slot<T>,
    notifier: Notifier,
}
impl<T: 'static> Cache<T> {
    pub fn new(parent: ScannerHandle<T>) -> Self {
        let notifier = Notifier::new();
        let slot: Slot<T> = Rc::default();
        let hooked = Rc::clone(&slot);
        let parent = Parent::with_hook(parent, &notifier, move |event| {
            if event.is_collection_changed() && hooked.borrow_mut().take().is_some() {
                tracing::trace!("Invalidating cache after parent collection change");
            }
        });
        Self { parent, slot, notifier }
    }
}
impl<T> Cache<T> {
    /// Drop the stored items. Idempotent.
    pub fn invalidate(&self) {
        if self.slot.borrow_mut().take().is_some() {
            tracing::trace!("Invalidating cache");
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The stored items, if any.
    pub fn items(&self) -> Option<Rc<[T]>> {
        self.slot.borrow().clone()
    }

    pub fn parent(&self) -> &ScannerHandle<T> {
        self.parent.scanner()
    }
}
impl<T: Clone> Cache<T> {
    /// Return the stored items, pulling and storing the parent's items first
    /// if the slot is empty.
    ///
    /// A parent fault is returned as-is and leaves the slot empty.
    #[instrument(level = "trace", skip_all)]
    pub fn materialize(&self, context: &ScanContext) -> Result<Rc<[T]>> {
        if let Some(items) = self.items() {
            tracing::trace!(len = items.len(), "Cache hit");
            return Ok(items);
        }
        let items: Rc<[T]> = self.parent.items_or_empty(context).collect::<Result<Vec<T>>>()?.into();
        tracing::trace!(len = items.len(), "Cache miss; materialized parent");
        *self.slot.borrow_mut() = Some(Rc::clone(&items));
        Ok(items)
    }
}

impl<T: Clone + 'static> Scanner<T> for Cache<T> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        match self.materialize(context) {
            Ok(items) => Box::new((0..items.len()).map(move |index| Ok(items[index].clone()))),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn as_cache(&self) -> Option<&Cache<T>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockScanner;
    use crate::notify::tests::Recorder;
    use crate::notify::{CollectionAction, Event};

    fn cached(items: Vec<i32>) -> (Rc<MockScanner<i32>>, Rc<Cache<i32>>) {
        let mock = Rc::new(MockScanner::new(items));
        let cache = Rc::new(Cache::new(ScannerHandle::from(Rc::clone(&mock))));
        (mock, cache)
    }

    #[test]
    fn test_one_pull_per_epoch() {
        let (mock, cache) = cached(vec![1, 2, 3]);
        let handle = ScannerHandle::from(Rc::clone(&cache));
        let ctx = ScanContext::new();
        assert_eq!(handle.collect(&ctx).unwrap(), vec![1, 2, 3]);
        assert_eq!(handle.collect(&ctx).unwrap(), vec![1, 2, 3]);
        assert_eq!(mock.pulls(), 1);
    }

    #[test]
    fn test_replays_same_array_across_contexts() {
        let (mock, cache) = cached(vec![1, 2]);
        let first = cache.materialize(&ScanContext::new()).unwrap();
        mock.set_items([7, 8, 9]);
        let second = cache.materialize(&ScanContext::new()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(&*second, &[1, 2]);
    }

    #[test]
    fn test_invalidate_repulls() {
        let (mock, cache) = cached(vec![1]);
        let handle = ScannerHandle::from(Rc::clone(&cache));
        let ctx = ScanContext::new();
        handle.collect(&ctx).unwrap();
        cache.invalidate();
        cache.invalidate();
        assert!(!cache.is_materialized());
        mock.set_items([2]);
        assert_eq!(handle.collect(&ctx).unwrap(), vec![2]);
        assert_eq!(mock.pulls(), 2);
    }

    #[test]
    fn test_parent_collection_change_invalidates_before_reraise() {
        let (mock, cache) = cached(vec![1]);
        cache.materialize(&ScanContext::new()).unwrap();

        let observed = Rc::new(RefCell::new(Vec::new()));
        let (sink, watched) = (Rc::clone(&observed), Rc::clone(&cache));
        let _subscription = cache.notifier().subscribe(move |_| sink.borrow_mut().push(watched.is_materialized()));
        let recorder = Recorder::on(cache.notifier());

        mock.raise(&Event::CollectionChanged(CollectionAction::Add));
        assert_eq!(*observed.borrow(), vec![false]);
        assert_eq!(recorder.collection_changes(), vec![CollectionAction::Reset]);
        cache.materialize(&ScanContext::new()).unwrap();
        assert_eq!(mock.pulls(), 2);
    }

    #[test]
    fn test_parent_property_change_keeps_items() {
        let (mock, cache) = cached(vec![1]);
        cache.materialize(&ScanContext::new()).unwrap();
        let recorder = Recorder::on(cache.notifier());
        mock.raise(&Event::property("Name"));
        assert!(cache.is_materialized());
        assert_eq!(recorder.properties(), vec!["Parent"]);
    }

    #[test]
    fn test_faults_are_not_cached() {
        let mock = Rc::new(MockScanner::new([1, 2, 3]).with_fault_at(1));
        let cache = Rc::new(Cache::new(ScannerHandle::from(Rc::clone(&mock))));
        let handle = ScannerHandle::from(Rc::clone(&cache));
        let ctx = ScanContext::new();

        // The good item before the fault is dropped along with everything after it.
        for _ in 0..2 {
            let results: Vec<_> = handle.scan(&ctx).collect();
            assert_eq!(results.len(), 1);
            assert!(results[0].is_err());
            assert!(!cache.is_materialized());
        }
        assert_eq!(mock.pulls(), 2);

        mock.clear_fault();
        assert_eq!(handle.collect(&ctx).unwrap(), vec![1, 2, 3]);
        assert_eq!(handle.collect(&ctx).unwrap(), vec![1, 2, 3]);
        assert_eq!(mock.pulls(), 3);
    }
}
