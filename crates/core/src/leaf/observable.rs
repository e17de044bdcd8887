use crate::context::ScanContext;
use crate::notify::{CollectionAction, Event, Notifier, Subscription};
use crate::scanner::{Items, Scanner};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Shared<T> {
    items: RefCell<Vec<T>>,
    notifier: Notifier,
}

/// A caller-owned list that announces every mutation.
///
/// Cloning yields another handle to the same list. Each mutation raises one
/// [`Event::CollectionChanged`] carrying the native action (`Add`, `Remove`,
/// `Replace`, `Move` or `Reset`).
pub struct ObservableVec<T> {
    shared: Rc<Shared<T>>,
}
impl<T> ObservableVec<T> {
    pub fn new() -> Self {
        Self::from_iter(std::iter::empty())
    }

    pub fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }

    pub fn len(&self) -> usize {
        self.shared.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, item: T) {
        self.shared.items.borrow_mut().push(item);
        self.raise(CollectionAction::Add);
    }

    /// Insert at `index`. Returns `false` (and drops `item`) when `index` is
    /// past the end.
    pub fn insert(&self, index: usize, item: T) -> bool {
        {
            let mut items = self.shared.items.borrow_mut();
            if index > items.len() {
                return false;
            }
            items.insert(index, item);
        }
        self.raise(CollectionAction::Add);
        true
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.shared.items.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.raise(CollectionAction::Remove);
        }
        removed
    }

    /// Overwrite the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let previous = {
            let mut items = self.shared.items.borrow_mut();
            items.get_mut(index).map(|slot| std::mem::replace(slot, item))
        };
        if previous.is_some() {
            self.raise(CollectionAction::Replace);
        }
        previous
    }

    pub fn move_item(&self, from: usize, to: usize) -> bool {
        {
            let mut items = self.shared.items.borrow_mut();
            if from >= items.len() || to >= items.len() {
                return false;
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.raise(CollectionAction::Move);
        true
    }

    /// Remove every item. Always raises a reset, even when already empty.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.shared.items.borrow_mut());
        drop(removed);
        self.raise(CollectionAction::Reset);
    }

    fn raise(&self, action: CollectionAction) {
        self.shared.notifier.notify(&Event::CollectionChanged(action));
    }
}
impl<T: Clone> ObservableVec<T> {
    /// The current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.shared.items.borrow().clone()
    }
}
impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}
impl<T> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> FromIterator<T> for ObservableVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            shared: Rc::new(Shared {
                items: RefCell::new(iter.into_iter().collect()),
                notifier: Notifier::new(),
            }),
        }
    }
}
impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.shared.items.borrow().iter()).finish()
    }
}

/// A leaf over an [`ObservableVec`].
///
/// Scans the list's contents at call time. Each native change is re-raised as
/// a property change named `"Items"` followed by a collection reset.
pub struct Observable<T> {
    source: ObservableVec<T>,
    notifier: Notifier,
    _subscription: Subscription,
}
impl<T> Observable<T> {
    pub fn new(source: ObservableVec<T>) -> Self {
        let notifier = Notifier::new();
        let downstream = notifier.clone();
        let subscription = source.notifier().subscribe(move |event| {
            if event.is_collection_changed() {
                downstream.changed("Items");
            }
        });
        Self {
            source,
            notifier,
            _subscription: subscription,
        }
    }

    pub fn source(&self) -> &ObservableVec<T> {
        &self.source
    }
}

impl<T: Clone + 'static> Scanner<T> for Observable<T> {
    fn scan<'a>(self: Rc<Self>, _context: &'a ScanContext) -> Items<'a, T> {
        Box::new(self.source.snapshot().into_iter().map(Ok))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
