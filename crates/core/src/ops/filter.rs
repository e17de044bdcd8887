use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::notify::Notifier;
use crate::parent::Parent;
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A filter predicate. Receives the scan's context alongside each item.
pub type Predicate<T> = Rc<dyn Fn(&ScanContext, &T) -> bool>;

/// Keeps the parent's items that match at least one include predicate and no
/// exclude predicate.
///
/// Predicates may be added after construction (each addition announces itself
/// and resets downstream). Both lists are OR-combined.
pub struct Filter<T> {
    parent: Parent<T>,
    include: RefCell<Vec<Predicate<T>>>,
    exclude: RefCell<Vec<Predicate<T>>>,
    notifier: Notifier,
}
impl<T> Filter<T> {
    pub fn new(parent: ScannerHandle<T>) -> Self {
        let notifier = Notifier::new();
        Self {
            parent: Parent::new(parent, &notifier),
            include: RefCell::default(),
            exclude: RefCell::default(),
            notifier,
        }
    }

    /// Append an include predicate.
    pub fn add_include(&self, predicate: impl Fn(&ScanContext, &T) -> bool + 'static) -> &Self {
        self.include.borrow_mut().push(Rc::new(predicate));
        self.notifier.changed("Include");
        self
    }

    /// Append an exclude predicate.
    ///
    /// Fails if no include predicate exists yet: such a filter could never
    /// yield anything.
    pub fn add_exclude(&self, predicate: impl Fn(&ScanContext, &T) -> bool + 'static) -> Result<&Self> {
        if self.include.borrow().is_empty() {
            exn::bail!(ErrorKind::ExcludeWithoutInclude);
        }
        self.exclude.borrow_mut().push(Rc::new(predicate));
        self.notifier.changed("Exclude");
        Ok(self)
    }

    pub fn include_count(&self) -> usize {
        self.include.borrow().len()
    }

    pub fn exclude_count(&self) -> usize {
        self.exclude.borrow().len()
    }

    pub fn parent(&self) -> &ScannerHandle<T> {
        self.parent.scanner()
    }
}

impl<T: 'static> Scanner<T> for Filter<T> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        // Predicate lists are fixed for the lifetime of this sequence.
        let include = self.include.borrow().clone();
        let exclude = self.exclude.borrow().clone();
        Box::new(self.parent.items_or_empty(context).filter(move |item| match item {
            Ok(item) => {
                include.iter().any(|predicate| predicate(context, item))
                    && !exclude.iter().any(|predicate| predicate(context, item))
            },
            Err(_) => true,
        }))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn as_filter(&self) -> Option<&Filter<T>> {
        Some(self)
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("include", &self.include_count())
            .field("exclude", &self.exclude_count())
            .finish()
    }
}
