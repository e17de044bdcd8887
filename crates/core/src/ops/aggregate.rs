use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::notify::{Event, Notifier, Subscription};
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::cell::RefCell;
use std::rc::Rc;

struct Member<T> {
    scanner: ScannerHandle<T>,
    _subscription: Subscription,
}
impl<T> Member<T> {
    fn new(scanner: ScannerHandle<T>, downstream: &Notifier) -> Self {
        let downstream = downstream.clone();
        let subscription = scanner.notifier().subscribe(move |event| match event {
            Event::PropertyChanged(_) => downstream.property_changed("Scanners"),
            Event::CollectionChanged(_) => downstream.changed("Scanners"),
        });
        Self {
            scanner,
            _subscription: subscription,
        }
    }
}

/// Concatenates the items of an ordered, mutable list of member scanners.
///
/// Every mutating call raises exactly one `"Scanners"` property change
/// followed by one collection reset, however many members it touched. Member
/// notifications are forwarded: a collection change as the same pair, a
/// property change as a `"Scanners"` property change.
///
/// Notifications are raised, and removed members released, only after the
/// member list is no longer borrowed, so handlers may mutate the aggregate.
pub struct Aggregate<T> {
    members: RefCell<Vec<Member<T>>>,
    notifier: Notifier,
}
impl<T> Aggregate<T> {
    pub fn new() -> Self {
        Self {
            members: RefCell::default(),
            notifier: Notifier::new(),
        }
    }

    /// An aggregate over `scanners`, in order. Raises nothing.
    pub fn with_members(scanners: impl IntoIterator<Item = ScannerHandle<T>>) -> Self {
        let aggregate = Self::new();
        let members = scanners.into_iter().map(|scanner| Member::new(scanner, &aggregate.notifier)).collect();
        *aggregate.members.borrow_mut() = members;
        aggregate
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    pub fn members(&self) -> Vec<ScannerHandle<T>> {
        self.members.borrow().iter().map(|member| member.scanner.clone()).collect()
    }

    pub fn contains(&self, scanner: &ScannerHandle<T>) -> bool {
        self.position(scanner).is_some()
    }

    pub fn add(&self, scanner: ScannerHandle<T>) {
        let member = Member::new(scanner, &self.notifier);
        self.members.borrow_mut().push(member);
        self.membership_changed("add", 1);
    }

    /// Append every scanner in order. Raises once, and only if anything was
    /// added.
    pub fn extend(&self, scanners: impl IntoIterator<Item = ScannerHandle<T>>) {
        let added: Vec<Member<T>> = scanners.into_iter().map(|scanner| Member::new(scanner, &self.notifier)).collect();
        if added.is_empty() {
            return;
        }
        let count = added.len();
        self.members.borrow_mut().extend(added);
        self.membership_changed("extend", count);
    }

    pub fn insert(&self, index: usize, scanner: ScannerHandle<T>) -> Result<()> {
        let len = self.len();
        if index > len {
            exn::bail!(ErrorKind::IndexOutOfRange { index, len });
        }
        let member = Member::new(scanner, &self.notifier);
        self.members.borrow_mut().insert(index, member);
        self.membership_changed("insert", 1);
        Ok(())
    }

    /// Remove the first occurrence of `scanner`. Returns `false`, raising
    /// nothing, when it isn't a member.
    pub fn remove(&self, scanner: &ScannerHandle<T>) -> bool {
        let removed = {
            let mut members = self.members.borrow_mut();
            let position = members.iter().position(|member| ScannerHandle::ptr_eq(&member.scanner, scanner));
            position.map(|index| members.remove(index))
        };
        let Some(removed) = removed else {
            return false;
        };
        drop(removed);
        self.membership_changed("remove", 1);
        true
    }

    /// Swap the member at `index` for `scanner`, returning the previous one.
    pub fn replace(&self, index: usize, scanner: ScannerHandle<T>) -> Result<ScannerHandle<T>> {
        let len = self.len();
        if index >= len {
            exn::bail!(ErrorKind::IndexOutOfRange { index, len });
        }
        let member = Member::new(scanner, &self.notifier);
        let previous = std::mem::replace(&mut self.members.borrow_mut()[index], member);
        let scanner = previous.scanner.clone();
        drop(previous);
        self.membership_changed("replace", 1);
        Ok(scanner)
    }

    /// Remove every member. Always raises, even when already empty.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.members.borrow_mut());
        let count = removed.len();
        drop(removed);
        self.membership_changed("clear", count);
    }

    fn position(&self, scanner: &ScannerHandle<T>) -> Option<usize> {
        self.members.borrow().iter().position(|member| ScannerHandle::ptr_eq(&member.scanner, scanner))
    }

    fn membership_changed(&self, operation: &'static str, count: usize) {
        tracing::debug!(operation, count, members = self.len(), "Aggregate membership changed");
        self.notifier.changed("Scanners");
    }
}
impl<T> Default for Aggregate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Scanner<T> for Aggregate<T> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        // Membership changes made while the sequence is consumed don't affect it.
        Box::new(self.members().into_iter().flat_map(move |member| member.scan(context)))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn as_aggregate(&self) -> Option<&Aggregate<T>> {
        Some(self)
    }
}
