//! Change notifications.
//!
//! Every scanner owns a [`Notifier`] with two logical channels: property
//! changes (carrying the name of what changed) and collection changes. Across
//! node boundaries collection changes are always [`CollectionAction::Reset`];
//! the finer-grained actions only exist at the edge, on an
//! [`ObservableVec`](crate::ObservableVec) that a caller mutates directly.
//!
//! Subscribing returns a [`Subscription`] guard. The handler stays registered
//! for exactly as long as the guard lives, so a child node that owns its
//! parent subscription releases it deterministically when dropped.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// What happened to a collection of items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionAction {
    Add,
    Remove,
    Replace,
    Move,
    /// Something changed; re-pull everything.
    Reset,
}

/// A single change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A named property of the notifying node changed.
    PropertyChanged(Cow<'static, str>),
    /// The items the notifying node provides changed.
    CollectionChanged(CollectionAction),
}
impl Event {
    pub fn property(name: impl Into<Cow<'static, str>>) -> Self {
        Self::PropertyChanged(name.into())
    }

    /// The property name, if this is a property change.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            Self::PropertyChanged(name) => Some(name),
            Self::CollectionChanged(_) => None,
        }
    }

    pub fn is_collection_changed(&self) -> bool {
        matches!(self, Self::CollectionChanged(_))
    }
}

type Handler = Rc<dyn Fn(&Event)>;

#[derive(Default)]
struct Registry {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler)>>,
}
impl Registry {
    fn is_registered(&self, id: u64) -> bool {
        self.handlers.borrow().iter().any(|(registered, _)| *registered == id)
    }
}

/// An ordered list of change handlers.
///
/// Cloning a `Notifier` yields another handle to the same handler list.
///
/// Dispatch snapshots the handler list first, so handlers may re-enter the
/// notifier (subscribe, unsubscribe, notify again) without tripping over a
/// borrow. A handler whose subscription is dropped by an earlier handler in
/// the same dispatch is skipped.
#[derive(Clone, Default)]
pub struct Notifier {
    registry: Rc<Registry>,
}
impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; it is invoked for every event until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, handler: impl Fn(&Event) + 'static) -> Subscription {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        let handler: Handler = Rc::new(handler);
        self.registry.handlers.borrow_mut().push((id, handler));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Dispatch `event` to every currently registered handler, in
    /// registration order.
    pub fn notify(&self, event: &Event) {
        let snapshot: Vec<(u64, Handler)> =
            self.registry.handlers.borrow().iter().map(|(id, handler)| (*id, Rc::clone(handler))).collect();
        for (id, handler) in snapshot {
            if self.registry.is_registered(id) {
                handler(event);
            }
        }
    }

    pub fn property_changed(&self, name: impl Into<Cow<'static, str>>) {
        self.notify(&Event::property(name));
    }

    /// Raise a collection change. Always [`CollectionAction::Reset`].
    pub fn collection_changed(&self) {
        self.notify(&Event::CollectionChanged(CollectionAction::Reset));
    }

    /// Raise a property change immediately followed by a collection reset, the
    /// pair every structural change in this crate produces.
    pub fn changed(&self, name: impl Into<Cow<'static, str>>) {
        self.property_changed(name);
        self.collection_changed();
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.borrow().len()
    }
}
impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("subscribers", &self.subscriber_count()).finish()
    }
}

/// Keeps a handler registered with a [`Notifier`].
///
/// Dropping the guard (or calling [`unsubscribe`](Self::unsubscribe))
/// removes the handler. Outliving the notifier is harmless.
#[must_use = "dropping a Subscription immediately unregisters its handler"]
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}
impl Subscription {
    /// Explicitly release the handler.
    pub fn unsubscribe(self) {}

    /// `true` while the handler is still registered with a live notifier.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| registry.is_registered(self.id))
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            // Take the handler out before it is dropped: its captures may hold
            // other subscriptions whose own drop must not see this borrow.
            let removed = {
                let mut handlers = registry.handlers.borrow_mut();
                handlers.iter().position(|(id, _)| *id == self.id).map(|index| handlers.remove(index))
            };
            drop(removed);
        }
    }
}
impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).field("active", &self.is_active()).finish()
    }
}
