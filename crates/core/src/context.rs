//! Per-invocation scan context.

use crate::ignore::IgnoreException;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

/// Marker for values that can be stored in a [`ScanContext`].
///
/// Options alter how leaf adapters behave at runtime: which reader
/// parameters to use, which per-run caches to share, and so on. At most one
/// instance of each option type lives in a context.
pub trait ScanOption: Any {}

/// Runtime options for a single top-level scan.
///
/// Create a fresh context for each scan request (or chain of scans that
/// should share per-run caches); a context carries no history otherwise.
///
/// A context holds two things:
/// - an ordered list of [ignore policies](IgnoreException), consulted by
///   bridging adapters when they catch a fault they don't already know how to
///   absorb, and
/// - a registry of [`ScanOption`]s keyed by type. Registration is "first
///   write wins"; [`replace_option`](Self::replace_option) overrides
///   explicitly. Adapters that need an option which isn't present create the
///   default lazily via [`option_or_insert_with`](Self::option_or_insert_with).
///
/// Contexts are `!Sync`: lazy option registration mutates the registry
/// through a shared reference, so one context must never be used by two
/// threads at once.
#[derive(Default)]
pub struct ScanContext {
    ignore: Vec<Rc<dyn IgnoreException>>,
    options: std::cell::RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}
impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ignore policy (builder style).
    pub fn with_ignore(mut self, policy: impl IgnoreException + 'static) -> Self {
        self.add_ignore(policy);
        self
    }

    /// Append an ignore policy. Policies are consulted in registration order.
    pub fn add_ignore(&mut self, policy: impl IgnoreException + 'static) {
        self.ignore.push(Rc::new(policy));
    }

    pub fn ignore_policy_count(&self) -> usize {
        self.ignore.len()
    }

    /// Ask every installed policy whether `error`, caught while performing
    /// `operation`, should be swallowed. Any `true` wins.
    pub fn ignore_exception(&self, operation: &str, error: &(dyn StdError + 'static)) -> bool {
        self.ignore.iter().any(|policy| policy.ignore_exception(operation, error))
    }

    /// Register an option (builder style). Ignored if an option of the same
    /// type is already present.
    pub fn with_option<T: ScanOption>(mut self, option: T) -> Self {
        self.insert_option(option);
        self
    }

    /// Register an option unless one of the same type already exists.
    ///
    /// Returns `false` (and drops `option`) when the slot was taken.
    pub fn insert_option<T: ScanOption>(&mut self, option: T) -> bool {
        let options = self.options.get_mut();
        if options.contains_key(&TypeId::of::<T>()) {
            tracing::trace!(option = type_name::<T>(), "Scan option already registered; keeping the first");
            return false;
        }
        options.insert(TypeId::of::<T>(), Rc::new(option));
        true
    }

    /// Register an option, returning whichever instance it displaced.
    pub fn replace_option<T: ScanOption>(&mut self, option: T) -> Option<Rc<T>> {
        let previous = self.options.get_mut().insert(TypeId::of::<T>(), Rc::new(option));
        previous.and_then(|any| any.downcast::<T>().ok())
    }

    pub fn option<T: ScanOption>(&self) -> Option<Rc<T>> {
        let options = self.options.borrow();
        options.get(&TypeId::of::<T>()).cloned().and_then(|any| any.downcast::<T>().ok())
    }

    pub fn contains_option<T: ScanOption>(&self) -> bool {
        self.options.borrow().contains_key(&TypeId::of::<T>())
    }

    /// Look up an option, lazily constructing and registering it when absent.
    ///
    /// This is the extension point leaf adapters use for per-run state.
    pub fn option_or_insert_with<T: ScanOption>(&self, create: impl FnOnce() -> T) -> Rc<T> {
        if let Some(existing) = self.option::<T>() {
            return existing;
        }
        // `create` runs without the registry borrowed, so it may consult the
        // context itself.
        let created = Rc::new(create());
        let mut options = self.options.borrow_mut();
        let slot = options.entry(TypeId::of::<T>()).or_insert_with(|| {
            tracing::trace!(option = type_name::<T>(), "Registering default scan option");
            Rc::clone(&created) as Rc<dyn Any>
        });
        // If `create` registered an instance of its own, that one wins.
        Rc::clone(slot).downcast::<T>().unwrap_or(created)
    }

    pub fn option_or_default<T: ScanOption + Default>(&self) -> Rc<T> {
        self.option_or_insert_with(T::default)
    }
}
impl fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanContext")
            .field("ignore_policies", &self.ignore.len())
            .field("options", &self.options.borrow().len())
            .finish()
    }
}
