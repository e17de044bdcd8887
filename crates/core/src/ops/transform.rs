use crate::context::ScanContext;
use crate::error::Result;
use crate::notify::Notifier;
use crate::parent::Parent;
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::rc::Rc;

type Projection<TIn, TOut> = Rc<dyn Fn(&ScanContext, TIn) -> Result<TOut>>;
type ManyProjection<TIn, TOut> = Rc<dyn for<'c> Fn(&'c ScanContext, TIn) -> Items<'c, TOut>>;

/// Projects each parent item to exactly one output, lazily and in order.
pub struct Transform<TIn, TOut> {
    parent: Parent<TIn>,
    project: Projection<TIn, TOut>,
    notifier: Notifier,
}
impl<TIn, TOut> Transform<TIn, TOut> {
    pub fn new(parent: ScannerHandle<TIn>, project: impl Fn(&ScanContext, TIn) -> TOut + 'static) -> Self {
        Self::fallible(parent, move |context, item| Ok(project(context, item)))
    }

    /// A projection that may fail. Failures become `Err` elements.
    pub fn fallible(parent: ScannerHandle<TIn>, project: impl Fn(&ScanContext, TIn) -> Result<TOut> + 'static) -> Self {
        let notifier = Notifier::new();
        Self {
            parent: Parent::new(parent, &notifier),
            project: Rc::new(project),
            notifier,
        }
    }
}

impl<TIn: 'static, TOut: 'static> Scanner<TOut> for Transform<TIn, TOut> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, TOut> {
        let project = Rc::clone(&self.project);
        Box::new(self.parent.items_or_empty(context).map(move |item| item.and_then(|item| project(context, item))))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

/// Projects each parent item to a sequence and flattens the results, keeping
/// both the parent's order and each sub-sequence's order.
pub struct TransformMany<TIn, TOut> {
    parent: Parent<TIn>,
    project: ManyProjection<TIn, TOut>,
    notifier: Notifier,
}
impl<TIn, TOut> TransformMany<TIn, TOut> {
    pub fn new<F>(parent: ScannerHandle<TIn>, project: F) -> Self
    where
        F: for<'c> Fn(&'c ScanContext, TIn) -> Items<'c, TOut> + 'static,
    {
        let notifier = Notifier::new();
        Self {
            parent: Parent::new(parent, &notifier),
            project: Rc::new(project),
            notifier,
        }
    }
}

impl<TIn: 'static, TOut: 'static> Scanner<TOut> for TransformMany<TIn, TOut> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, TOut> {
        let project = Rc::clone(&self.project);
        Box::new(self.parent.items_or_empty(context).flat_map(move |item| -> Items<'a, TOut> {
            match item {
                Ok(item) => project(context, item),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        }))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
