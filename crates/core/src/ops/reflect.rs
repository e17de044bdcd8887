use crate::context::ScanContext;
use crate::notify::Notifier;
use crate::parent::Parent;
use crate::scanner::{Items, Scanner, ScannerHandle};
use std::rc::Rc;

/// Re-represents items in terms of another metadata view (a different root,
/// a different loader, and so on) without changing their type.
pub trait MetadataContext<T> {
    fn map_item(&self, context: &ScanContext, item: T) -> T;
}

impl<T, F> MetadataContext<T> for F
where
    F: Fn(&ScanContext, T) -> T,
{
    fn map_item(&self, context: &ScanContext, item: T) -> T {
        self(context, item)
    }
}

/// Maps every parent item through a [`MetadataContext`], lazily and in order.
pub struct Reflect<T> {
    parent: Parent<T>,
    metadata: Rc<dyn MetadataContext<T>>,
    notifier: Notifier,
}
impl<T> Reflect<T> {
    pub fn new(parent: ScannerHandle<T>, metadata: impl MetadataContext<T> + 'static) -> Self {
        let notifier = Notifier::new();
        Self {
            parent: Parent::new(parent, &notifier),
            metadata: Rc::new(metadata),
            notifier,
        }
    }
}

impl<T: 'static> Scanner<T> for Reflect<T> {
    fn scan<'a>(self: Rc<Self>, context: &'a ScanContext) -> Items<'a, T> {
        let metadata = Rc::clone(&self.metadata);
        Box::new(
            self.parent
                .items_or_empty(context)
                .map(move |item| item.map(|item| metadata.map_item(context, item))),
        )
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
