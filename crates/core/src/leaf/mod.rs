//! Leaf scanners: nodes with no parent.

mod empty;
mod immutable;
mod observable;

pub use self::empty::Empty;
pub use self::immutable::Immutable;
pub use self::observable::{Observable, ObservableVec};
