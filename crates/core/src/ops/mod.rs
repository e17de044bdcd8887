//! Operator scanners: nodes that wrap one or more upstream scanners.

mod aggregate;
mod cache;
mod distinct;
mod filter;
mod reflect;
mod transform;

pub use self::aggregate::Aggregate;
pub use self::cache::Cache;
pub use self::distinct::Distinct;
pub use self::filter::{Filter, Predicate};
pub use self::reflect::{MetadataContext, Reflect};
pub use self::transform::{Transform, TransformMany};
