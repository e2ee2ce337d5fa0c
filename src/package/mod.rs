//! Package tree model and resolution.
//!
//! This module defines the immutable dependency tree reported by the
//! package manager and the caching layer used to resolve it once per version.

mod resolver;
mod tree;

pub use resolver::{CachedResolver, TreeResolver};
pub use tree::Package;

#[cfg(test)]
pub use resolver::MockTreeResolver;
