//! Package relationship cache.
//!
//! The cache aggregates package descriptions from any number of loaders
//! into one deduplicated entity graph that the resolver can walk without
//! ever re-evaluating version predicates.
//!
//! # Architecture
//!
//! - [`Package`], [`Provide`], [`Dependency`]: arena entities connected
//!   by integer ids in both directions
//! - [`PackageCache`]: owns the arenas, the name indices, and the
//!   load/reload/unload cycle
//! - [`LoadContext`]: the callback surface loaders use to register
//!   packages and file provides
//!
//! Loading runs in three phases: loaders register packages, the
//! file-provides pass fills in provides for `/`-prefixed requirements,
//! and [`PackageCache::link_deps`] connects every relation to the
//! provides whose version passes its predicate.

mod entities;
mod store;


pub use entities::{DependId, DependKind, Dependency, Package, PackageId, Provide, ProvideId};
pub use store::{LoadContext, PackageCache};
