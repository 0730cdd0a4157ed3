//! Backtracking dependency resolution over a loaded package cache.
//!
//! This module turns install/remove/upgrade requests into a consistent
//! [`ChangeSet`]: a minimal-weight set of operations under which every
//! installed package has its requirements satisfied and no conflicts
//! remain. The search is depth-first branch-and-bound over forked
//! changesets rather than an explicit state machine.
//!
//! # Architecture
//!
//! The resolver consists of three pieces:
//!
//! - [`ChangeSet`]: value-style overlay of pending operations on the
//!   cache's installed state; branches fork it and never share state
//! - [`Policy`]: ranks feasible changesets (lower weight wins) and
//!   pins packages the search must never touch
//! - [`Transaction`]: the search itself, driven either per call
//!   (`install`/`remove`/`upgrade`) or batched (`enqueue` + `run`)
//!
//! # Algorithm Overview
//!
//! 1. **Clear the way**: obsoleted, conflicting, and non-coexisting
//!    packages are removed, preferring replacement over plain removal
//! 2. **Satisfy requirements**: each unsatisfied requirement either
//!    recurses into its only candidate or forks per candidate
//! 3. **Score and adopt**: surviving forks are weighed by the policy
//!    and the best one becomes the working state
//! 4. **Fail upward**: a branch failure carries its reason; it only
//!    escapes when no sibling branch survives
//!
//! # Example
//!
//! ```ignore
//! use corten_pm::cache::PackageCache;
//! use corten_pm::transaction::{PolicyInstall, Task, Transaction};
//!
//! let mut cache = PackageCache::new();
//! // ... add loaders and load
//!
//! let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
//! trans.enqueue(pkg, Task::Install);
//! match trans.run() {
//!     Ok(()) => println!("{}", trans.changeset().describe(&cache)),
//!     Err(err) => println!("impossible: {}", err),
//! }
//! ```

mod changeset;
mod policy;
mod resolver;


pub use changeset::{ChangeSet, Operation, PersistedChange};
pub use policy::{Policy, PolicyInstall, PolicyRemove, PolicyUpgrade};
pub use resolver::{Task, Transaction};
