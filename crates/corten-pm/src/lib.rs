//! Package relationship cache and transaction resolver.
//!
//! The engine is backend-neutral: loaders feed package metadata from
//! any source into a [`PackageCache`], a [`Transaction`] resolves
//! install, remove, upgrade and fix goals into a consistent
//! [`ChangeSet`] by weighted backtracking, and the
//! [`sorter`] orders the winning change set into a commit plan.
//!
//! ```no_run
//! use corten_pm::{PackageCache, PolicyInstall, Transaction};
//! use corten_pm::loader::{Channel, SnapshotLoader};
//!
//! # fn main() -> corten_pm::Result<()> {
//! let mut cache = PackageCache::new();
//! let channel = Channel::new("main", 0);
//! cache.add_loader(Box::new(SnapshotLoader::new("channel.json", channel)));
//! cache.load()?;
//!
//! let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
//! for &pkg in cache.packages_by_name("editor") {
//!     trans.install(pkg)?;
//! }
//! for (pkg, op) in corten_pm::sorter::sort_changeset(&cache, trans.changeset())? {
//!     println!("{:?} {}", op, cache.package(pkg));
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod sorter;
pub mod transaction;

pub use backend::{Backend, BackendId, ReleaseBackend};
pub use cache::{PackageCache, PackageId};
pub use config::Config;
pub use error::{Error, ResolveError, Result, SortError};
pub use matcher::{MasterMatcher, Matcher, ReleaseMatcher};
pub use transaction::{ChangeSet, Operation, Policy, PolicyInstall, PolicyRemove, PolicyUpgrade, Transaction};
