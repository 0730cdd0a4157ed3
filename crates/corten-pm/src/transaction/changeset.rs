//! Pending operation sets layered over the cache's installed state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cache::{PackageCache, PackageId};
use crate::error::{Error, Result};

/// A pending operation on a single package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Install,
    Remove,
}

/// A set of pending operations, interpreted relative to a cache.
///
/// The changeset only records *changes*: a package with no entry keeps
/// whatever installed state the cache reports for it. Recording an
/// operation that matches the cache state cancels the entry instead of
/// storing a no-op, so an empty changeset always means "nothing to do".
///
/// Changesets are plain values. The resolver forks them freely with
/// [`Clone`] when exploring alternatives and adopts a winning fork with
/// [`ChangeSet::set_state`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    ops: IndexMap<PackageId, Operation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an install, or cancels a pending removal of an already
    /// installed package.
    pub fn set_install(&mut self, cache: &PackageCache, pkg: PackageId) {
        if cache.package(pkg).installed {
            self.ops.shift_remove(&pkg);
        } else {
            self.ops.insert(pkg, Operation::Install);
        }
    }

    /// Records a removal, or cancels a pending install of a package
    /// that was never installed.
    pub fn set_remove(&mut self, cache: &PackageCache, pkg: PackageId) {
        if cache.package(pkg).installed {
            self.ops.insert(pkg, Operation::Remove);
        } else {
            self.ops.shift_remove(&pkg);
        }
    }

    /// Records an install even when the package is already installed.
    ///
    /// Used for reinstalls, which must survive the cancellation rule of
    /// [`ChangeSet::set_install`].
    pub fn force_install(&mut self, pkg: PackageId) {
        self.ops.insert(pkg, Operation::Install);
    }

    /// Drops any pending operation on `pkg`.
    pub fn unset(&mut self, pkg: PackageId) {
        self.ops.shift_remove(&pkg);
    }

    pub fn get(&self, pkg: PackageId) -> Option<Operation> {
        self.ops.get(&pkg).copied()
    }

    /// Effective installed state of `pkg` under this changeset.
    pub fn is_installed(&self, cache: &PackageCache, pkg: PackageId) -> bool {
        match self.ops.get(&pkg) {
            Some(Operation::Install) => true,
            Some(Operation::Remove) => false,
            None => cache.package(pkg).installed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageId, Operation)> + '_ {
        self.ops.iter().map(|(&pkg, &op)| (pkg, op))
    }

    /// Replaces this changeset's contents with `other`'s.
    pub fn set_state(&mut self, other: &ChangeSet) {
        self.ops.clone_from(&other.ops);
    }

    /// Entries of `self` that are absent from `other` or carry a
    /// different operation there.
    pub fn difference(&self, other: &ChangeSet) -> ChangeSet {
        let ops = self
            .ops
            .iter()
            .filter(|&(pkg, op)| other.ops.get(pkg) != Some(op))
            .map(|(&pkg, &op)| (pkg, op))
            .collect();
        ChangeSet { ops }
    }

    /// Entries present in both changesets with the same operation.
    pub fn intersect(&self, other: &ChangeSet) -> ChangeSet {
        let ops = self
            .ops
            .iter()
            .filter(|&(pkg, op)| other.ops.get(pkg) == Some(op))
            .map(|(&pkg, &op)| (pkg, op))
            .collect();
        ChangeSet { ops }
    }

    pub fn install_list(&self) -> Vec<PackageId> {
        self.ops
            .iter()
            .filter(|(_, &op)| op == Operation::Install)
            .map(|(&pkg, _)| pkg)
            .collect()
    }

    pub fn remove_list(&self) -> Vec<PackageId> {
        self.ops
            .iter()
            .filter(|(_, &op)| op == Operation::Remove)
            .map(|(&pkg, _)| pkg)
            .collect()
    }

    /// Converts to a name/version form that survives cache reloads.
    pub fn to_persisted(&self, cache: &PackageCache) -> Vec<PersistedChange> {
        self.ops
            .iter()
            .map(|(&pkg, &operation)| {
                let package = cache.package(pkg);
                PersistedChange {
                    name: package.name.clone(),
                    version: package.version.clone(),
                    operation,
                }
            })
            .collect()
    }

    /// Rebinds a persisted changeset against a (possibly reloaded) cache.
    ///
    /// Fails if any recorded package is no longer present.
    pub fn from_persisted(cache: &PackageCache, changes: &[PersistedChange]) -> Result<ChangeSet> {
        let mut set = ChangeSet::new();
        for change in changes {
            let pkg = cache
                .packages_by_name(&change.name)
                .iter()
                .copied()
                .find(|&id| cache.package(id).version == change.version)
                .ok_or_else(|| {
                    Error::State(format!(
                        "package {}-{} is no longer in the cache",
                        change.name, change.version
                    ))
                })?;
            set.ops.insert(pkg, change.operation);
        }
        Ok(set)
    }

    /// One line per pending operation, in insertion order.
    pub fn describe(&self, cache: &PackageCache) -> String {
        let mut out = String::new();
        for (&pkg, &op) in &self.ops {
            let tag = match op {
                Operation::Install => 'I',
                Operation::Remove => 'R',
            };
            out.push(tag);
            out.push(' ');
            out.push_str(&cache.package(pkg).to_string());
            out.push('\n');
        }
        out
    }
}

/// A single changeset entry in cache-independent form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChange {
    pub name: String,
    pub version: String,
    pub operation: Operation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Channel, MemoryLoader, PackageInfo};

    fn load_cache(infos: Vec<PackageInfo>) -> PackageCache {
        let mut cache = PackageCache::new();
        cache.add_loader(Box::new(MemoryLoader::new(Channel::new("test", 0), infos)));
        cache.load().unwrap();
        cache
    }

    fn by_name(cache: &PackageCache, name: &str) -> PackageId {
        cache.packages_by_name(name)[0]
    }

    #[test]
    fn test_set_install_cancels_pending_remove() {
        let cache = load_cache(vec![PackageInfo::new("foo", "1.0").installed()]);
        let foo = by_name(&cache, "foo");

        let mut set = ChangeSet::new();
        set.set_remove(&cache, foo);
        assert_eq!(set.get(foo), Some(Operation::Remove));
        assert!(!set.is_installed(&cache, foo));

        set.set_install(&cache, foo);
        assert_eq!(set.get(foo), None);
        assert!(set.is_installed(&cache, foo));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_remove_cancels_pending_install() {
        let cache = load_cache(vec![PackageInfo::new("foo", "1.0")]);
        let foo = by_name(&cache, "foo");

        let mut set = ChangeSet::new();
        set.set_install(&cache, foo);
        assert!(set.is_installed(&cache, foo));

        set.set_remove(&cache, foo);
        assert_eq!(set.get(foo), None);
        assert!(!set.is_installed(&cache, foo));
    }

    #[test]
    fn test_force_install_survives_cancellation() {
        let cache = load_cache(vec![PackageInfo::new("foo", "1.0").installed()]);
        let foo = by_name(&cache, "foo");

        let mut set = ChangeSet::new();
        set.force_install(foo);
        assert_eq!(set.get(foo), Some(Operation::Install));
        assert_eq!(set.install_list(), vec![foo]);
    }

    #[test]
    fn test_difference_and_intersect() {
        let cache = load_cache(vec![
            PackageInfo::new("a", "1.0").installed(),
            PackageInfo::new("b", "1.0"),
            PackageInfo::new("c", "1.0"),
        ]);
        let a = by_name(&cache, "a");
        let b = by_name(&cache, "b");
        let c = by_name(&cache, "c");

        let mut left = ChangeSet::new();
        left.set_remove(&cache, a);
        left.set_install(&cache, b);
        left.set_install(&cache, c);

        let mut right = ChangeSet::new();
        right.set_install(&cache, b);

        let diff = left.difference(&right);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get(a), Some(Operation::Remove));
        assert_eq!(diff.get(c), Some(Operation::Install));

        let both = left.intersect(&right);
        assert_eq!(both.len(), 1);
        assert_eq!(both.get(b), Some(Operation::Install));
    }

    #[test]
    fn test_persist_round_trip() {
        let cache = load_cache(vec![
            PackageInfo::new("a", "1.0").installed(),
            PackageInfo::new("b", "2.0"),
        ]);
        let a = by_name(&cache, "a");
        let b = by_name(&cache, "b");

        let mut set = ChangeSet::new();
        set.set_remove(&cache, a);
        set.set_install(&cache, b);

        let persisted = set.to_persisted(&cache);
        let json = serde_json::to_string(&persisted).unwrap();
        let parsed: Vec<PersistedChange> = serde_json::from_str(&json).unwrap();
        let restored = ChangeSet::from_persisted(&cache, &parsed).unwrap();

        assert_eq!(restored, set);
    }

    #[test]
    fn test_persist_unknown_package_is_an_error() {
        let cache = load_cache(vec![PackageInfo::new("a", "1.0").installed()]);
        let change = PersistedChange {
            name: "ghost".to_string(),
            version: "1.0".to_string(),
            operation: Operation::Install,
        };
        assert!(ChangeSet::from_persisted(&cache, &[change]).is_err());
    }

    #[test]
    fn test_describe_lists_operations() {
        let cache = load_cache(vec![
            PackageInfo::new("a", "1.0").installed(),
            PackageInfo::new("b", "2.0"),
        ]);
        let a = by_name(&cache, "a");
        let b = by_name(&cache, "b");

        let mut set = ChangeSet::new();
        set.set_install(&cache, b);
        set.set_remove(&cache, a);

        let text = set.describe(&cache);
        assert_eq!(text, "I b-2.0\nR a-1.0\n");
    }
}
