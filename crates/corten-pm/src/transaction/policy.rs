//! Weight policies that rank feasible changesets.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::cache::{PackageCache, PackageId};
use crate::transaction::changeset::{ChangeSet, Operation};

/// Ranks prospective changesets and pins packages the resolver must
/// never touch.
///
/// Weights only compare changesets that are already consistent. They
/// never influence correctness, so the exact constants are tuning
/// knobs rather than contract. Lower is better.
pub trait Policy: fmt::Debug {
    fn weight(&self, cache: &PackageCache, changeset: &ChangeSet) -> i32;

    /// Packages the resolver must never install or remove.
    fn locked(&self) -> &HashSet<PackageId>;

    fn lock(&mut self, pkg: PackageId);

    fn unlock(&mut self, pkg: PackageId);
}

/// How a pending removal relates to pending installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalKind {
    /// A pending install upgrades the removed package.
    Upgraded,
    /// A pending install downgrades the removed package.
    Downgraded,
    /// Nothing replaces the removed package.
    Plain,
}

/// Upgrade relations carried by a changeset's pending installs.
#[derive(Debug, Default)]
struct UpdownMap {
    /// Pending installs that upgrade some installed package.
    upgrading: HashSet<PackageId>,
    /// Installed victim to the pending packages upgrading it.
    upgraded: HashMap<PackageId, Vec<PackageId>>,
    /// Installed victim to the pending packages downgrading it.
    downgraded: HashMap<PackageId, Vec<PackageId>>,
}

impl UpdownMap {
    fn build(cache: &PackageCache, changeset: &ChangeSet) -> Self {
        let mut map = UpdownMap::default();
        for (pkg, op) in changeset.iter() {
            if op != Operation::Install {
                continue;
            }
            for &upg in &cache.package(pkg).upgrades {
                for &prv in &cache.depend(upg).provided_by {
                    for &victim in &cache.provide(prv).packages {
                        if victim != pkg && cache.package(victim).installed {
                            map.upgrading.insert(pkg);
                            map.upgraded.entry(victim).or_default().push(pkg);
                        }
                    }
                }
            }
            for &prv in &cache.package(pkg).provides {
                for &upg in &cache.provide(prv).upgraded_by {
                    for &victim in &cache.depend(upg).packages {
                        if victim != pkg && cache.package(victim).installed {
                            map.downgraded.entry(victim).or_default().push(pkg);
                        }
                    }
                }
            }
        }
        map
    }

    fn removal_kind(&self, changeset: &ChangeSet, victim: PackageId) -> RemovalKind {
        let installing = |pkgs: &Vec<PackageId>| {
            pkgs.iter()
                .any(|&p| changeset.get(p) == Some(Operation::Install))
        };
        if self.upgraded.get(&victim).map_or(false, installing) {
            RemovalKind::Upgraded
        } else if self.downgraded.get(&victim).map_or(false, installing) {
            RemovalKind::Downgraded
        } else {
            RemovalKind::Plain
        }
    }
}

/// Gives precedence to keeping functionality in the system.
///
/// Removals are expensive unless they are the old half of an upgrade;
/// installs are cheap, slightly cheaper when they upgrade something.
#[derive(Debug, Default)]
pub struct PolicyInstall {
    locked: HashSet<PackageId>,
}

impl PolicyInstall {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for PolicyInstall {
    fn weight(&self, cache: &PackageCache, changeset: &ChangeSet) -> i32 {
        let updown = UpdownMap::build(cache, changeset);
        let mut weight = 0;
        for (pkg, op) in changeset.iter() {
            weight += match op {
                Operation::Remove => match updown.removal_kind(changeset, pkg) {
                    RemovalKind::Upgraded => -1,
                    RemovalKind::Downgraded => 15,
                    RemovalKind::Plain => 20,
                },
                Operation::Install => {
                    if updown.upgrading.contains(&pkg) {
                        2
                    } else {
                        3
                    }
                }
            };
        }
        weight
    }

    fn locked(&self) -> &HashSet<PackageId> {
        &self.locked
    }

    fn lock(&mut self, pkg: PackageId) {
        self.locked.insert(pkg);
    }

    fn unlock(&mut self, pkg: PackageId) {
        self.locked.remove(&pkg);
    }
}

/// Gives precedence to the choice with fewer changes.
#[derive(Debug, Default)]
pub struct PolicyRemove {
    locked: HashSet<PackageId>,
}

impl PolicyRemove {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for PolicyRemove {
    fn weight(&self, _cache: &PackageCache, changeset: &ChangeSet) -> i32 {
        let mut weight = 0;
        for (_, op) in changeset.iter() {
            weight += match op {
                Operation::Remove => 1,
                Operation::Install => 5,
            };
        }
        weight
    }

    fn locked(&self) -> &HashSet<PackageId> {
        &self.locked
    }

    fn lock(&mut self, pkg: PackageId) {
        self.locked.insert(pkg);
    }

    fn unlock(&mut self, pkg: PackageId) {
        self.locked.remove(&pkg);
    }
}

/// Gives precedence to the choice with more upgrades and smaller
/// impact.
#[derive(Debug, Default)]
pub struct PolicyUpgrade {
    locked: HashSet<PackageId>,
}

impl PolicyUpgrade {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for PolicyUpgrade {
    fn weight(&self, cache: &PackageCache, changeset: &ChangeSet) -> i32 {
        let updown = UpdownMap::build(cache, changeset);
        let mut weight = 0;
        for (pkg, op) in changeset.iter() {
            weight += match op {
                Operation::Remove => match updown.removal_kind(changeset, pkg) {
                    RemovalKind::Upgraded => -1,
                    RemovalKind::Downgraded => 0,
                    RemovalKind::Plain => 3,
                },
                Operation::Install => {
                    if updown.upgrading.contains(&pkg) {
                        -30
                    } else {
                        1
                    }
                }
            };
        }
        weight
    }

    fn locked(&self) -> &HashSet<PackageId> {
        &self.locked
    }

    fn lock(&mut self, pkg: PackageId) {
        self.locked.insert(pkg);
    }

    fn unlock(&mut self, pkg: PackageId) {
        self.locked.remove(&pkg);
    }
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

    fn by_version(cache: &PackageCache, name: &str, version: &str) -> PackageId {
        cache
            .packages_by_name(name)
            .iter()
            .copied()
            .find(|&id| cache.package(id).version == version)
            .unwrap()
    }

    fn upgrade_cache() -> PackageCache {
        load_cache(vec![
            PackageInfo::new("foo", "1.0").provides("foo = 1.0").installed(),
            PackageInfo::new("foo", "2.0")
                .provides("foo = 2.0")
                .upgrades("foo < 2.0"),
        ])
    }

    #[test]
    fn test_install_policy_prefers_upgrade_over_plain_removal() {
        let cache = upgrade_cache();
        let old = by_version(&cache, "foo", "1.0");
        let new = by_version(&cache, "foo", "2.0");
        let policy = PolicyInstall::new();

        let mut upgrade = ChangeSet::new();
        upgrade.set_remove(&cache, old);
        upgrade.set_install(&cache, new);

        let mut removal = ChangeSet::new();
        removal.set_remove(&cache, old);

        assert!(policy.weight(&cache, &upgrade) < policy.weight(&cache, &removal));
    }

    #[test]
    fn test_remove_policy_prefers_fewer_changes() {
        let cache = upgrade_cache();
        let old = by_version(&cache, "foo", "1.0");
        let new = by_version(&cache, "foo", "2.0");
        let policy = PolicyRemove::new();

        let mut removal = ChangeSet::new();
        removal.set_remove(&cache, old);

        let mut upgrade = ChangeSet::new();
        upgrade.set_remove(&cache, old);
        upgrade.set_install(&cache, new);

        assert!(policy.weight(&cache, &removal) < policy.weight(&cache, &upgrade));
    }

    #[test]
    fn test_upgrade_policy_rewards_upgrades() {
        let cache = upgrade_cache();
        let old = by_version(&cache, "foo", "1.0");
        let new = by_version(&cache, "foo", "2.0");
        let policy = PolicyUpgrade::new();

        let mut upgrade = ChangeSet::new();
        upgrade.set_remove(&cache, old);
        upgrade.set_install(&cache, new);

        let keep = ChangeSet::new();

        assert!(policy.weight(&cache, &upgrade) < policy.weight(&cache, &keep));
    }

    #[test]
    fn test_upgraded_removal_is_cheaper_than_plain() {
        let cache = load_cache(vec![
            PackageInfo::new("foo", "1.0").provides("foo = 1.0").installed(),
            PackageInfo::new("foo", "2.0")
                .provides("foo = 2.0")
                .upgrades("foo < 2.0"),
            PackageInfo::new("bar", "1.0").provides("bar = 1.0").installed(),
        ]);
        let old = by_version(&cache, "foo", "1.0");
        let new = by_version(&cache, "foo", "2.0");
        let bar = by_version(&cache, "bar", "1.0");
        let policy = PolicyInstall::new();

        let mut upgraded = ChangeSet::new();
        upgraded.set_install(&cache, new);
        upgraded.set_remove(&cache, old);

        let mut collateral = ChangeSet::new();
        collateral.set_install(&cache, new);
        collateral.set_remove(&cache, bar);

        assert!(policy.weight(&cache, &upgraded) < policy.weight(&cache, &collateral));
    }

    #[test]
    fn test_locked_set_round_trip() {
        let cache = upgrade_cache();
        let old = by_version(&cache, "foo", "1.0");
        let mut policy = PolicyInstall::new();

        assert!(policy.locked().is_empty());
        policy.lock(old);
        assert!(policy.locked().contains(&old));
        policy.unlock(old);
        assert!(policy.locked().is_empty());
    }
}
