//! Commit ordering for resolved change sets.

use crate::cache::{DependKind, PackageCache, PackageId};
use crate::error::SortError;
use crate::sorter::element::{EdgeKind, ElementSorter, GroupKind};
use crate::transaction::{ChangeSet, Operation};

/// One step of a commit plan.
pub type ChangeStep = (PackageId, Operation);

/// Orders the operations of a change set so that dependencies are
/// honored at commit time.
///
/// Edges are derived from cache relations:
///
/// * an install follows the installs providing its requirements,
///   hard for pre-requirements and soft otherwise; a requirement with
///   several incoming providers becomes an or-group, and one already
///   satisfied by a package staying installed adds no edge at all
/// * the removal of an upgraded package precedes the install that
///   upgrades it (soft)
/// * the removal of a conflicting package precedes the conflicted
///   install (hard)
/// * the removal of a requirer precedes the removal of its provider,
///   hard for pre-requirements and soft otherwise
pub struct ChangeSetSorter<'a> {
    cache: &'a PackageCache,
    sorter: ElementSorter<ChangeStep>,
}

impl<'a> ChangeSetSorter<'a> {
    pub fn new(cache: &'a PackageCache, changeset: &ChangeSet) -> Self {
        let mut sorter = ElementSorter::new();
        for (pkg, op) in changeset.iter() {
            sorter.add_element((pkg, op));
            match op {
                Operation::Install => {
                    Self::install_edges(cache, changeset, &mut sorter, pkg);
                }
                Operation::Remove => {
                    Self::remove_edges(cache, changeset, &mut sorter, pkg);
                }
            }
        }
        ChangeSetSorter { cache, sorter }
    }

    /// The commit plan, earliest step first.
    pub fn sorted(&mut self) -> Result<Vec<ChangeStep>, SortError> {
        if let Err(cycle) = self.sorter.break_loops() {
            return Err(SortError::Loop(self.describe(&cycle)));
        }
        self.sorter.get_sorted()
    }

    fn describe(&self, cycle: &[ChangeStep]) -> String {
        let steps: Vec<String> = cycle
            .iter()
            .map(|&(pkg, op)| {
                let verb = match op {
                    Operation::Install => "install",
                    Operation::Remove => "remove",
                };
                format!("{} {}", verb, self.cache.package(pkg))
            })
            .collect();
        steps.join(" -> ")
    }

    fn install_edges(
        cache: &PackageCache,
        changeset: &ChangeSet,
        sorter: &mut ElementSorter<ChangeStep>,
        pkg: PackageId,
    ) {
        let elem = (pkg, Operation::Install);

        for &req in &cache.package(pkg).requires {
            let depend = cache.depend(req);
            let kind = match depend.kind {
                DependKind::PreRequires => EdgeKind::Enforce,
                _ => EdgeKind::Optional,
            };
            // A provider that is installed and staying already
            // satisfies this requirement; no ordering is needed.
            let mut settled = false;
            let mut preds = Vec::new();
            'providers: for &prv in &depend.provided_by {
                for &provider in &cache.provide(prv).packages {
                    if provider == pkg {
                        continue;
                    }
                    match changeset.get(provider) {
                        Some(Operation::Install) => preds.push(provider),
                        Some(Operation::Remove) => {}
                        None => {
                            if cache.package(provider).installed {
                                settled = true;
                                break 'providers;
                            }
                        }
                    }
                }
            }
            if settled {
                continue;
            }
            preds.sort_unstable();
            preds.dedup();
            if preds.len() > 1 {
                let group = sorter.new_group(GroupKind::Or);
                for &pred in &preds {
                    sorter.add_successor_in(group, (pred, Operation::Install), elem, kind);
                }
            } else if let Some(&pred) = preds.first() {
                sorter.add_successor((pred, Operation::Install), elem, kind);
            }
        }

        for victim in Self::upgrade_victims(cache, pkg) {
            if changeset.get(victim) == Some(Operation::Remove) {
                sorter.add_successor((victim, Operation::Remove), elem, EdgeKind::Optional);
            }
        }

        for victim in Self::conflict_victims(cache, pkg) {
            if changeset.get(victim) == Some(Operation::Remove) {
                sorter.add_successor((victim, Operation::Remove), elem, EdgeKind::Enforce);
            }
        }
    }

    fn remove_edges(
        cache: &PackageCache,
        changeset: &ChangeSet,
        sorter: &mut ElementSorter<ChangeStep>,
        pkg: PackageId,
    ) {
        let elem = (pkg, Operation::Remove);
        for &prv in &cache.package(pkg).provides {
            for &req in &cache.provide(prv).required_by {
                let depend = cache.depend(req);
                let kind = match depend.kind {
                    DependKind::PreRequires => EdgeKind::Enforce,
                    _ => EdgeKind::Optional,
                };
                for &requirer in &depend.packages {
                    if requirer != pkg && changeset.get(requirer) == Some(Operation::Remove) {
                        sorter.add_successor((requirer, Operation::Remove), elem, kind);
                    }
                }
            }
        }
    }

    /// Installed-or-removed packages this install upgrades, in both
    /// relation directions.
    fn upgrade_victims(cache: &PackageCache, pkg: PackageId) -> Vec<PackageId> {
        let mut victims = Vec::new();
        for &upg in &cache.package(pkg).upgrades {
            for &prv in &cache.depend(upg).provided_by {
                victims.extend(cache.provide(prv).packages.iter().copied());
            }
        }
        for &prv in &cache.package(pkg).provides {
            for &upg in &cache.provide(prv).upgraded_by {
                victims.extend(cache.depend(upg).packages.iter().copied());
            }
        }
        victims.retain(|&victim| victim != pkg);
        victims.sort_unstable();
        victims.dedup();
        victims
    }

    fn conflict_victims(cache: &PackageCache, pkg: PackageId) -> Vec<PackageId> {
        let mut victims = Vec::new();
        for &cnf in &cache.package(pkg).conflicts {
            for &prv in &cache.depend(cnf).provided_by {
                victims.extend(cache.provide(prv).packages.iter().copied());
            }
        }
        for &prv in &cache.package(pkg).provides {
            for &cnf in &cache.provide(prv).conflicted_by {
                victims.extend(cache.depend(cnf).packages.iter().copied());
            }
        }
        victims.retain(|&victim| victim != pkg);
        victims.sort_unstable();
        victims.dedup();
        victims
    }
}

/// Convenience wrapper building the sorter and returning the plan.
pub fn sort_changeset(
    cache: &PackageCache,
    changeset: &ChangeSet,
) -> Result<Vec<ChangeStep>, SortError> {
    ChangeSetSorter::new(cache, changeset).sorted()
}
