//! The backtracking transaction resolver.

use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::cache::{DependId, PackageCache, PackageId};
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::transaction::changeset::{ChangeSet, Operation};
use crate::transaction::policy::Policy;

/// A queued request for [`Transaction::run`], and the operation
/// vocabulary of [`Transaction::eval_best_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Install,
    /// Install even when the package is already installed.
    Reinstall,
    Remove,
    /// Replace with any package that obsoletes the target, if one
    /// scores better than keeping it.
    Upgrade,
    /// Repair broken relations of the target, preferring completion
    /// over removal.
    Fix,
    /// Pin the package to its current state.
    Keep,
}

/// Searches for the lowest-weight consistent changeset that honors a
/// set of requested operations.
///
/// The search is depth-first over forked changesets: every decision
/// point clones the working changeset per candidate, resolves each
/// fork independently, and adopts the fork the policy weighs lowest.
/// Failed forks report their reason and are discarded. Public
/// operations commit to the transaction's changeset only on success,
/// so a failed call leaves the transaction exactly as it was.
pub struct Transaction<'a> {
    cache: &'a PackageCache,
    policy: Box<dyn Policy>,
    config: Config,
    changeset: ChangeSet,
    queue: IndexMap<PackageId, Task>,
}

impl<'a> Transaction<'a> {
    pub fn new(cache: &'a PackageCache, policy: Box<dyn Policy>) -> Self {
        Transaction {
            cache,
            policy,
            config: Config::default(),
            changeset: ChangeSet::new(),
            queue: IndexMap::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn cache(&self) -> &PackageCache {
        self.cache
    }

    pub fn policy(&self) -> &dyn Policy {
        &*self.policy
    }

    pub fn policy_mut(&mut self) -> &mut dyn Policy {
        &mut *self.policy
    }

    pub fn changeset(&self) -> &ChangeSet {
        &self.changeset
    }

    /// Weight of the current changeset under the transaction's policy.
    pub fn weight(&self) -> i32 {
        self.policy.weight(self.cache, &self.changeset)
    }

    pub fn clear(&mut self) {
        self.changeset = ChangeSet::new();
        self.queue.clear();
    }

    /// Resolves an install of `pkg` and everything it drags in.
    pub fn install(&mut self, pkg: PackageId) -> Result<()> {
        debug!("install {}", self.cache.package(pkg));
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        self.install_pkg(pkg, &mut working, &locked, 0)?;
        self.changeset = working;
        Ok(())
    }

    /// Resolves a removal of `pkg` and everything that depended on it.
    pub fn remove(&mut self, pkg: PackageId) -> Result<()> {
        debug!("remove {}", self.cache.package(pkg));
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        self.remove_pkg(pkg, &mut working, &locked, 0)?;
        self.changeset = working;
        Ok(())
    }

    /// Considers every not-yet-installed package that obsoletes one of
    /// `pkgs` and adopts whichever mix of upgrades scores best, which
    /// may be no change at all.
    pub fn upgrade(&mut self, pkgs: &[PackageId]) -> Result<()> {
        debug!("upgrade over {} packages", pkgs.len());
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        self.upgrade_inner(pkgs, &mut working, &locked, 0)?;
        self.changeset = working;
        Ok(())
    }

    /// Repairs broken relations of `pkgs`.
    pub fn fix(&mut self, pkgs: &[PackageId]) -> Result<()> {
        debug!("fix over {} packages", pkgs.len());
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        self.fix_inner(pkgs, &mut working, &locked, 0)?;
        self.changeset = working;
        Ok(())
    }

    /// For each package in turn, tries every allowed operation and
    /// commits the one the policy weighs lowest.
    pub fn eval_best_state(&mut self, pkgs: &[PackageId], ops: &[Task]) -> Result<()> {
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        self.eval_best_state_inner(pkgs, ops, &mut working, &locked, 0)?;
        self.changeset = working;
        Ok(())
    }

    /// Drops changeset entries whose reversal does not raise the
    /// weight. Useful after broad operations that over-approximate.
    pub fn minimize(&mut self) {
        debug!("minimizing changeset");
        let locked = self.policy.locked().clone();
        let mut working = self.changeset.clone();
        let entries: Vec<(PackageId, Operation)> = working.iter().collect();
        for (pkg, op) in entries {
            if locked.contains(&pkg) {
                continue;
            }
            // Earlier reversals may have already dropped this entry.
            if working.get(pkg) != Some(op) {
                continue;
            }
            let installed = self.cache.package(pkg).installed;
            let mut fork = working.clone();
            let outcome = match op {
                Operation::Install if !installed => self.remove_pkg(pkg, &mut fork, &locked, 0),
                Operation::Remove if installed => self.install_pkg(pkg, &mut fork, &locked, 0),
                _ => continue,
            };
            if outcome.is_ok() && self.weight_of(&fork) < self.weight_of(&working) {
                working.set_state(&fork);
            }
        }
        self.changeset = working;
    }

    /// Queues a request for the next [`Transaction::run`].
    ///
    /// A later request for the same package replaces the earlier one.
    pub fn enqueue(&mut self, pkg: PackageId, task: Task) {
        self.queue.insert(pkg, task);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Resolves every queued request against a single working state.
    ///
    /// The queue is consumed whether or not the run succeeds; the
    /// changeset is only committed on success.
    pub fn run(&mut self) -> Result<()> {
        let outcome = self.run_queue();
        self.queue.clear();
        outcome?;
        Ok(())
    }

    fn run_queue(&mut self) -> Result<(), ResolveError> {
        debug!("running transaction queue with {} entries", self.queue.len());
        let mut working = self.changeset.clone();
        let mut locked = self.policy.locked().clone();

        // First pass records every request and pins its target, so
        // resolving one request cannot silently undo another.
        for (&pkg, &task) in &self.queue {
            match task {
                Task::Keep => {
                    working.unset(pkg);
                    locked.insert(pkg);
                }
                Task::Install => {
                    if locked.contains(&pkg) && !working.is_installed(self.cache, pkg) {
                        return Err(ResolveError::Locked(self.cache.package(pkg).to_string()));
                    }
                    working.set_install(self.cache, pkg);
                    locked.insert(pkg);
                }
                Task::Reinstall => {
                    if locked.contains(&pkg) {
                        return Err(ResolveError::Locked(self.cache.package(pkg).to_string()));
                    }
                    working.force_install(pkg);
                    locked.insert(pkg);
                }
                Task::Remove => {
                    if locked.contains(&pkg) && working.is_installed(self.cache, pkg) {
                        return Err(ResolveError::Locked(self.cache.package(pkg).to_string()));
                    }
                    working.set_remove(self.cache, pkg);
                    locked.insert(pkg);
                }
                Task::Upgrade | Task::Fix => {}
            }
        }

        // Second pass resolves each request against the combined
        // state. The target is unpinned for its own resolution but
        // stays pinned for everyone else's.
        let mut upgrades = Vec::new();
        let mut fixes = Vec::new();
        for (&pkg, &task) in &self.queue {
            let install_side = match task {
                Task::Install | Task::Reinstall => true,
                Task::Remove => false,
                Task::Keep => self.cache.package(pkg).installed,
                Task::Upgrade => {
                    upgrades.push(pkg);
                    continue;
                }
                Task::Fix => {
                    fixes.push(pkg);
                    continue;
                }
            };
            let mut pins = locked.clone();
            pins.remove(&pkg);
            if install_side {
                self.install_pkg(pkg, &mut working, &pins, 0)?;
            } else {
                self.remove_pkg(pkg, &mut working, &pins, 0)?;
            }
        }
        if !upgrades.is_empty() {
            self.upgrade_inner(&upgrades, &mut working, &locked, 0)?;
        }
        if !fixes.is_empty() {
            self.fix_inner(&fixes, &mut working, &locked, 0)?;
        }

        self.changeset = working;
        Ok(())
    }

    /// Installs `pkg` into `cs`, clearing obsoleted, conflicting, and
    /// non-coexisting packages out of the way and resolving every
    /// requirement, branching where more than one choice exists.
    fn install_pkg(
        &self,
        pkg: PackageId,
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        self.check_depth(depth)?;
        let package = self.cache.package(pkg);
        if locked.contains(&pkg) {
            return Err(ResolveError::Locked(package.to_string()));
        }
        trace!("installing {}", package);
        let mut locked = locked.clone();
        locked.insert(pkg);
        cs.set_install(self.cache, pkg);

        // Packages this one obsoletes go away unconditionally. Ones
        // not installed are pinned out so no later branch re-adds them.
        for &upg in &package.upgrades {
            for &prv in &self.cache.depend(upg).provided_by {
                for &victim in &self.cache.provide(prv).packages {
                    if victim == pkg {
                        continue;
                    }
                    if !cs.is_installed(self.cache, victim) {
                        locked.insert(victim);
                        continue;
                    }
                    if locked.contains(&victim) {
                        return Err(ResolveError::Locked(format!(
                            "{} (obsoleted by {})",
                            self.cache.package(victim),
                            package
                        )));
                    }
                    self.remove_pkg(victim, cs, &locked, depth + 1)?;
                }
            }
        }

        // Installed packages claiming to obsolete this one must leave,
        // the least painful way available.
        for &prv in &package.provides {
            for &upg in &self.cache.provide(prv).upgraded_by {
                for &other in &self.cache.depend(upg).packages {
                    if other == pkg {
                        continue;
                    }
                    if !cs.is_installed(self.cache, other) {
                        locked.insert(other);
                        continue;
                    }
                    if locked.contains(&other) {
                        return Err(ResolveError::Locked(format!(
                            "{} (obsoletes {})",
                            self.cache.package(other),
                            package
                        )));
                    }
                    self.best_removal(other, cs, &locked, depth + 1)?;
                }
            }
        }

        // Conflicts cut both ways.
        for &cnf in &package.conflicts {
            for &prv in &self.cache.depend(cnf).provided_by {
                for &victim in &self.cache.provide(prv).packages {
                    if victim == pkg {
                        continue;
                    }
                    if !cs.is_installed(self.cache, victim) {
                        locked.insert(victim);
                        continue;
                    }
                    if locked.contains(&victim) {
                        return Err(ResolveError::Locked(format!(
                            "{} (conflicted by {})",
                            self.cache.package(victim),
                            package
                        )));
                    }
                    self.best_removal(victim, cs, &locked, depth + 1)?;
                }
            }
        }
        for &prv in &package.provides {
            for &cnf in &self.cache.provide(prv).conflicted_by {
                for &victim in &self.cache.depend(cnf).packages {
                    if victim == pkg {
                        continue;
                    }
                    if !cs.is_installed(self.cache, victim) {
                        locked.insert(victim);
                        continue;
                    }
                    if locked.contains(&victim) {
                        return Err(ResolveError::Locked(format!(
                            "{} (conflicts with {})",
                            self.cache.package(victim),
                            package
                        )));
                    }
                    self.best_removal(victim, cs, &locked, depth + 1)?;
                }
            }
        }

        // Same-name packages the backend will not keep side by side.
        for &other in self.cache.packages_by_name(&package.name) {
            if other == pkg || self.cache.coexists(other, pkg) {
                continue;
            }
            if !cs.is_installed(self.cache, other) {
                locked.insert(other);
                continue;
            }
            if locked.contains(&other) {
                return Err(ResolveError::Locked(format!(
                    "{} (cannot coexist with {})",
                    self.cache.package(other),
                    package
                )));
            }
            self.remove_pkg(other, cs, &locked, depth + 1)?;
        }

        // Requirements, the branching step.
        for &req in &package.requires {
            let depend = self.cache.depend(req);
            let satisfied = depend.provided_by.iter().any(|&prv| {
                self.cache
                    .provide(prv)
                    .packages
                    .iter()
                    .any(|&p| cs.is_installed(self.cache, p))
            });
            if satisfied {
                continue;
            }

            let mut candidates = Vec::new();
            for &prv in &depend.provided_by {
                for &cand in &self.cache.provide(prv).packages {
                    if !locked.contains(&cand) {
                        candidates.push(cand);
                    }
                }
            }
            candidates.sort_unstable();
            candidates.dedup();

            if candidates.is_empty() {
                return Err(ResolveError::NoProvider {
                    package: package.to_string(),
                    requirement: depend.to_string(),
                });
            }
            if candidates.len() == 1 {
                self.install_pkg(candidates[0], cs, &locked, depth + 1)?;
                continue;
            }

            self.sort_candidates(&mut candidates);
            candidates.truncate(self.config.max_alternatives);

            let mut alternatives = Vec::new();
            let mut reasons = Vec::new();
            for &cand in &candidates {
                let mut fork = cs.clone();
                match self.install_pkg(cand, &mut fork, &locked, depth + 1) {
                    Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                    Err(err) => reasons.push(err.to_string()),
                }
            }
            if alternatives.is_empty() {
                return Err(ResolveError::AllAlternativesFailed {
                    target: format!("{} needed by {}", depend, package),
                    reasons,
                });
            }
            adopt_best(cs, alternatives);
        }

        Ok(())
    }

    /// Removes `pkg` from `cs` and reconciles every requirement that
    /// loses its last provider, either by installing an alternative
    /// provider or by cascading the removal to the requirers.
    fn remove_pkg(
        &self,
        pkg: PackageId,
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        self.check_depth(depth)?;
        let package = self.cache.package(pkg);
        if package.essential {
            return Err(ResolveError::Locked(format!("{} (essential)", package)));
        }
        if locked.contains(&pkg) {
            return Err(ResolveError::Locked(package.to_string()));
        }
        trace!("removing {}", package);
        let mut locked = locked.clone();
        locked.insert(pkg);
        cs.set_remove(self.cache, pkg);

        for &prv in &package.provides {
            let provide = self.cache.provide(prv);
            for &req in &provide.required_by {
                let depend = self.cache.depend(req);
                // Requirements of packages leaving anyway don't count.
                if !depend
                    .packages
                    .iter()
                    .any(|&p| cs.is_installed(self.cache, p))
                {
                    continue;
                }

                let mut covered = false;
                let mut candidates = Vec::new();
                'providers: for &other_prv in &depend.provided_by {
                    for &other in &self.cache.provide(other_prv).packages {
                        if other == pkg {
                            continue;
                        }
                        if cs.is_installed(self.cache, other) {
                            covered = true;
                            break 'providers;
                        }
                        if !locked.contains(&other) {
                            candidates.push(other);
                        }
                    }
                }
                if covered {
                    continue;
                }
                candidates.sort_unstable();
                candidates.dedup();

                let mut alternatives = Vec::new();
                let mut reasons = Vec::new();

                // Bring in an alternative provider.
                let mut ordered = candidates.clone();
                self.sort_candidates(&mut ordered);
                ordered.truncate(self.config.max_alternatives);
                for &cand in &ordered {
                    let mut fork = cs.clone();
                    match self.install_pkg(cand, &mut fork, &locked, depth + 1) {
                        Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                        Err(err) => reasons.push(err.to_string()),
                    }
                }

                // Or cascade the removal to the requirers, pinning the
                // untried providers so they cannot sneak back in.
                let mut cascade_locked = locked.clone();
                cascade_locked.extend(candidates.iter().copied());
                let mut fork = cs.clone();
                match self.cascade_requirers(req, &mut fork, &locked, &cascade_locked, depth) {
                    Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                    Err(err) => reasons.push(err.to_string()),
                }

                if alternatives.is_empty() {
                    return Err(ResolveError::StillRequired {
                        package: package.to_string(),
                        capability: provide.to_string(),
                        reasons,
                    });
                }
                adopt_best(cs, alternatives);
            }
        }

        Ok(())
    }

    fn cascade_requirers(
        &self,
        req: DependId,
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        cascade_locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        for &requirer in &self.cache.depend(req).packages {
            if !cs.is_installed(self.cache, requirer) {
                continue;
            }
            if locked.contains(&requirer) {
                return Err(ResolveError::Locked(
                    self.cache.package(requirer).to_string(),
                ));
            }
            self.best_removal(requirer, cs, cascade_locked, depth + 1)?;
        }
        Ok(())
    }

    /// Clears `pkg` out of the system the least painful way: replaced
    /// by a package that obsoletes it, replaced by a package it
    /// obsoletes, or plainly removed.
    fn best_removal(
        &self,
        pkg: PackageId,
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        self.check_depth(depth)?;
        let package = self.cache.package(pkg);
        let mut alternatives = Vec::new();
        let mut reasons = Vec::new();

        // Upgrading: installing an obsoleter sweeps pkg out by itself.
        let mut upgraders = Vec::new();
        for &prv in &package.provides {
            for &upg in &self.cache.provide(prv).upgraded_by {
                for &cand in &self.cache.depend(upg).packages {
                    if cand != pkg
                        && !locked.contains(&cand)
                        && !cs.is_installed(self.cache, cand)
                    {
                        upgraders.push(cand);
                    }
                }
            }
        }
        upgraders.sort_unstable();
        upgraders.dedup();
        self.sort_candidates(&mut upgraders);
        upgraders.truncate(self.config.max_alternatives);
        for &cand in &upgraders {
            let mut fork = cs.clone();
            match self.install_pkg(cand, &mut fork, locked, depth + 1) {
                Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                Err(err) => reasons.push(err.to_string()),
            }
        }

        // Downgrading: remove pkg, then fill the hole with something
        // it obsoleted. The target stays pinned so the install cannot
        // pull it back.
        let mut downgraders = Vec::new();
        for &upg in &package.upgrades {
            for &prv in &self.cache.depend(upg).provided_by {
                for &cand in &self.cache.provide(prv).packages {
                    if cand != pkg
                        && !locked.contains(&cand)
                        && !cs.is_installed(self.cache, cand)
                    {
                        downgraders.push(cand);
                    }
                }
            }
        }
        downgraders.sort_unstable();
        downgraders.dedup();
        self.sort_candidates(&mut downgraders);
        downgraders.truncate(self.config.max_alternatives);
        if !downgraders.is_empty() {
            let mut pinned = locked.clone();
            pinned.insert(pkg);
            for &cand in &downgraders {
                let mut fork = cs.clone();
                let outcome = match self.remove_pkg(pkg, &mut fork, locked, depth + 1) {
                    Ok(()) => self.install_pkg(cand, &mut fork, &pinned, depth + 1),
                    Err(err) => Err(err),
                };
                match outcome {
                    Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                    Err(err) => reasons.push(err.to_string()),
                }
            }
        }

        // Plain removal.
        {
            let mut fork = cs.clone();
            match self.remove_pkg(pkg, &mut fork, locked, depth + 1) {
                Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                Err(err) => reasons.push(err.to_string()),
            }
        }

        if alternatives.is_empty() {
            return Err(ResolveError::AllAlternativesFailed {
                target: format!("removal of {}", package),
                reasons,
            });
        }
        adopt_best(cs, alternatives);
        Ok(())
    }

    fn upgrade_inner(
        &self,
        pkgs: &[PackageId],
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        let mut candidates = Vec::new();
        for &pkg in pkgs {
            if !cs.is_installed(self.cache, pkg) {
                continue;
            }
            for &prv in &self.cache.package(pkg).provides {
                for &upg in &self.cache.provide(prv).upgraded_by {
                    for &cand in &self.cache.depend(upg).packages {
                        if cand != pkg
                            && !locked.contains(&cand)
                            && !cs.is_installed(self.cache, cand)
                        {
                            candidates.push(cand);
                        }
                    }
                }
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        self.sort_candidates(&mut candidates);
        self.eval_best_state_inner(&candidates, &[Task::Keep, Task::Install], cs, locked, depth)
    }

    fn fix_inner(
        &self,
        pkgs: &[PackageId],
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        for &pkg in pkgs {
            if !cs.is_installed(self.cache, pkg) || !self.is_broken(cs, pkg) {
                continue;
            }
            debug!("fixing {}", self.cache.package(pkg));
            let mut alternatives = Vec::new();
            let mut reasons = Vec::new();

            // Completing the package's relations comes first so that
            // on equal weight the package is kept.
            {
                let mut fork = cs.clone();
                match self.install_pkg(pkg, &mut fork, locked, depth + 1) {
                    Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                    Err(err) => reasons.push(err.to_string()),
                }
            }
            {
                let mut fork = cs.clone();
                match self.best_removal(pkg, &mut fork, locked, depth + 1) {
                    Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                    Err(err) => reasons.push(err.to_string()),
                }
            }

            if alternatives.is_empty() {
                return Err(ResolveError::AllAlternativesFailed {
                    target: format!("repair of {}", self.cache.package(pkg)),
                    reasons,
                });
            }
            adopt_best(cs, alternatives);
        }
        Ok(())
    }

    fn eval_best_state_inner(
        &self,
        pkgs: &[PackageId],
        ops: &[Task],
        cs: &mut ChangeSet,
        locked: &HashSet<PackageId>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        for &pkg in pkgs {
            let mut alternatives = Vec::new();
            let mut reasons = Vec::new();
            for &op in ops {
                match op {
                    Task::Keep => alternatives.push((self.weight_of(cs), cs.clone())),
                    Task::Install | Task::Reinstall => {
                        let mut fork = cs.clone();
                        match self.install_pkg(pkg, &mut fork, locked, depth + 1) {
                            Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                            Err(err) => reasons.push(err.to_string()),
                        }
                    }
                    Task::Remove => {
                        let mut fork = cs.clone();
                        match self.remove_pkg(pkg, &mut fork, locked, depth + 1) {
                            Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                            Err(err) => reasons.push(err.to_string()),
                        }
                    }
                    Task::Upgrade => {
                        let mut fork = cs.clone();
                        match self.upgrade_inner(&[pkg], &mut fork, locked, depth + 1) {
                            Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                            Err(err) => reasons.push(err.to_string()),
                        }
                    }
                    Task::Fix => {
                        let mut fork = cs.clone();
                        match self.fix_inner(&[pkg], &mut fork, locked, depth + 1) {
                            Ok(()) => alternatives.push((self.weight_of(&fork), fork)),
                            Err(err) => reasons.push(err.to_string()),
                        }
                    }
                }
            }
            if alternatives.is_empty() {
                return Err(ResolveError::AllAlternativesFailed {
                    target: self.cache.package(pkg).to_string(),
                    reasons,
                });
            }
            adopt_best(cs, alternatives);
        }
        Ok(())
    }

    /// Whether `pkg` has an unsatisfied requirement, a live conflict,
    /// or a same-name neighbor it cannot coexist with, all judged
    /// against the effective state of `cs`.
    fn is_broken(&self, cs: &ChangeSet, pkg: PackageId) -> bool {
        let package = self.cache.package(pkg);
        for &req in &package.requires {
            let satisfied = self.cache.depend(req).provided_by.iter().any(|&prv| {
                self.cache
                    .provide(prv)
                    .packages
                    .iter()
                    .any(|&p| cs.is_installed(self.cache, p))
            });
            if !satisfied {
                return true;
            }
        }
        for &cnf in &package.conflicts {
            for &prv in &self.cache.depend(cnf).provided_by {
                for &other in &self.cache.provide(prv).packages {
                    if other != pkg && cs.is_installed(self.cache, other) {
                        return true;
                    }
                }
            }
        }
        for &prv in &package.provides {
            for &cnf in &self.cache.provide(prv).conflicted_by {
                for &other in &self.cache.depend(cnf).packages {
                    if other != pkg && cs.is_installed(self.cache, other) {
                        return true;
                    }
                }
            }
        }
        for &other in self.cache.packages_by_name(&package.name) {
            if other != pkg
                && cs.is_installed(self.cache, other)
                && !self.cache.coexists(other, pkg)
            {
                return true;
            }
        }
        false
    }

    /// Highest channel priority first, then name, then newest
    /// version, then id, so candidate exploration is deterministic.
    fn sort_candidates(&self, candidates: &mut [PackageId]) {
        candidates.sort_by(|&a, &b| {
            let pa = self.cache.package(a);
            let pb = self.cache.package(b);
            pb.priority
                .cmp(&pa.priority)
                .then_with(|| pa.name.cmp(&pb.name))
                .then_with(|| {
                    if pa.name == pb.name && pa.backend == pb.backend {
                        self.cache.backend(pa.backend).compare(&pb.version, &pa.version)
                    } else {
                        Ordering::Equal
                    }
                })
                .then_with(|| a.cmp(&b))
        });
    }

    fn weight_of(&self, cs: &ChangeSet) -> i32 {
        self.policy.weight(self.cache, cs)
    }

    fn check_depth(&self, depth: usize) -> Result<(), ResolveError> {
        if depth > self.config.max_depth {
            return Err(ResolveError::TooDeep(self.config.max_depth));
        }
        Ok(())
    }
}

/// Commits the lowest-weight alternative into `cs`. The first minimum
/// wins ties, so callers order alternatives by preference.
fn adopt_best(cs: &mut ChangeSet, alternatives: Vec<(i32, ChangeSet)>) {
    let mut best: Option<(i32, ChangeSet)> = None;
    for (weight, state) in alternatives {
        let better = match &best {
            Some((current, _)) => weight < *current,
            None => true,
        };
        if better {
            best = Some((weight, state));
        }
    }
    if let Some((weight, state)) = best {
        trace!("adopted alternative with weight {}", weight);
        cs.set_state(&state);
    }
}
