//! The cache itself: entity arenas, name indices, and the load cycle.

use std::collections::HashMap;
use std::mem;

use indexmap::IndexMap;
use log::debug;

use corten_vercmp::{DepSpec, Relation};

use crate::backend::{Backend, BackendId};
use crate::error::{Error, Result};
use crate::loader::{Loader, LoaderId, PackageInfo};
use crate::matcher::MasterMatcher;

use super::entities::{
    DependId, DependKind, Dependency, Package, PackageId, Provide, ProvideId,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PackageKey {
    backend: BackendId,
    name: String,
    version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProvideKey {
    backend: BackendId,
    name: String,
    version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DependKey {
    backend: BackendId,
    kind: DependKind,
    name: String,
    relation: Option<Relation>,
    version: Option<String>,
}

struct LoaderEntry {
    id: LoaderId,
    backend: BackendId,
    loader: Box<dyn Loader>,
}

/// Holds every known package together with the relations between them.
///
/// Loaders feed packages in; the cache deduplicates relation entities so
/// each distinct (kind, name, relation, version) exists exactly once, and
/// two registrations of the same package merge into one entry. After
/// loading, [`PackageCache::link_deps`] is the only place where version
/// predicates run; resolution afterwards walks precomputed edges.
pub struct PackageCache {
    backends: Vec<Box<dyn Backend>>,
    loaders: Vec<LoaderEntry>,
    next_loader_id: LoaderId,

    packages: Vec<Package>,
    provides: Vec<Provide>,
    depends: Vec<Dependency>,

    package_names: IndexMap<String, Vec<PackageId>>,
    provide_names: IndexMap<String, Vec<ProvideId>>,
    require_names: IndexMap<String, Vec<DependId>>,
    upgrade_names: IndexMap<String, Vec<DependId>>,
    conflict_names: IndexMap<String, Vec<DependId>>,

    package_map: HashMap<PackageKey, Vec<PackageId>>,
    provide_map: HashMap<ProvideKey, ProvideId>,
    depend_map: HashMap<DependKey, DependId>,
}

impl PackageCache {
    pub fn new() -> Self {
        PackageCache {
            backends: Vec::new(),
            loaders: Vec::new(),
            next_loader_id: 0,
            packages: Vec::new(),
            provides: Vec::new(),
            depends: Vec::new(),
            package_names: IndexMap::new(),
            provide_names: IndexMap::new(),
            require_names: IndexMap::new(),
            upgrade_names: IndexMap::new(),
            conflict_names: IndexMap::new(),
            package_map: HashMap::new(),
            provide_map: HashMap::new(),
            depend_map: HashMap::new(),
        }
    }

    /// Registers a backend, deduplicating by name.
    pub fn register_backend(&mut self, backend: Box<dyn Backend>) -> BackendId {
        if let Some(pos) = self
            .backends
            .iter()
            .position(|b| b.name() == backend.name())
        {
            return pos as BackendId;
        }
        self.backends.push(backend);
        (self.backends.len() - 1) as BackendId
    }

    pub fn backend(&self, id: BackendId) -> &dyn Backend {
        self.backends[id as usize].as_ref()
    }

    /// Registers a loader. Its packages enter the cache on the next
    /// [`PackageCache::load`].
    pub fn add_loader(&mut self, loader: Box<dyn Loader>) -> LoaderId {
        let backend = self.register_backend(loader.backend());
        let id = self.next_loader_id;
        self.next_loader_id += 1;
        self.loaders.push(LoaderEntry {
            id,
            backend,
            loader,
        });
        id
    }

    /// Unregisters a loader. Takes effect on the next load.
    pub fn remove_loader(&mut self, id: LoaderId) {
        self.loaders.retain(|entry| entry.id != id);
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    /// Drops all entities and indices. Registered loaders stay.
    pub fn reset(&mut self) {
        self.packages.clear();
        self.provides.clear();
        self.depends.clear();
        self.package_names.clear();
        self.provide_names.clear();
        self.require_names.clear();
        self.upgrade_names.clear();
        self.conflict_names.clear();
        self.package_map.clear();
        self.provide_map.clear();
        self.depend_map.clear();
    }

    /// Rebuilds the cache from scratch: every loader parses its backing
    /// data again, then file provides are resolved and relations linked.
    pub fn load(&mut self) -> Result<()> {
        self.reset();
        self.run_loaders(false)?;
        self.load_file_provides()?;
        self.link_deps();
        debug!(
            "cache loaded: {} packages, {} provides, {} relations",
            self.packages.len(),
            self.provides.len(),
            self.depends.len()
        );
        Ok(())
    }

    /// Rebuilds the cache from data the loaders already hold, skipping
    /// the parse step where a loader can.
    pub fn reload(&mut self) -> Result<()> {
        self.reset();
        self.run_loaders(true)?;
        self.load_file_provides()?;
        self.link_deps();
        Ok(())
    }

    /// Drops all entities and tells loaders to drop their own caches.
    pub fn unload(&mut self) {
        self.reset();
        for entry in &mut self.loaders {
            entry.loader.unload();
        }
    }

    fn run_loaders(&mut self, reload: bool) -> Result<()> {
        let mut loaders = mem::take(&mut self.loaders);
        let mut result = Ok(());
        for entry in &mut loaders {
            let channel_priority = entry.loader.channel().priority;
            let installed = entry.loader.installed();
            let mut ctx = LoadContext {
                cache: self,
                loader: entry.id,
                backend: entry.backend,
                channel_priority,
                installed,
            };
            result = if reload {
                entry.loader.reload(&mut ctx)
            } else {
                entry.loader.load(&mut ctx)
            };
            if result.is_err() {
                break;
            }
        }
        self.loaders = loaders;
        result
    }

    /// Collects the file paths named by requirements and asks loaders
    /// to register provides for the packages that ship them.
    fn load_file_provides(&mut self) -> Result<()> {
        let mut wanted: Vec<String> = self
            .depends
            .iter()
            .filter(|dep| {
                dep.kind.is_requires()
                    && dep.name.starts_with('/')
                    && !dep.packages.is_empty()
            })
            .map(|dep| dep.name.clone())
            .collect();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(());
        }

        let mut loaders = mem::take(&mut self.loaders);
        let mut result = Ok(());
        for entry in &mut loaders {
            let channel_priority = entry.loader.channel().priority;
            let installed = entry.loader.installed();
            let mut ctx = LoadContext {
                cache: self,
                loader: entry.id,
                backend: entry.backend,
                channel_priority,
                installed,
            };
            result = entry.loader.load_file_provides(&wanted, &mut ctx);
            if result.is_err() {
                break;
            }
        }
        self.loaders = loaders;
        result
    }

    /// Connects relations to the provides that satisfy them. This is
    /// the single place where version predicates are evaluated; the
    /// resolver only follows the edges built here.
    pub fn link_deps(&mut self) {
        for prv in &mut self.provides {
            prv.required_by.clear();
            prv.upgraded_by.clear();
            prv.conflicted_by.clear();
        }
        for dep in &mut self.depends {
            dep.provided_by.clear();
        }

        let mut edges: Vec<(DependId, ProvideId)> = Vec::new();
        for (idx, prv) in self.provides.iter().enumerate() {
            let prv_id = idx as ProvideId;
            let indices = [
                &self.require_names,
                &self.upgrade_names,
                &self.conflict_names,
            ];
            for index in indices {
                if let Some(dep_ids) = index.get(&prv.name) {
                    for &dep_id in dep_ids {
                        let dep = &self.depends[dep_id as usize];
                        if self.matches_version(dep, prv.version.as_deref()) {
                            edges.push((dep_id, prv_id));
                        }
                    }
                }
            }
        }

        for (dep_id, prv_id) in edges {
            let kind = self.depends[dep_id as usize].kind;
            self.depends[dep_id as usize].provided_by.push(prv_id);
            let prv = &mut self.provides[prv_id as usize];
            match kind {
                DependKind::Requires | DependKind::PreRequires => {
                    prv.required_by.push(dep_id)
                }
                DependKind::Upgrades => prv.upgraded_by.push(dep_id),
                DependKind::Conflicts => prv.conflicted_by.push(dep_id),
            }
        }
    }

    /// Whether a relation's version predicate accepts a provided version.
    /// A relation without a predicate accepts anything; a versioned
    /// predicate never accepts an unversioned provide.
    fn matches_version(&self, dep: &Dependency, provided: Option<&str>) -> bool {
        match (dep.relation, dep.version.as_deref()) {
            (Some(relation), Some(target)) => match provided {
                Some(candidate) => {
                    self.backend(dep.backend).satisfies(candidate, relation, target)
                }
                None => false,
            },
            _ => true,
        }
    }

    /// Whether a relation accepts the given provide.
    pub fn depend_matches(&self, dep: DependId, prv: ProvideId) -> bool {
        let dep = &self.depends[dep as usize];
        let prv = &self.provides[prv as usize];
        self.matches_version(dep, prv.version.as_deref())
    }

    /// Whether two same-name packages may be installed together.
    pub fn coexists(&self, a: PackageId, b: PackageId) -> bool {
        let pa = self.package(a);
        let pb = self.package(b);
        if pa.name != pb.name || pa.backend != pb.backend {
            return true;
        }
        self.backend(pa.backend).coexists(&pa.version, &pb.version)
    }

    // ---- entity access ----

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id as usize]
    }

    pub fn provide(&self, id: ProvideId) -> &Provide {
        &self.provides[id as usize]
    }

    pub fn depend(&self, id: DependId) -> &Dependency {
        &self.depends[id as usize]
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// The source record behind a package, from the first of its
    /// loaders that kept one.
    pub fn info(&self, pkg: PackageId) -> Option<&PackageInfo> {
        self.packages[pkg as usize].loaders.iter().find_map(|&lid| {
            self.loaders
                .iter()
                .find(|entry| entry.id == lid)
                .and_then(|entry| entry.loader.info(pkg))
        })
    }

    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> {
        0..self.packages.len() as PackageId
    }

    pub fn packages_by_name(&self, name: &str) -> &[PackageId] {
        self.package_names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn provides_by_name(&self, name: &str) -> &[ProvideId] {
        self.provide_names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn requires_by_name(&self, name: &str) -> &[DependId] {
        self.require_names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn upgrades_by_name(&self, name: &str) -> &[DependId] {
        self.upgrade_names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn conflicts_by_name(&self, name: &str) -> &[DependId] {
        self.conflict_names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Packages whose name/version match a command-line pattern,
    /// in cache order.
    pub fn search(&self, pattern: &str) -> Vec<PackageId> {
        let matcher = MasterMatcher::new(pattern);
        self.package_ids()
            .filter(|&id| matcher.matches(self, id))
            .collect()
    }

    // ---- registration internals ----

    fn intern_provide(
        &mut self,
        backend: BackendId,
        name: &str,
        version: Option<&str>,
    ) -> ProvideId {
        let key = ProvideKey {
            backend,
            name: name.to_string(),
            version: version.map(str::to_string),
        };
        if let Some(&id) = self.provide_map.get(&key) {
            return id;
        }
        let id = self.provides.len() as ProvideId;
        self.provides.push(Provide {
            name: key.name.clone(),
            version: key.version.clone(),
            backend,
            packages: Vec::new(),
            required_by: Vec::new(),
            upgraded_by: Vec::new(),
            conflicted_by: Vec::new(),
        });
        self.provide_names
            .entry(key.name.clone())
            .or_default()
            .push(id);
        self.provide_map.insert(key, id);
        id
    }

    fn intern_depend(
        &mut self,
        backend: BackendId,
        kind: DependKind,
        spec: &DepSpec,
    ) -> DependId {
        let key = DependKey {
            backend,
            kind,
            name: spec.name.clone(),
            relation: spec.relation,
            version: spec.version.clone(),
        };
        if let Some(&id) = self.depend_map.get(&key) {
            return id;
        }
        let id = self.depends.len() as DependId;
        self.depends.push(Dependency {
            kind,
            name: key.name.clone(),
            relation: key.relation,
            version: key.version.clone(),
            backend,
            packages: Vec::new(),
            provided_by: Vec::new(),
        });
        let index = match kind {
            DependKind::Requires | DependKind::PreRequires => &mut self.require_names,
            DependKind::Upgrades => &mut self.upgrade_names,
            DependKind::Conflicts => &mut self.conflict_names,
        };
        index.entry(key.name.clone()).or_default().push(id);
        self.depend_map.insert(key, id);
        id
    }

    fn register_package(
        &mut self,
        loader: LoaderId,
        backend: BackendId,
        channel_priority: i32,
        loader_installed: bool,
        info: &PackageInfo,
    ) -> Result<PackageId> {
        let mut prv_ids = Vec::with_capacity(info.provides.len());
        for spec in &info.provides {
            let (name, version) = parse_provide(spec)?;
            prv_ids.push(self.intern_provide(backend, &name, version.as_deref()));
        }

        let mut req_ids = Vec::with_capacity(info.requires.len() + info.prerequires.len());
        for spec in &info.requires {
            let spec = parse_depend(spec)?;
            req_ids.push(self.intern_depend(backend, DependKind::Requires, &spec));
        }
        for spec in &info.prerequires {
            let spec = parse_depend(spec)?;
            req_ids.push(self.intern_depend(backend, DependKind::PreRequires, &spec));
        }
        let mut upg_ids = Vec::with_capacity(info.upgrades.len());
        for spec in &info.upgrades {
            let spec = parse_depend(spec)?;
            upg_ids.push(self.intern_depend(backend, DependKind::Upgrades, &spec));
        }
        let mut cnf_ids = Vec::with_capacity(info.conflicts.len());
        for spec in &info.conflicts {
            let spec = parse_depend(spec)?;
            cnf_ids.push(self.intern_depend(backend, DependKind::Conflicts, &spec));
        }

        let installed = loader_installed || info.installed;
        let priority = info.priority.unwrap_or(channel_priority);

        // Same name and version with the same relations is the same
        // package, even when several loaders report it.
        let key = PackageKey {
            backend,
            name: info.name.clone(),
            version: info.version.clone(),
        };
        let candidates = self.package_map.get(&key).cloned().unwrap_or_default();
        for existing in candidates {
            if self.package_equals(existing, &prv_ids, &req_ids, &upg_ids, &cnf_ids) {
                let pkg = &mut self.packages[existing as usize];
                pkg.installed |= installed;
                pkg.essential |= info.essential;
                if priority > pkg.priority {
                    pkg.priority = priority;
                }
                if !pkg.loaders.contains(&loader) {
                    pkg.loaders.push(loader);
                }
                return Ok(existing);
            }
        }

        let id = self.packages.len() as PackageId;
        self.packages.push(Package {
            name: info.name.clone(),
            version: info.version.clone(),
            backend,
            installed,
            essential: info.essential,
            priority,
            provides: prv_ids.clone(),
            requires: req_ids.clone(),
            upgrades: upg_ids.clone(),
            conflicts: cnf_ids.clone(),
            loaders: vec![loader],
        });
        self.package_names
            .entry(info.name.clone())
            .or_default()
            .push(id);
        self.package_map.entry(key).or_default().push(id);

        for &prv in &prv_ids {
            self.provides[prv as usize].packages.push(id);
        }
        for &dep in req_ids.iter().chain(&upg_ids).chain(&cnf_ids) {
            self.depends[dep as usize].packages.push(id);
        }
        Ok(id)
    }

    fn package_equals(
        &self,
        existing: PackageId,
        prv_ids: &[ProvideId],
        req_ids: &[DependId],
        upg_ids: &[DependId],
        cnf_ids: &[DependId],
    ) -> bool {
        let pkg = &self.packages[existing as usize];
        same_ids(&pkg.provides, prv_ids)
            && same_ids(&pkg.requires, req_ids)
            && same_ids(&pkg.upgrades, upg_ids)
            && same_ids(&pkg.conflicts, cnf_ids)
    }

    fn attach_provide(
        &mut self,
        package: PackageId,
        name: &str,
        version: Option<&str>,
    ) -> ProvideId {
        let backend = self.packages[package as usize].backend;
        let prv_id = self.intern_provide(backend, name, version);
        if self.packages[package as usize].provides.contains(&prv_id) {
            return prv_id;
        }
        self.provides[prv_id as usize].packages.push(package);
        self.packages[package as usize].provides.push(prv_id);
        if name.starts_with('/') {
            self.drop_self_requires(package, name);
        }
        prv_id
    }

    /// A package that ships a file does not also require it. Orphaned
    /// requirements lose their index entries so linking never sees them.
    fn drop_self_requires(&mut self, package: PackageId, name: &str) {
        let matching: Vec<DependId> = self.packages[package as usize]
            .requires
            .iter()
            .copied()
            .filter(|&dep_id| {
                let dep = &self.depends[dep_id as usize];
                dep.kind.is_requires() && dep.name == name
            })
            .collect();

        for dep_id in matching {
            self.packages[package as usize]
                .requires
                .retain(|&d| d != dep_id);
            let dep = &mut self.depends[dep_id as usize];
            dep.packages.retain(|&p| p != package);
            if dep.packages.is_empty() {
                let key = DependKey {
                    backend: dep.backend,
                    kind: dep.kind,
                    name: dep.name.clone(),
                    relation: dep.relation,
                    version: dep.version.clone(),
                };
                if let Some(ids) = self.require_names.get_mut(name) {
                    ids.retain(|&d| d != dep_id);
                    if ids.is_empty() {
                        self.require_names.shift_remove(name);
                    }
                }
                self.depend_map.remove(&key);
            }
        }
    }
}

impl Default for PackageCache {
    fn default() -> Self {
        Self::new()
    }
}

fn same_ids(a: &[u32], b: &[u32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left = a.to_vec();
    let mut right = b.to_vec();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

fn parse_depend(spec: &str) -> Result<DepSpec> {
    spec.parse()
        .map_err(|err| Error::Loader(format!("bad dependency spec {:?}: {}", spec, err)))
}

fn parse_provide(spec: &str) -> Result<(String, Option<String>)> {
    let parsed = parse_depend(spec)?;
    match parsed.relation {
        None => Ok((parsed.name, None)),
        Some(Relation::Equal) => Ok((parsed.name, parsed.version)),
        Some(other) => Err(Error::Loader(format!(
            "provide {:?} may not use the {} relation",
            spec, other
        ))),
    }
}

/// Callback surface handed to loaders while the cache is loading.
pub struct LoadContext<'a> {
    cache: &'a mut PackageCache,
    loader: LoaderId,
    backend: BackendId,
    channel_priority: i32,
    installed: bool,
}

impl LoadContext<'_> {
    /// Registers a package with all of its relations. Returns the id of
    /// the canonical entry, which may be a previously registered package
    /// with identical relations.
    pub fn new_package(&mut self, info: &PackageInfo) -> Result<PackageId> {
        self.cache.register_package(
            self.loader,
            self.backend,
            self.channel_priority,
            self.installed,
            info,
        )
    }

    /// Registers an extra provide on an already registered package.
    /// Used by the file-provides pass; a `/`-prefixed name drops any
    /// requirement of the package on itself.
    pub fn new_provides(
        &mut self,
        package: PackageId,
        name: &str,
        version: Option<&str>,
    ) -> ProvideId {
        self.cache.attach_provide(package, name, version)
    }
}
