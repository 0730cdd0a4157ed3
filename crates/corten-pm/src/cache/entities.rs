//! Cache entities: packages, provides, and dependency relations.
//!
//! Entities live in arenas owned by the cache and reference each other
//! through plain integer ids, so the bidirectional relation graph needs
//! no reference counting. Each distinct relation exists once per cache
//! and is shared by every package that declares it.

use std::fmt;

use corten_vercmp::Relation;

use crate::backend::BackendId;
use crate::loader::LoaderId;

/// Index of a [`Package`] in the cache arena.
pub type PackageId = u32;

/// Index of a [`Provide`] in the cache arena.
pub type ProvideId = u32;

/// Index of a [`Dependency`] in the cache arena.
pub type DependId = u32;

/// The role a [`Dependency`] plays for the packages that declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependKind {
    /// Needed at runtime.
    Requires,
    /// Needed before the declaring package can be installed. Ordering
    /// treats these as mandatory where plain requirements are mere
    /// preferences.
    PreRequires,
    /// Declares that the owner supersedes matching packages.
    Upgrades,
    /// Cannot be installed together with matching packages.
    Conflicts,
}

impl DependKind {
    /// Both requirement flavors.
    pub fn is_requires(self) -> bool {
        matches!(self, DependKind::Requires | DependKind::PreRequires)
    }
}

/// One version of one package name.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub backend: BackendId,
    /// Whether any loader reported this package as installed.
    pub installed: bool,
    /// Essential packages are never candidates for removal.
    pub essential: bool,
    /// Highest priority among the channels that carry this package.
    pub priority: i32,
    pub provides: Vec<ProvideId>,
    /// Includes pre-requirements.
    pub requires: Vec<DependId>,
    pub upgrades: Vec<DependId>,
    pub conflicts: Vec<DependId>,
    /// Loaders that registered this package.
    pub loaders: Vec<LoaderId>,
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A capability offered by one or more packages.
///
/// Names starting with `/` are file provides and never carry a version.
#[derive(Debug, Clone)]
pub struct Provide {
    pub name: String,
    pub version: Option<String>,
    pub backend: BackendId,
    /// Packages offering this capability.
    pub packages: Vec<PackageId>,
    /// Requirements this capability can satisfy.
    pub required_by: Vec<DependId>,
    /// Upgrade relations claiming this capability.
    pub upgraded_by: Vec<DependId>,
    /// Conflict relations hitting this capability.
    pub conflicted_by: Vec<DependId>,
}

impl Provide {
    pub fn is_file(&self) -> bool {
        self.name.starts_with('/')
    }
}

impl fmt::Display for Provide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} = {}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// A relation declared by packages against a capability name, with an
/// optional version predicate.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub kind: DependKind,
    pub name: String,
    pub relation: Option<Relation>,
    pub version: Option<String>,
    pub backend: BackendId,
    /// Packages declaring this relation.
    pub packages: Vec<PackageId>,
    /// Provides whose version passes the predicate.
    pub provided_by: Vec<ProvideId>,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, &self.version) {
            (Some(relation), Some(version)) => {
                write!(f, "{} {} {}", self.name, relation, version)
            }
            _ => f.write_str(&self.name),
        }
    }
}
