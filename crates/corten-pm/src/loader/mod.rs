//! Loaders feed package data into the cache.
//!
//! A loader owns one source of package descriptions (a repository
//! snapshot, the set of installed packages, a test fixture) and
//! registers them through the [`LoadContext`] callbacks when the cache
//! loads. Loaders keep their parsed data so a cache reload does not
//! have to touch the backing store again.

mod json;

pub use json::SnapshotLoader;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, ReleaseBackend};
use crate::cache::{LoadContext, PackageId};
use crate::error::Result;

/// Identifies a registered loader within a cache.
pub type LoaderId = u32;

/// The source a loader draws packages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    /// Packages from higher priority channels win when several
    /// candidates satisfy the same dependency.
    pub priority: i32,
}

impl Channel {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Channel {
            name: name.into(),
            priority,
        }
    }
}

/// One package description as a loader hands it to the cache.
///
/// Relation specs use the textual form `name`, `name = version`, or
/// `name <relation> version`, e.g. `libssl >= 1.0-2`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upgrades: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    /// Paths shipped by the package, consulted by the file-provides pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub essential: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        PackageInfo {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn provides(mut self, spec: impl Into<String>) -> Self {
        self.provides.push(spec.into());
        self
    }

    pub fn requires(mut self, spec: impl Into<String>) -> Self {
        self.requires.push(spec.into());
        self
    }

    pub fn prerequires(mut self, spec: impl Into<String>) -> Self {
        self.prerequires.push(spec.into());
        self
    }

    pub fn upgrades(mut self, spec: impl Into<String>) -> Self {
        self.upgrades.push(spec.into());
        self
    }

    pub fn conflicts(mut self, spec: impl Into<String>) -> Self {
        self.conflicts.push(spec.into());
        self
    }

    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn installed(mut self) -> Self {
        self.installed = true;
        self
    }

    pub fn essential(mut self) -> Self {
        self.essential = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// A source of packages for the cache.
pub trait Loader {
    /// The channel this loader draws from.
    fn channel(&self) -> &Channel;

    /// The backend governing version semantics of this loader's packages.
    fn backend(&self) -> Box<dyn Backend>;

    /// Whether this loader describes packages installed on the system.
    fn installed(&self) -> bool {
        false
    }

    /// Parses the backing data and registers every package.
    fn load(&mut self, ctx: &mut LoadContext) -> Result<()>;

    /// Registers packages again after a cache reset, reusing already
    /// parsed data where possible.
    fn reload(&mut self, ctx: &mut LoadContext) -> Result<()> {
        self.load(ctx)
    }

    /// Registers provides for the paths that requirements ask for.
    fn load_file_provides(&mut self, _paths: &[String], _ctx: &mut LoadContext) -> Result<()> {
        Ok(())
    }

    /// The source record behind a package this loader registered.
    fn info(&self, _pkg: PackageId) -> Option<&PackageInfo> {
        None
    }

    /// Drops cached backing data.
    fn unload(&mut self) {}
}

/// Loader over an in-memory package list.
#[derive(Debug)]
pub struct MemoryLoader {
    channel: Channel,
    installed: bool,
    infos: Vec<PackageInfo>,
    registered: Vec<(PackageId, usize)>,
}

impl MemoryLoader {
    pub fn new(channel: Channel, infos: Vec<PackageInfo>) -> Self {
        MemoryLoader {
            channel,
            installed: false,
            infos,
            registered: Vec::new(),
        }
    }

    /// Marks every package from this loader as installed.
    pub fn with_installed(mut self, installed: bool) -> Self {
        self.installed = installed;
        self
    }
}

impl Loader for MemoryLoader {
    fn channel(&self) -> &Channel {
        &self.channel
    }

    fn backend(&self) -> Box<dyn Backend> {
        Box::new(ReleaseBackend)
    }

    fn installed(&self) -> bool {
        self.installed
    }

    fn load(&mut self, ctx: &mut LoadContext) -> Result<()> {
        self.registered.clear();
        for (idx, info) in self.infos.iter().enumerate() {
            let id = ctx.new_package(info)?;
            self.registered.push((id, idx));
        }
        Ok(())
    }

    fn load_file_provides(&mut self, paths: &[String], ctx: &mut LoadContext) -> Result<()> {
        for &(id, idx) in &self.registered {
            for file in &self.infos[idx].files {
                if paths.contains(file) {
                    ctx.new_provides(id, file, None);
                }
            }
        }
        Ok(())
    }

    fn info(&self, pkg: PackageId) -> Option<&PackageInfo> {
        self.registered
            .iter()
            .find(|&&(id, _)| id == pkg)
            .map(|&(_, idx)| &self.infos[idx])
    }
}

/// Several loaders feeding one channel, driven as a unit.
pub struct LoaderSet {
    channel: Channel,
    loaders: Vec<Box<dyn Loader>>,
}

impl LoaderSet {
    pub fn new(channel: Channel) -> Self {
        LoaderSet {
            channel,
            loaders: Vec::new(),
        }
    }

    pub fn push(&mut self, loader: Box<dyn Loader>) {
        self.loaders.push(loader);
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl Loader for LoaderSet {
    fn channel(&self) -> &Channel {
        &self.channel
    }

    fn backend(&self) -> Box<dyn Backend> {
        match self.loaders.first() {
            Some(loader) => loader.backend(),
            None => Box::new(ReleaseBackend),
        }
    }

    fn installed(&self) -> bool {
        self.loaders.first().is_some_and(|loader| loader.installed())
    }

    fn load(&mut self, ctx: &mut LoadContext) -> Result<()> {
        for loader in &mut self.loaders {
            loader.load(ctx)?;
        }
        Ok(())
    }

    fn reload(&mut self, ctx: &mut LoadContext) -> Result<()> {
        for loader in &mut self.loaders {
            loader.reload(ctx)?;
        }
        Ok(())
    }

    fn load_file_provides(&mut self, paths: &[String], ctx: &mut LoadContext) -> Result<()> {
        for loader in &mut self.loaders {
            loader.load_file_provides(paths, ctx)?;
        }
        Ok(())
    }

    fn info(&self, pkg: PackageId) -> Option<&PackageInfo> {
        self.loaders.iter().find_map(|loader| loader.info(pkg))
    }

    fn unload(&mut self) {
        for loader in &mut self.loaders {
            loader.unload();
        }
    }
}
