//! Loader for JSON snapshot files.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::{Backend, ReleaseBackend};
use crate::cache::{LoadContext, PackageId};
use crate::error::Result;

use super::{Channel, Loader, PackageInfo};

#[derive(Debug, Deserialize)]
struct Snapshot {
    packages: Vec<PackageInfo>,
}

/// Loads packages from a JSON snapshot on disk.
///
/// The file holds `{"packages": [...]}` with entries in the
/// [`PackageInfo`] format. The parsed list is kept in memory, so a
/// cache reload re-registers packages without reading the file again.
#[derive(Debug)]
pub struct SnapshotLoader {
    path: PathBuf,
    channel: Channel,
    installed: bool,
    parsed: Option<Vec<PackageInfo>>,
    registered: Vec<(PackageId, usize)>,
}

impl SnapshotLoader {
    pub fn new(path: impl Into<PathBuf>, channel: Channel) -> Self {
        SnapshotLoader {
            path: path.into(),
            channel,
            installed: false,
            parsed: None,
            registered: Vec::new(),
        }
    }

    /// Marks this snapshot as describing the installed system.
    pub fn with_installed(mut self, installed: bool) -> Self {
        self.installed = installed;
        self
    }

    fn register(&mut self, ctx: &mut LoadContext) -> Result<()> {
        self.registered.clear();
        if let Some(infos) = &self.parsed {
            for (idx, info) in infos.iter().enumerate() {
                let id = ctx.new_package(info)?;
                self.registered.push((id, idx));
            }
        }
        Ok(())
    }
}

impl Loader for SnapshotLoader {
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
        let text = fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        self.parsed = Some(snapshot.packages);
        self.register(ctx)
    }

    fn reload(&mut self, ctx: &mut LoadContext) -> Result<()> {
        if self.parsed.is_none() {
            return self.load(ctx);
        }
        self.register(ctx)
    }

    fn load_file_provides(&mut self, paths: &[String], ctx: &mut LoadContext) -> Result<()> {
        if let Some(infos) = &self.parsed {
            for &(id, idx) in &self.registered {
                for file in &infos[idx].files {
                    if paths.contains(file) {
                        ctx.new_provides(id, file, None);
                    }
                }
            }
        }
        Ok(())
    }

    fn info(&self, pkg: PackageId) -> Option<&PackageInfo> {
        let parsed = self.parsed.as_deref()?;
        self.registered
            .iter()
            .find(|&&(id, _)| id == pkg)
            .map(|&(_, idx)| &parsed[idx])
    }

    fn unload(&mut self) {
        self.parsed = None;
        self.registered.clear();
    }
}
