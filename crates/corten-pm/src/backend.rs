//! Backend capability descriptors.
//!
//! A backend describes the packaging-system conventions a package was
//! loaded under: how its version strings compare, whether two versions
//! of the same name may be installed together, and how command-line
//! patterns match against it. Packages reference their backend through
//! a small id handed out by the cache, so mixing packages from several
//! backends in one cache is cheap.

use std::cmp::Ordering;
use std::fmt;

use corten_vercmp::Relation;

use crate::matcher::{Matcher, ReleaseMatcher};

/// Identifies a registered [`Backend`] within a cache.
pub type BackendId = u32;

/// The capabilities a packaging system must provide.
pub trait Backend: fmt::Debug {
    /// Short identifier, e.g. `"release"`. Backends are deduplicated
    /// by this name when registered.
    fn name(&self) -> &str;

    /// Compares two version strings under this backend's rules.
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// Checks a candidate version against a relation and target version.
    fn satisfies(&self, candidate: &str, relation: Relation, target: &str) -> bool;

    /// Whether two distinct versions of the same package name may be
    /// installed at the same time.
    fn coexists(&self, installed: &str, candidate: &str) -> bool;

    /// Builds a matcher for a command-line pattern.
    fn matcher(&self, pattern: &str) -> Box<dyn Matcher>;
}

/// Backend for `[epoch:]version[-release]` style packages where at most
/// one version of a name is installed at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseBackend;

impl Backend for ReleaseBackend {
    fn name(&self) -> &str {
        "release"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        corten_vercmp::compare(a, b)
    }

    fn satisfies(&self, candidate: &str, relation: Relation, target: &str) -> bool {
        corten_vercmp::satisfies(candidate, relation, target)
    }

    fn coexists(&self, _installed: &str, _candidate: &str) -> bool {
        false
    }

    fn matcher(&self, pattern: &str) -> Box<dyn Matcher> {
        Box::new(ReleaseMatcher::new(pattern))
    }
}
