//! Pattern matching for command-line package selections.
//!
//! A [`MasterMatcher`] carries the raw pattern and builds one concrete
//! matcher per backend on demand, so a single pattern can be checked
//! against packages from different packaging systems in one pass.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::backend::BackendId;
use crate::cache::{PackageCache, PackageId};

/// Matches a pattern against package name/version pairs under one
/// backend's conventions.
pub trait Matcher {
    fn matches(&self, name: &str, version: &str) -> bool;
}

fn is_glob(s: &str) -> bool {
    s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
}

/// Translates a shell-style glob into an anchored regular expression.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // Pass a bracketed class through, or escape a stray '['.
                match chars[i + 1..].iter().position(|&c| c == ']') {
                    Some(end) => {
                        out.push('[');
                        let mut class: &[char] = &chars[i + 1..i + 1 + end];
                        if class.first() == Some(&'!') {
                            out.push('^');
                            class = &class[1..];
                        }
                        out.extend(class.iter());
                        out.push(']');
                        i += end + 1;
                    }
                    None => out.push_str(r"\["),
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

enum Pattern {
    Literal(String),
    Glob(Regex),
}

impl Pattern {
    fn new(s: &str) -> Pattern {
        if is_glob(s) {
            if let Ok(re) = Regex::new(&glob_to_regex(s)) {
                return Pattern::Glob(re);
            }
        }
        Pattern::Literal(s.to_string())
    }

    fn matches_name(&self, name: &str) -> bool {
        match self {
            Pattern::Literal(lit) => lit == name,
            Pattern::Glob(re) => re.is_match(name),
        }
    }

    /// Literal versions compare with the version algorithm so that
    /// `1.0` matches an installed `1.0-3`.
    fn matches_version(&self, version: &str) -> bool {
        match self {
            Pattern::Literal(lit) => {
                corten_vercmp::compare(lit, version) == Ordering::Equal
            }
            Pattern::Glob(re) => re.is_match(version),
        }
    }
}

/// Matcher for `[epoch:]version[-release]` style packages.
///
/// Accepts `name`, `name=version`, and dashed forms where the trailing
/// one to three dash-separated sections are read as the version, so
/// `foo-2.0-1` can select the package `foo` at version `2.0-1`. Both
/// sides may be shell globs.
pub struct ReleaseMatcher {
    options: Vec<(Pattern, Option<Pattern>)>,
}

impl ReleaseMatcher {
    pub fn new(pattern: &str) -> Self {
        let mut options = Vec::new();
        if let Some((name, version)) = pattern.split_once('=') {
            options.push((Pattern::new(name), Some(Pattern::new(version))));
        } else {
            options.push((Pattern::new(pattern), None));
            let tokens: Vec<&str> = pattern.split('-').collect();
            for take in 1..=3 {
                if tokens.len() > take {
                    let name = tokens[..tokens.len() - take].join("-");
                    let version = tokens[tokens.len() - take..].join("-");
                    options.push((Pattern::new(&name), Some(Pattern::new(&version))));
                }
            }
        }
        ReleaseMatcher { options }
    }
}

impl Matcher for ReleaseMatcher {
    fn matches(&self, name: &str, version: &str) -> bool {
        for (name_pat, version_pat) in &self.options {
            if !name_pat.matches_name(name) {
                continue;
            }
            if let Some(version_pat) = version_pat {
                if !version_pat.matches_version(version) {
                    continue;
                }
            }
            return true;
        }
        false
    }
}

/// Front door for pattern matching against a whole cache.
///
/// Builds the concrete matcher for each backend lazily, the first time
/// a package of that backend is tested.
pub struct MasterMatcher {
    pattern: String,
    matchers: RefCell<HashMap<BackendId, Box<dyn Matcher>>>,
}

impl MasterMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        MasterMatcher {
            pattern: pattern.into(),
            matchers: RefCell::new(HashMap::new()),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Tests one package against the pattern.
    pub fn matches(&self, cache: &PackageCache, package: PackageId) -> bool {
        let pkg = cache.package(package);
        let mut matchers = self.matchers.borrow_mut();
        let matcher = matchers
            .entry(pkg.backend)
            .or_insert_with(|| cache.backend(pkg.backend).matcher(&self.pattern));
        matcher.matches(&pkg.name, &pkg.version)
    }

    /// Keeps the packages that match, preserving input order.
    pub fn filter(&self, cache: &PackageCache, packages: &[PackageId]) -> Vec<PackageId> {
        packages
            .iter()
            .copied()
            .filter(|&id| self.matches(cache, id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let m = ReleaseMatcher::new("bash");
        assert!(m.matches("bash", "5.0-1"));
        assert!(!m.matches("dash", "5.0-1"));
    }

    #[test]
    fn test_name_equals_version() {
        let m = ReleaseMatcher::new("bash=5.0");
        assert!(m.matches("bash", "5.0-1"));
        assert!(m.matches("bash", "5.0"));
        assert!(!m.matches("bash", "5.1-1"));
    }

    #[test]
    fn test_trailing_dash_as_version() {
        let m = ReleaseMatcher::new("bash-5.0");
        assert!(m.matches("bash", "5.0-1"));
        assert!(!m.matches("bash", "4.4-2"));
        // The whole string is still tried as a name first.
        assert!(m.matches("bash-5.0", "1.0"));
    }

    #[test]
    fn test_two_dash_sections_as_version() {
        let m = ReleaseMatcher::new("bash-5.0-1");
        assert!(m.matches("bash", "5.0-1"));
        assert!(!m.matches("bash", "5.0-2"));
    }

    #[test]
    fn test_dashed_name_keeps_matching() {
        let m = ReleaseMatcher::new("gcc-c++-12.1");
        assert!(m.matches("gcc-c++", "12.1-4"));
    }

    #[test]
    fn test_name_glob() {
        let m = ReleaseMatcher::new("lib*");
        assert!(m.matches("libssl", "1.0"));
        assert!(m.matches("libc", "2.31"));
        assert!(!m.matches("bash", "5.0"));
    }

    #[test]
    fn test_version_glob() {
        let m = ReleaseMatcher::new("bash=5.*");
        assert!(m.matches("bash", "5.0-1"));
        assert!(m.matches("bash", "5.1"));
        assert!(!m.matches("bash", "4.4"));
    }

    #[test]
    fn test_question_mark_and_class() {
        let m = ReleaseMatcher::new("pkg?");
        assert!(m.matches("pkga", "1.0"));
        assert!(!m.matches("pkg", "1.0"));

        let m = ReleaseMatcher::new("pkg[ab]");
        assert!(m.matches("pkga", "1.0"));
        assert!(m.matches("pkgb", "1.0"));
        assert!(!m.matches("pkgc", "1.0"));
    }

    #[test]
    fn test_negated_class() {
        let m = ReleaseMatcher::new("pkg[!a]");
        assert!(!m.matches("pkga", "1.0"));
        assert!(m.matches("pkgb", "1.0"));
    }

    #[test]
    fn test_glob_regex_translation() {
        assert_eq!(glob_to_regex("a*b"), "^a.*b$");
        assert_eq!(glob_to_regex("a.b"), r"^a\.b$");
        assert_eq!(glob_to_regex("x?"), "^x.$");
    }
}
